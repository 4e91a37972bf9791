// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # mila
//!
//! An optimizing compiler toolkit for a small imperative language: AST in,
//! verified SSA IR out, with an in-process execution engine to run it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ ast::Module │──►│   codegen   │──►│  ir::verify  │──►│ compiler passes  │
//! │  (builder,  │   │ ScopeChain, │   │  structural  │   │ CP → DIE → DCE → │
//! │   serde)    │   │ SSA values  │   │  invariants  │   │ DSE to fixpoint  │
//! └─────────────┘   └─────────────┘   └──────────────┘   └────────┬─────────┘
//!                                                                 │
//!                                       ┌──────────────────┐      │
//!                                       │ ExecutionEngine  │◄─────┘
//!                                       │ read/write, i32  │
//!                                       └──────────────────┘
//! ```
//!
//! - [`ast`] - The input program tree and a builder for constructing it
//! - [`codegen`] - Lowering with lexical scopes and compile-time checks
//! - [`ir`] - The SSA intermediate representation and its verifier
//! - [`analysis`] - The data flow framework and constant propagation
//! - [`compiler`] - Optimization passes, the pass scheduler and [`Compiler`]
//! - [`execution`] - Finalization and execution of compiled modules
//!
//! ## Quick Start
//!
//! ```rust
//! use mila::prelude::*;
//!
//! // var i; i := 10; begin var i; i := 12; return i end
//! let inner = BlockBuilder::new()
//!     .var("i")
//!     .stmt(assign("i", num(12)))
//!     .stmt(ret(var("i")))
//!     .build();
//! let body = BlockBuilder::new()
//!     .var("i")
//!     .stmt(assign("i", num(10)))
//!     .stmt(inner)
//!     .build();
//! let ast = ModuleBuilder::new().body(body).build();
//!
//! let compiler = Compiler::default();
//! let module = compiler.compile(&ast)?;
//! assert_eq!(ExecutionEngine::new(module)?.entry_point().call()?, 12);
//! # Ok::<(), mila::Error>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: `debug!` for every pass that
//! changes a function, `info!` for pipeline summaries and `trace!` for solver
//! and interpreter detail. Install any logger to see them.

#[macro_use]
pub(crate) mod error;

pub mod analysis;
pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod execution;
pub mod ir;

/// Convenient re-exports of the most commonly used types and functions.
///
/// # Example
///
/// ```rust
/// use mila::prelude::*;
///
/// let ast = ModuleBuilder::new().body(num(7)).build();
/// let module = Compiler::default().compile(&ast)?;
/// assert_eq!(ExecutionEngine::new(module)?.entry_point().call()?, 7);
/// # Ok::<(), mila::Error>(())
/// ```
pub mod prelude;

/// `mila` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `mila` Error type
///
/// The main error type for all operations in this crate, grouped into lowering,
/// internal, runtime and I/O errors.
pub use error::{Error, RuntimeFault};

pub use compiler::{Compiler, CompilerOptions};
pub use execution::{EngineConfig, ExecutionEngine};
pub use ir::IrModule;
