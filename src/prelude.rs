//! # mila Prelude
//!
//! The types needed to build a program, compile it and run it.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all mila operations
pub use crate::Error;

/// Faults raised by a running program
pub use crate::RuntimeFault;

/// The result type used throughout mila
pub use crate::Result;

// ================================================================================================
// Program Construction
// ================================================================================================

/// AST types
pub use crate::ast::{Module, Node, NodeKind, SourcePos, Symbol};

/// Builders for AST modules
pub use crate::ast::builder::*;

// ================================================================================================
// Compilation
// ================================================================================================

/// The compilation driver and its options
pub use crate::compiler::{Compiler, CompilerOptions};

/// Change tracking
pub use crate::compiler::{EventKind, EventLog};

/// The compiled form
pub use crate::ir::IrModule;

// ================================================================================================
// Execution
// ================================================================================================

/// Running compiled modules
pub use crate::execution::{BufferedIo, EngineConfig, ExecutionEngine, RuntimeIo, SymbolResolver};
