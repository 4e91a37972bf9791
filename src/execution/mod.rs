//! In-process execution of compiled modules.
//!
//! # Architecture
//!
//! ```text
//! IrModule ──verify──► link ──► LinkedProgram ──► ExecutionEngine
//!                        │                           └─ entry_point().call() -> Result<i32>
//!                        └─ SymbolResolver
//!                             ├─ registered host functions
//!                             └─ built-ins: read, write ──► RuntimeIo (StdIo, BufferedIo)
//! ```
//!
//! Linking happens once, when the engine is built. Execution walks the dense
//! form directly: values live in per-call register files, `alloca` slots in a
//! per-call slot array and globals in a table shared by one run.

mod engine;
mod link;
mod runtime;

pub use engine::{EngineConfig, EntryPoint, ExecutionEngine, DEFAULT_MAX_CALL_DEPTH};
pub use link::{HostFunction, SymbolResolver};
pub use runtime::{BufferedIo, RuntimeIo, StdIo};
