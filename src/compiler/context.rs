//! Shared state handed to every pass.
//!
//! The [`CompilerContext`] carries the module-wide facts a per-function pass
//! may need while functions are optimized in parallel. It only holds shared
//! references and plain data, so it is `Sync` and one instance serves every
//! worker.

use crate::{compiler::events::EventLog, ir::IrModule};

/// Module-wide context for the optimization pipeline.
#[derive(Debug, Clone, Copy)]
pub struct CompilerContext<'a> {
    /// Accumulated events from all passes.
    pub events: &'a EventLog,
    /// Number of global cells in the module.
    pub global_count: usize,
}

impl<'a> CompilerContext<'a> {
    /// Creates a context for optimizing `module`.
    #[must_use]
    pub fn new(module: &IrModule, events: &'a EventLog) -> Self {
        Self {
            events,
            global_count: module.globals().len(),
        }
    }
}
