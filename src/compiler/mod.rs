//! Optimization infrastructure and the compilation driver.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Compiler                    lower → verify → optimize → verify  │
//! │    ├─ CompilerOptions         optimize, parallel, rounds, verify │
//! │    └─ EventLog                change tracking and diagnostics    │
//! │                                                                  │
//! │  PassScheduler               per-function fixpoint, rayon        │
//! │    └─ each round: CP → DIE → DCE → DSE                           │
//! │                                                                  │
//! │  SsaPass trait               interface for all passes            │
//! │    ├─ should_run()            skip functions cheaply             │
//! │    └─ run_on_function()       transform, report `changed`        │
//! │                                                                  │
//! │  CompilerContext             module-wide facts shared by passes  │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod context;
mod driver;
mod events;
mod pass;
mod passes;
mod scheduler;

pub use context::CompilerContext;
pub use driver::{Compiler, CompilerOptions};
pub use events::{Event, EventBuilder, EventKind, EventLog};
pub use pass::SsaPass;
pub use passes::{
    ConstantPropagationPass, DeadCodeEliminationPass, DeadInstructionEliminationPass,
    DeadStoreEliminationPass,
};
pub use scheduler::{PassScheduler, DEFAULT_MAX_ROUNDS};
