//! Built-in optimization passes.
//!
//! Each pass implements [`SsaPass`](crate::compiler::SsaPass), operates on
//! one function and records its changes in the
//! [`EventLog`](crate::compiler::EventLog).
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`ConstantPropagationPass`] | Replaces uses of constant values with immediates |
//! | [`DeadInstructionEliminationPass`] | Removes unused side-effect-free instructions |
//! | [`DeadCodeEliminationPass`] | Folds constant branches, drops unreachable blocks, trivial phis and dead definitions |
//! | [`DeadStoreEliminationPass`] | Removes stack slots that are never loaded |
//!
//! The [`PassScheduler`](crate::compiler::PassScheduler) runs them in this
//! order, repeating the sequence until a round changes nothing.

mod constants;
mod deadcode;
mod deadinst;
mod deadstore;

pub use constants::ConstantPropagationPass;
pub use deadcode::DeadCodeEliminationPass;
pub use deadinst::DeadInstructionEliminationPass;
pub use deadstore::DeadStoreEliminationPass;
