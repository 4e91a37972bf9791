//! Program analysis over the IR.
//!
//! # Architecture
//!
//! - [`dataflow`] - Worklist data flow framework, the [`AValue`]/[`AState`]
//!   lattice and constant propagation
//!
//! Control flow queries (predecessors, reachability, dominators) live on
//! [`crate::ir::IrFunction`] itself, since the IR owns its CFG.

pub mod dataflow;

pub use dataflow::{
    AState, AValue, AnalysisResults, ConstantPropagation, DataFlowAnalysis, DataFlowSolver,
    JoinSemiLattice, Lattice,
};
