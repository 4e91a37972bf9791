//! Data flow analysis framework for IR functions.
//!
//! This module provides a generic framework for computing properties that
//! propagate forward along control flow edges, solved with a worklist.
//!
//! # Architecture
//!
//! The framework is built around three core abstractions:
//!
//! - **Lattice**: the domain of abstract values with a join operation
//! - **Analysis**: the transfer function and the boundary state
//! - **Solver**: iterates to a fixpoint with a worklist of blocks
//!
//! # Analyses Provided
//!
//! - [`ConstantPropagation`]: constants through SSA values, stack slots and
//!   global cells over the [`AValue`] lattice
//!
//! # Example
//!
//! ```rust,ignore
//! use mila::analysis::dataflow::ConstantPropagation;
//!
//! let analysis = ConstantPropagation::new(module.globals().len());
//! for (value, constant) in analysis.constants(&function) {
//!     println!("{value} = {constant}");
//! }
//! ```

mod constants;
mod framework;
mod lattice;
mod solver;

pub use constants::ConstantPropagation;
pub use framework::{AnalysisResults, DataFlowAnalysis};
pub use lattice::{AState, AValue, JoinSemiLattice, Lattice};
pub use solver::DataFlowSolver;
