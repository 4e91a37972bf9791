//! Data flow analysis framework trait.
//!
//! Any analysis implements [`DataFlowAnalysis`] to work with the solver. All
//! analyses in this crate are forward: state flows from the entry block along
//! control flow edges.

use crate::{
    analysis::dataflow::lattice::JoinSemiLattice,
    ir::{BasicBlock, BlockId, IrFunction, IrOp},
};

/// A forward data flow analysis over one IR function.
///
/// Implementations provide the boundary state and the per-instruction
/// transfer function; the solver handles iteration to a fixpoint.
///
/// # Example
///
/// ```rust,ignore
/// use mila::analysis::dataflow::{DataFlowAnalysis, DataFlowSolver};
///
/// struct MyAnalysis;
///
/// impl DataFlowAnalysis for MyAnalysis {
///     type Lattice = MyState;
///
///     fn boundary(&self, _function: &IrFunction) -> Self::Lattice {
///         MyState::default()
///     }
///
///     fn transfer(&self, op: &IrOp, state: &mut Self::Lattice) {
///         // update `state` with the effect of `op`
///     }
/// }
/// ```
pub trait DataFlowAnalysis {
    /// The abstract state at a program point.
    type Lattice: JoinSemiLattice;

    /// Returns the state on entry to the function.
    fn boundary(&self, function: &IrFunction) -> Self::Lattice;

    /// Applies the effect of one instruction to `state`.
    fn transfer(&self, op: &IrOp, state: &mut Self::Lattice);

    /// Applies the effect of a whole block to `state`.
    ///
    /// The default applies [`DataFlowAnalysis::transfer`] to every instruction
    /// in program order.
    fn transfer_block(&self, block: &BasicBlock, state: &mut Self::Lattice) {
        for op in &block.instructions {
            self.transfer(op, state);
        }
    }
}

/// Results of a data flow analysis.
///
/// Holds the fixpoint state on entry to each block. Blocks the analysis never
/// reached have no state.
#[derive(Debug, Clone)]
pub struct AnalysisResults<L> {
    /// Incoming state for each block.
    pub in_states: Vec<Option<L>>,
    /// Number of block visits the solver needed.
    pub iterations: usize,
}

impl<L> AnalysisResults<L> {
    /// Creates results from per-block states.
    #[must_use]
    pub fn new(in_states: Vec<Option<L>>, iterations: usize) -> Self {
        Self {
            in_states,
            iterations,
        }
    }

    /// Returns the incoming state of a block.
    ///
    /// # Returns
    ///
    /// The state, or `None` if the block is out of range or was never reached.
    #[must_use]
    pub fn in_state(&self, block: BlockId) -> Option<&L> {
        self.in_states.get(block.index()).and_then(Option::as_ref)
    }

    /// Returns `true` if the analysis reached the block.
    #[must_use]
    pub fn is_reached(&self, block: BlockId) -> bool {
        self.in_state(block).is_some()
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.in_states.len()
    }
}
