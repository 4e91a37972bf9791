//! Worklist-based data flow solver.
//!
//! # Algorithm
//!
//! 1. The entry block's incoming state is the analysis boundary; only the
//!    entry is enqueued
//! 2. While the worklist is non-empty:
//!    a. Pop a block and copy its incoming state into a working state
//!    b. Apply the transfer function to every instruction of the block
//!    c. Join the working state into each successor's incoming state
//!    d. Enqueue every successor whose state changed or was just created
//!
//! Blocks never enqueued keep no state; they are unreachable from the entry.
//!
//! # Complexity
//!
//! States only move upward in a lattice of bounded height, so each block's
//! incoming state changes a bounded number of times per tracked operand.

use std::collections::VecDeque;

use log::trace;

use crate::{
    analysis::dataflow::{
        framework::{AnalysisResults, DataFlowAnalysis},
        lattice::JoinSemiLattice,
    },
    ir::{BlockId, IrFunction},
};

/// Worklist-based forward data flow solver.
///
/// # Usage
///
/// ```rust,ignore
/// use mila::analysis::dataflow::{ConstantPropagation, DataFlowSolver};
///
/// let solver = DataFlowSolver::new(ConstantPropagation::new(global_count));
/// let results = solver.solve(&function);
/// let entry_state = results.in_state(BlockId::ENTRY);
/// ```
pub struct DataFlowSolver<A: DataFlowAnalysis> {
    /// The analysis being solved.
    analysis: A,
    /// Incoming state for each block.
    in_states: Vec<Option<A::Lattice>>,
    /// Blocks waiting to be processed.
    worklist: VecDeque<usize>,
    /// Whether each block is currently in the worklist (for deduplication).
    in_worklist: Vec<bool>,
    /// Number of block visits performed.
    iterations: usize,
}

impl<A: DataFlowAnalysis> DataFlowSolver<A> {
    /// Creates a new solver for the given analysis.
    #[must_use]
    pub fn new(analysis: A) -> Self {
        Self {
            analysis,
            in_states: Vec::new(),
            worklist: VecDeque::new(),
            in_worklist: Vec::new(),
            iterations: 0,
        }
    }

    /// Solves the analysis to a fixpoint.
    pub fn solve(mut self, function: &IrFunction) -> AnalysisResults<A::Lattice> {
        let num_blocks = function.block_count();
        if num_blocks == 0 {
            return AnalysisResults::new(Vec::new(), 0);
        }

        self.in_states = vec![None; num_blocks];
        self.in_worklist = vec![false; num_blocks];
        self.in_states[BlockId::ENTRY.index()] = Some(self.analysis.boundary(function));
        self.enqueue(BlockId::ENTRY.index());

        while let Some(index) = self.worklist.pop_front() {
            self.in_worklist[index] = false;
            self.iterations += 1;
            self.process(function, index);
        }

        trace!(
            "dataflow on @{} converged after {} block visits",
            function.name(),
            self.iterations
        );
        AnalysisResults::new(self.in_states, self.iterations)
    }

    /// Returns the number of block visits performed.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    fn process(&mut self, function: &IrFunction, index: usize) {
        let (Some(block), Some(Some(input))) =
            (function.blocks().get(index), self.in_states.get(index))
        else {
            return;
        };

        let mut state = input.clone();
        self.analysis.transfer_block(block, &mut state);

        for succ in block.successors() {
            let succ = succ.index();
            let Some(slot) = self.in_states.get_mut(succ) else {
                continue;
            };
            let changed = if let Some(existing) = slot {
                existing.join_assign(&state)
            } else {
                *slot = Some(state.clone());
                true
            };
            if changed {
                self.enqueue(succ);
            }
        }
    }

    fn enqueue(&mut self, index: usize) {
        if !self.in_worklist[index] {
            self.worklist.push_back(index);
            self.in_worklist[index] = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::Symbol,
        ir::{IrOp, Operand},
    };

    /// Counts how many instructions may have executed on the way to a block.
    #[derive(Debug, Clone, PartialEq)]
    struct MaxCount(usize);

    impl JoinSemiLattice for MaxCount {
        fn join(&self, other: &Self) -> Self {
            Self(self.0.max(other.0).min(8))
        }

        fn is_top(&self) -> bool {
            self.0 == 8
        }
    }

    struct CountAnalysis;

    impl DataFlowAnalysis for CountAnalysis {
        type Lattice = MaxCount;

        fn boundary(&self, _function: &IrFunction) -> Self::Lattice {
            MaxCount(0)
        }

        fn transfer(&self, _op: &IrOp, state: &mut Self::Lattice) {
            state.0 = (state.0 + 1).min(8);
        }
    }

    /// bb0 -> bb1 <-> bb2, bb1 -> bb3, plus an orphan bb4.
    fn looping() -> IrFunction {
        let mut f = IrFunction::new(Symbol::from("loop"), 1);
        let entry = f.add_block("entry");
        let cond = f.add_block("while.cond");
        let body = f.add_block("while.body");
        let exit = f.add_block("while.end");
        let orphan = f.add_block("orphan");
        let p = Operand::Value(f.params()[0]);

        f.block_mut(entry).unwrap().instructions.push(IrOp::Jump { target: cond });
        f.block_mut(cond).unwrap().instructions.push(IrOp::Branch {
            condition: p,
            true_target: body,
            false_target: exit,
        });
        f.block_mut(body).unwrap().instructions.push(IrOp::Jump { target: cond });
        f.block_mut(exit).unwrap().instructions.push(IrOp::Return { value: p });
        f.block_mut(orphan).unwrap().instructions.push(IrOp::Return { value: p });
        f
    }

    #[test]
    fn test_solver_iterations() {
        let solver = DataFlowSolver::new(CountAnalysis);
        assert_eq!(solver.iterations(), 0);
    }

    #[test]
    fn test_loop_reaches_fixpoint() {
        let f = looping();
        let results = DataFlowSolver::new(CountAnalysis).solve(&f);

        assert_eq!(results.block_count(), 5);
        assert_eq!(results.in_state(BlockId::ENTRY), Some(&MaxCount(0)));
        // The back edge keeps raising the count until the lattice saturates.
        assert_eq!(results.in_state(BlockId::new(1)), Some(&MaxCount(8)));
        assert!(results.is_reached(BlockId::new(3)));
        assert!(!results.is_reached(BlockId::new(4)));
        assert!(results.iterations > 5);
    }

    #[test]
    fn test_empty_function() {
        let f = IrFunction::new(Symbol::from("empty"), 0);
        let results = DataFlowSolver::new(CountAnalysis).solve(&f);
        assert_eq!(results.block_count(), 0);
        assert_eq!(results.iterations, 0);
    }
}
