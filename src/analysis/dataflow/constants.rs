//! Constant propagation over [`AValue`] states.
//!
//! The analysis tracks SSA values, stack slots and global cells together:
//! a slot or global is keyed by its address operand, so `store`/`load` pairs
//! propagate constants through memory without first promoting slots to
//! registers. Addresses are never computed, so every access names its cell
//! directly.
//!
//! # Transfer Functions
//!
//! | Instruction            | Effect                                            |
//! |------------------------|---------------------------------------------------|
//! | `load addr`            | `dest := state[addr]`                             |
//! | `store value, addr`    | `state[addr] := state[value]`                     |
//! | `binary` / `icmp`      | fold if both operands are constant, else `Top`    |
//! | `icmp eq/ne x, 0`      | folds when `x` is known non-zero                  |
//! | `zext`                 | `dest := state[operand]`                          |
//! | `phi`                  | join of every incoming operand                    |
//! | `call`                 | `dest := Top`; user calls clobber every global    |
//!
//! Division by a constant zero does not fold; the fault is left to run time.

use crate::{
    analysis::dataflow::{
        framework::{AnalysisResults, DataFlowAnalysis},
        lattice::{AState, AValue, JoinSemiLattice},
        solver::DataFlowSolver,
    },
    ir::{Callee, ComparePredicate, GlobalId, IrFunction, IrOp, Operand, ValueId},
};

/// Constant propagation analysis for one function.
#[derive(Debug, Clone, Copy)]
pub struct ConstantPropagation {
    global_count: usize,
}

impl ConstantPropagation {
    /// Creates the analysis for a module with `global_count` global cells.
    #[must_use]
    pub const fn new(global_count: usize) -> Self {
        Self { global_count }
    }

    /// Runs the analysis to a fixpoint.
    #[must_use]
    pub fn analyze(self, function: &IrFunction) -> AnalysisResults<AState> {
        DataFlowSolver::new(self).solve(function)
    }

    /// Collects the results of side-effect-free instructions that are
    /// constant at the fixpoint.
    ///
    /// Each reached block is replayed from its fixpoint incoming state; the
    /// returned pairs are in program order.
    #[must_use]
    pub fn constants(self, function: &IrFunction) -> Vec<(ValueId, i32)> {
        let results = self.analyze(function);
        let mut found = Vec::new();

        for block in function.blocks() {
            let Some(input) = results.in_state(block.id) else {
                continue;
            };
            let mut state = input.clone();
            for op in &block.instructions {
                self.transfer(op, &mut state);
                if !is_foldable(op) {
                    continue;
                }
                if let Some(dest) = op.dest() {
                    if let Some(value) = state.get(&Operand::Value(dest)).as_const() {
                        found.push((dest, value));
                    }
                }
            }
        }
        found
    }

    fn clobber_globals(&self, state: &mut AState) {
        for index in 0..self.global_count {
            state.set(Operand::Global(GlobalId::new(index)), AValue::Top);
        }
    }
}

/// Instructions whose result may be replaced by a constant.
fn is_foldable(op: &IrOp) -> bool {
    matches!(
        op,
        IrOp::Load { .. }
            | IrOp::Binary { .. }
            | IrOp::Compare { .. }
            | IrOp::ZExt { .. }
            | IrOp::Phi { .. }
    )
}

/// Decides `eq`/`ne` against zero when the other side is known non-zero.
fn zero_test(predicate: ComparePredicate, left: AValue, right: AValue) -> Option<bool> {
    let zero = AValue::Const(0);
    if !((left.is_nonzero() && right == zero) || (right.is_nonzero() && left == zero)) {
        return None;
    }
    match predicate {
        ComparePredicate::Eq => Some(false),
        ComparePredicate::Ne => Some(true),
        _ => None,
    }
}

impl DataFlowAnalysis for ConstantPropagation {
    type Lattice = AState;

    fn boundary(&self, function: &IrFunction) -> AState {
        let mut state = AState::new();
        for param in function.params() {
            state.set(Operand::Value(*param), AValue::Top);
        }
        self.clobber_globals(&mut state);
        state
    }

    fn transfer(&self, op: &IrOp, state: &mut AState) {
        match op {
            IrOp::Load { dest, addr } => {
                let value = state.get(addr);
                state.set(Operand::Value(*dest), value);
            }
            IrOp::Store { addr, value } => {
                let value = state.get(value);
                state.set(*addr, value);
            }
            IrOp::Binary {
                dest,
                kind,
                left,
                right,
            } => {
                let value = match (state.get(left), state.get(right)) {
                    (AValue::Const(l), AValue::Const(r)) => {
                        kind.evaluate(l, r).map_or(AValue::Top, AValue::Const)
                    }
                    _ => AValue::Top,
                };
                state.set(Operand::Value(*dest), value);
            }
            IrOp::Compare {
                dest,
                predicate,
                left,
                right,
            } => {
                let value = match (state.get(left), state.get(right)) {
                    (AValue::Const(l), AValue::Const(r)) => {
                        AValue::Const(i32::from(predicate.evaluate(l, r)))
                    }
                    (l, r) => zero_test(*predicate, l, r)
                        .map_or(AValue::Top, |result| AValue::Const(i32::from(result))),
                };
                state.set(Operand::Value(*dest), value);
            }
            IrOp::ZExt { dest, operand } => {
                let value = state.get(operand);
                state.set(Operand::Value(*dest), value);
            }
            IrOp::Phi { dest, incoming } => {
                let value = incoming
                    .iter()
                    .fold(AValue::Bottom, |acc, (_, op)| acc.join(&state.get(op)));
                state.set(Operand::Value(*dest), value);
            }
            IrOp::Call { dest, callee, .. } => {
                if matches!(callee, Callee::Function(_)) {
                    self.clobber_globals(state);
                }
                if let Some(dest) = dest {
                    state.set(Operand::Value(*dest), AValue::Top);
                }
            }
            IrOp::Alloca { .. } | IrOp::Jump { .. } | IrOp::Branch { .. } | IrOp::Return { .. } => {}
        }
    }
}
