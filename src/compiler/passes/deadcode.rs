//! Dead code elimination pass.
//!
//! This pass cleans up both control flow and data flow:
//!
//! 1. **Branch folding**: a conditional branch on an immediate, or with equal
//!    targets, becomes an unconditional jump
//! 2. **Unreachable block elimination**: blocks not reachable from the entry
//!    are removed and the rest renumbered
//! 3. **Phi operand pruning**: entries for edges that no longer exist are
//!    dropped
//! 4. **Trivial phi elimination**: a phi whose entries all carry the same
//!    operand is replaced by that operand
//! 5. **Mark and sweep**: terminators, stores and calls are live roots;
//!    liveness flows backward along operand edges and every unmarked
//!    instruction is erased
//!
//! # Prerequisites
//!
//! Works best after constant propagation, which turns branch conditions into
//! immediates.

use std::collections::{HashMap, HashSet};

use crate::{
    compiler::{pass::SsaPass, CompilerContext, EventKind, EventLog},
    ir::{BlockId, IrFunction, IrOp, Operand, ValueId},
    Result,
};

/// Removes unreachable blocks and unused definitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadCodeEliminationPass;

impl DeadCodeEliminationPass {
    /// Creates a new dead code elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn fold_branches(&self, function: &mut IrFunction, changes: &EventLog) {
        let name = function.name().clone();
        for block in function.blocks_mut() {
            let Some(last) = block.instructions.last_mut() else {
                continue;
            };
            let IrOp::Branch {
                condition,
                true_target,
                false_target,
            } = *last
            else {
                continue;
            };
            let target = match condition {
                Operand::Imm(value) if value != 0 => true_target,
                Operand::Imm(_) => false_target,
                _ if true_target == false_target => true_target,
                _ => continue,
            };
            *last = IrOp::Jump { target };
            changes
                .record(EventKind::BranchSimplified)
                .at(&name, block.id.index())
                .pass(self.name())
                .message(format!("br label {target}"));
        }
    }

    fn remove_unreachable(&self, function: &mut IrFunction, changes: &EventLog) {
        let keep = function.reachable_blocks();
        for (index, _) in keep.iter().enumerate().filter(|(_, reachable)| !**reachable) {
            changes
                .record(EventKind::BlockRemoved)
                .at(function.name(), index)
                .pass(self.name());
        }
        function.remove_blocks(&keep);

        let pruned = function.prune_phi_incoming();
        if pruned > 0 {
            changes
                .record(EventKind::PhiSimplified)
                .function(function.name().clone())
                .pass(self.name())
                .message(format!("pruned {pruned} phi entries"));
        }
    }

    fn simplify_phis(&self, function: &mut IrFunction, changes: &EventLog) {
        let mut trivial: Vec<(BlockId, usize, ValueId, Operand)> = Vec::new();
        for block in function.blocks() {
            for (index, op) in block.instructions.iter().enumerate() {
                let IrOp::Phi { dest, incoming } = op else {
                    continue;
                };
                let Some(&(_, first)) = incoming.first() else {
                    continue;
                };
                if incoming.iter().all(|(_, operand)| *operand == first) && !first.uses(*dest) {
                    trivial.push((block.id, index, *dest, first));
                }
            }
        }
        if trivial.is_empty() {
            return;
        }

        // A replacement may name a phi removed earlier in this sweep.
        let mut resolved: HashMap<ValueId, Operand> = HashMap::new();
        let mut victims = HashSet::new();
        for (block, index, dest, mut replacement) in trivial {
            while let Some(next) = replacement.as_value().and_then(|v| resolved.get(&v)) {
                replacement = *next;
            }
            resolved.insert(dest, replacement);
            function.replace_uses(dest, replacement);
            victims.insert((block, index));
            changes
                .record(EventKind::PhiSimplified)
                .at(function.name(), block.index())
                .pass(self.name())
                .message(format!("{dest} = {replacement}"));
        }
        function.remove_instructions(&victims);
    }

    fn sweep(&self, function: &mut IrFunction, changes: &EventLog) {
        let mut defs: HashMap<ValueId, &IrOp> = HashMap::new();
        let mut live: HashSet<ValueId> = HashSet::new();
        let mut worklist: Vec<ValueId> = Vec::new();

        for (_, op) in function.instructions() {
            if let Some(dest) = op.dest() {
                defs.insert(dest, op);
            }
            if op.is_terminator() || op.has_side_effects() {
                worklist.extend(op.uses());
            }
        }

        while let Some(value) = worklist.pop() {
            if !live.insert(value) {
                continue;
            }
            if let Some(op) = defs.get(&value) {
                worklist.extend(op.uses());
            }
        }

        let mut victims = HashSet::new();
        for block in function.blocks() {
            for (index, op) in block.instructions.iter().enumerate() {
                if op.is_terminator() || op.has_side_effects() {
                    continue;
                }
                if op.dest().is_some_and(|dest| !live.contains(&dest)) {
                    victims.insert((block.id, index));
                    changes
                        .record(EventKind::InstructionRemoved)
                        .at(function.name(), block.id.index())
                        .pass(self.name())
                        .message(op.to_string());
                }
            }
        }

        if !victims.is_empty() {
            function.remove_instructions(&victims);
        }
    }
}

impl SsaPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Folds constant branches, removes unreachable blocks and dead definitions"
    }

    fn run_on_function(&self, function: &mut IrFunction, ctx: &CompilerContext<'_>) -> Result<bool> {
        let changes = EventLog::new();

        self.fold_branches(function, &changes);
        self.remove_unreachable(function, &changes);
        self.simplify_phis(function, &changes);
        self.sweep(function, &changes);

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(&changes);
        }
        Ok(changed)
    }
}
