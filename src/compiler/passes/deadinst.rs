//! Dead instruction elimination pass.
//!
//! Removes instructions whose result is never read. Stores, calls and
//! terminators are always kept. Removing one instruction can make its
//! operands dead, so the sweep repeats until nothing more is removed.

use std::collections::HashSet;

use crate::{
    compiler::{pass::SsaPass, CompilerContext, EventKind, EventLog},
    ir::IrFunction,
    Result,
};

/// Removes unused side-effect-free instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadInstructionEliminationPass;

impl DeadInstructionEliminationPass {
    /// Creates a new dead instruction elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Removes one generation of dead instructions.
    ///
    /// Returns the number of instructions removed.
    fn sweep(&self, function: &mut IrFunction, changes: &EventLog) -> usize {
        let mut uses = vec![0usize; function.value_count()];
        for (_, op) in function.instructions() {
            for value in op.uses() {
                if let Some(count) = uses.get_mut(value.index()) {
                    *count += 1;
                }
            }
        }

        let mut victims = HashSet::new();
        for block in function.blocks() {
            for (index, op) in block.instructions.iter().enumerate() {
                if op.is_terminator() || op.has_side_effects() {
                    continue;
                }
                let Some(dest) = op.dest() else {
                    continue;
                };
                if uses.get(dest.index()).copied().unwrap_or(0) == 0 {
                    victims.insert((block.id, index));
                    changes
                        .record(EventKind::InstructionRemoved)
                        .at(function.name(), block.id.index())
                        .pass(self.name())
                        .message(op.to_string());
                }
            }
        }

        if victims.is_empty() {
            return 0;
        }
        function.remove_instructions(&victims)
    }
}

impl SsaPass for DeadInstructionEliminationPass {
    fn name(&self) -> &'static str {
        "dead-instruction-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes instructions whose results are never used"
    }

    fn run_on_function(&self, function: &mut IrFunction, ctx: &CompilerContext<'_>) -> Result<bool> {
        let changes = EventLog::new();
        while self.sweep(function, &changes) > 0 {}

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(&changes);
        }
        Ok(changed)
    }
}
