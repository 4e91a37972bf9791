//! Dead store elimination pass.
//!
//! A stack slot that is never loaded is write-only: every store into it is
//! dead, and so is the slot itself once the stores are gone. Global cells are
//! never touched, since other functions may read them.

use std::collections::{HashMap, HashSet};

use crate::{
    compiler::{pass::SsaPass, CompilerContext, EventKind, EventLog},
    ir::{IrFunction, IrOp, Operand, ValueId},
    Result,
};

/// Removes stack slots that are written but never read.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadStoreEliminationPass;

impl DeadStoreEliminationPass {
    /// Creates a new dead store elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SsaPass for DeadStoreEliminationPass {
    fn name(&self) -> &'static str {
        "dead-store-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes stack slots that are never loaded, with their stores"
    }

    fn should_run(&self, function: &IrFunction, _ctx: &CompilerContext<'_>) -> bool {
        function
            .instructions()
            .any(|(_, op)| matches!(op, IrOp::Alloca { .. }))
    }

    fn run_on_function(&self, function: &mut IrFunction, ctx: &CompilerContext<'_>) -> Result<bool> {
        // slot -> only ever used as a store address
        let mut write_only: HashMap<ValueId, bool> = HashMap::new();
        for (_, op) in function.instructions() {
            if let IrOp::Alloca { dest, .. } = op {
                write_only.entry(*dest).or_insert(true);
            }
        }

        for (_, op) in function.instructions() {
            for value in op.uses() {
                let Some(flag) = write_only.get_mut(&value) else {
                    continue;
                };
                let store_address = matches!(
                    op,
                    IrOp::Store { addr, value: stored }
                        if addr.uses(value) && !stored.uses(value)
                );
                if !store_address {
                    *flag = false;
                }
            }
        }

        let dead: HashSet<ValueId> = write_only
            .into_iter()
            .filter_map(|(slot, dead)| dead.then_some(slot))
            .collect();
        if dead.is_empty() {
            return Ok(false);
        }

        let changes = EventLog::new();
        let mut victims = HashSet::new();
        for block in function.blocks() {
            for (index, op) in block.instructions.iter().enumerate() {
                let slot = match op {
                    IrOp::Alloca { dest, .. } => *dest,
                    IrOp::Store {
                        addr: Operand::Value(addr),
                        ..
                    } => *addr,
                    _ => continue,
                };
                if dead.contains(&slot) {
                    victims.insert((block.id, index));
                    changes
                        .record(EventKind::StoreEliminated)
                        .at(function.name(), block.id.index())
                        .pass(self.name())
                        .message(op.to_string());
                }
            }
        }
        function.remove_instructions(&victims);

        ctx.events.merge(&changes);
        Ok(true)
    }
}
