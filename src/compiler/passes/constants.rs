//! Constant propagation pass.
//!
//! Runs [`ConstantPropagation`] to a fixpoint and replaces every use of a
//! constant result with an immediate. The defining instructions are left in
//! place without uses; dead instruction elimination removes them. Control
//! flow is never altered here: a branch whose condition became an immediate
//! is folded by dead code elimination.

use crate::{
    analysis::ConstantPropagation,
    compiler::{pass::SsaPass, CompilerContext, EventKind, EventLog},
    ir::{IrFunction, Operand},
    Result,
};

/// Replaces uses of constant values with immediates.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantPropagationPass;

impl ConstantPropagationPass {
    /// Creates a new constant propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SsaPass for ConstantPropagationPass {
    fn name(&self) -> &'static str {
        "constant-propagation"
    }

    fn description(&self) -> &'static str {
        "Propagates constants through values, stack slots and globals"
    }

    fn run_on_function(&self, function: &mut IrFunction, ctx: &CompilerContext<'_>) -> Result<bool> {
        let changes = EventLog::new();

        for (value, constant) in ConstantPropagation::new(ctx.global_count).constants(function) {
            let replaced = function.replace_uses(value, Operand::Imm(constant));
            if replaced > 0 {
                changes
                    .record(EventKind::ConstantFolded)
                    .function(function.name().clone())
                    .pass(self.name())
                    .message(format!("{value} = {constant} ({replaced} uses)"));
            }
        }

        let changed = !changes.is_empty();
        if changed {
            ctx.events.merge(&changes);
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::builder::*, codegen::lower_module, ir::IrOp};

    #[test]
    fn test_folds_through_slots() {
        let body = BlockBuilder::new()
            .var("a")
            .stmt(assign("a", add(num(2), mul(num(3), num(4)))))
            .stmt(var("a"))
            .build();
        let mut module = lower_module(&ModuleBuilder::new().body(body).build()).unwrap();
        let events = EventLog::new();
        let ctx = CompilerContext::new(&module, &events);
        let main = &mut module.functions_mut()[0];

        assert!(ConstantPropagationPass.run_on_function(main, &ctx).unwrap());
        assert_eq!(
            main.blocks()[0].terminator(),
            Some(&IrOp::Return {
                value: Operand::Imm(14)
            })
        );
        assert_eq!(events.count_kind(EventKind::ConstantFolded), 3);

        // Nothing left to replace on a second run.
        assert!(!ConstantPropagationPass.run_on_function(main, &ctx).unwrap());
    }
}
