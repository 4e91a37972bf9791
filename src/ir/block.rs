//! Basic blocks.

use std::fmt;

use crate::ir::{
    ops::IrOp,
    value::{BlockId, ValueId},
};

/// A maximal straight-line instruction sequence.
///
/// A well-formed block starts with its phis and ends in exactly one
/// terminator. Blocks under construction may temporarily lack the terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Block index within the function
    pub id: BlockId,
    /// Descriptive label (`entry`, `if.then`, `while.cond`, ...)
    pub label: &'static str,
    /// Instructions in execution order
    pub instructions: Vec<IrOp>,
}

impl BasicBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new(id: BlockId, label: &'static str) -> Self {
        Self {
            id,
            label,
            instructions: Vec::new(),
        }
    }

    /// Returns the terminator, if the block has one.
    #[must_use]
    pub fn terminator(&self) -> Option<&IrOp> {
        self.instructions.last().filter(|op| op.is_terminator())
    }

    /// Returns `true` if the block ends in a terminator.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    /// Returns the successors named by the terminator.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator().map(IrOp::successors).unwrap_or_default()
    }

    /// Iterates over the leading phis.
    pub fn phis(&self) -> impl Iterator<Item = &IrOp> {
        self.instructions.iter().take_while(|op| op.is_phi())
    }

    /// Number of leading phis.
    #[must_use]
    pub fn phi_count(&self) -> usize {
        self.phis().count()
    }

    /// Finds the instruction defining `value` in this block.
    #[must_use]
    pub fn find_def(&self, value: ValueId) -> Option<usize> {
        self.instructions
            .iter()
            .position(|op| op.dest() == Some(value))
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: ; {}", self.id, self.label)?;
        for op in &self.instructions {
            writeln!(f, "  {op}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::value::Operand;

    #[test]
    fn test_terminator_queries() {
        let mut block = BasicBlock::new(BlockId::new(1), "if.then");
        assert!(block.is_empty());
        assert!(!block.is_terminated());

        block.instructions.push(IrOp::Phi {
            dest: ValueId::new(0),
            incoming: vec![(BlockId::ENTRY, Operand::Imm(1))],
        });
        block.instructions.push(IrOp::Jump {
            target: BlockId::new(2),
        });

        assert!(block.is_terminated());
        assert_eq!(block.successors(), vec![BlockId::new(2)]);
        assert_eq!(block.phi_count(), 1);
        assert_eq!(block.find_def(ValueId::new(0)), Some(0));
        assert_eq!(
            block.to_string(),
            "bb1: ; if.then\n  %0 = phi i32 [ 1, bb0 ]\n  br label bb2\n"
        );
    }
}
