//! Value identities and operands.
//!
//! Every SSA value in a function is named by a [`ValueId`]; module-level
//! cells by a [`GlobalId`]; blocks by their index, a [`BlockId`]. Instruction
//! inputs are [`Operand`]s, which may also be immediates. Constant propagation
//! rewrites operands from `Value` to `Imm` in place.

use std::fmt;

use strum::{Display, IntoStaticStr};

/// A function-local SSA value.
///
/// Parameters and instruction results are values. Identities are dense
/// indices allocated by [`crate::ir::IrFunction::new_value`] and never reused
/// within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(usize);

impl ValueId {
    /// Creates a value identity from its index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the dense index of this value.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Index of a basic block inside its function. Block `0` is the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    /// The entry block of every function.
    pub const ENTRY: BlockId = BlockId(0);

    /// Creates a block identity from its index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the index of this block.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A module-level memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(usize);

impl GlobalId {
    /// Creates a global identity from its index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the index of this global.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@g{}", self.0)
    }
}

/// An instruction input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A 32-bit immediate
    Imm(i32),
    /// An SSA value of the enclosing function
    Value(ValueId),
    /// The address of a global cell
    Global(GlobalId),
}

impl Operand {
    /// Returns the referenced SSA value, if any.
    #[must_use]
    pub const fn as_value(&self) -> Option<ValueId> {
        match self {
            Self::Value(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the immediate, if this is one.
    #[must_use]
    pub const fn as_imm(&self) -> Option<i32> {
        match self {
            Self::Imm(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` if this operand reads the given value.
    #[must_use]
    pub fn uses(&self, value: ValueId) -> bool {
        matches!(self, Self::Value(id) if *id == value)
    }
}

impl From<ValueId> for Operand {
    fn from(value: ValueId) -> Self {
        Self::Value(value)
    }
}

impl From<GlobalId> for Operand {
    fn from(global: GlobalId) -> Self {
        Self::Global(global)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imm(v) => write!(f, "{v}"),
            Self::Value(id) => write!(f, "{id}"),
            Self::Global(id) => write!(f, "{id}"),
        }
    }
}

/// Types of IR values.
///
/// Mila has a single integer type; `i1` exists only for comparison results
/// feeding branches, and `ptr` for stack slots and global cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum IrType {
    /// Comparison result
    I1,
    /// The integer type
    I32,
    /// Address of a stack slot or global cell
    Ptr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ValueId::new(3).to_string(), "%3");
        assert_eq!(BlockId::ENTRY.to_string(), "bb0");
        assert_eq!(Operand::Imm(-4).to_string(), "-4");
        assert_eq!(Operand::Global(GlobalId::new(1)).to_string(), "@g1");
        assert_eq!(IrType::I32.to_string(), "i32");
    }

    #[test]
    fn test_operand_queries() {
        let v = ValueId::new(7);
        let op = Operand::from(v);
        assert_eq!(op.as_value(), Some(v));
        assert_eq!(op.as_imm(), None);
        assert!(op.uses(v));
        assert!(!Operand::Imm(7).uses(v));
    }
}
