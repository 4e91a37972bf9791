//! IR operations.
//!
//! Each [`IrOp`] is a single `result = op(operands)` instruction or a block
//! terminator. The field naming follows one convention throughout:
//! - `dest`: the value defined by the instruction
//! - `left`, `right`: binary operands
//! - `operand`: unary operand
//! - `addr`: a stack slot or global cell address
//! - `value`: a value being stored or returned
//! - `target`, `true_target`, `false_target`: branch targets
//!
//! # Side effects
//!
//! Stores and calls are the only instructions with effects beyond defining
//! their result. Every other non-terminator can be deleted once its result
//! has no uses.

#![allow(missing_docs)]

use std::fmt;

use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
    ast::Symbol,
    ir::value::{BlockId, IrType, Operand, ValueId},
};

/// Integer arithmetic. All operations wrap on overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryKind {
    Add,
    Sub,
    Mul,
    /// Signed division truncating toward zero
    SDiv,
}

impl BinaryKind {
    /// Evaluates the operation on two immediates.
    ///
    /// Returns `None` for a division by zero, which is left for the runtime
    /// to report.
    #[must_use]
    pub const fn evaluate(self, left: i32, right: i32) -> Option<i32> {
        match self {
            Self::Add => Some(left.wrapping_add(right)),
            Self::Sub => Some(left.wrapping_sub(right)),
            Self::Mul => Some(left.wrapping_mul(right)),
            Self::SDiv => {
                if right == 0 {
                    None
                } else {
                    Some(left.wrapping_div(right))
                }
            }
        }
    }
}

/// Signed integer comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ComparePredicate {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

impl ComparePredicate {
    /// Evaluates the comparison on two immediates.
    #[must_use]
    pub const fn evaluate(self, left: i32, right: i32) -> bool {
        match self {
            Self::Eq => left == right,
            Self::Ne => left != right,
            Self::Slt => left < right,
            Self::Sgt => left > right,
            Self::Sle => left <= right,
            Self::Sge => left >= right,
        }
    }
}

/// Functions supplied by the runtime rather than the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum RuntimeImport {
    /// `read() -> i32`
    Read,
    /// `write(i32) -> void`
    Write,
}

impl RuntimeImport {
    /// Returns the link-time symbol name.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        self.into()
    }

    /// Number of parameters.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Read => 0,
            Self::Write => 1,
        }
    }

    /// Returns `true` if the import produces an `i32`.
    #[must_use]
    pub const fn returns_value(self) -> bool {
        matches!(self, Self::Read)
    }

    /// Looks up an import by symbol name.
    #[must_use]
    pub fn from_symbol(name: &str) -> Option<Self> {
        Self::iter().find(|import| import.symbol() == name)
    }
}

/// The target of a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callee {
    /// A function defined in the module
    Function(Symbol),
    /// A runtime import
    Import(RuntimeImport),
}

impl Callee {
    /// Returns the symbol name of the callee.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Function(name) => name.as_str(),
            Self::Import(import) => import.symbol(),
        }
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum IrOp {
    /// Reserve a stack slot: `dest = alloca i32`
    ///
    /// `name` records the source variable for readability of the IR.
    Alloca { dest: ValueId, name: Symbol },

    /// `dest = load addr`
    Load { dest: ValueId, addr: Operand },

    /// `store value, addr`
    Store { addr: Operand, value: Operand },

    /// `dest = kind left, right`
    Binary {
        dest: ValueId,
        kind: BinaryKind,
        left: Operand,
        right: Operand,
    },

    /// `dest = icmp predicate left, right`, producing an `i1`
    Compare {
        dest: ValueId,
        predicate: ComparePredicate,
        left: Operand,
        right: Operand,
    },

    /// `dest = zext operand`, widening an `i1` to `i32`
    ZExt { dest: ValueId, operand: Operand },

    /// `dest = phi [value, pred]...`
    ///
    /// Phis must precede every other instruction of their block and carry
    /// exactly one entry per predecessor.
    Phi {
        dest: ValueId,
        incoming: Vec<(BlockId, Operand)>,
    },

    /// `dest = call callee(args...)`
    ///
    /// `dest` is `None` for callees without a result.
    Call {
        dest: Option<ValueId>,
        callee: Callee,
        args: Vec<Operand>,
    },

    /// Unconditional branch.
    Jump { target: BlockId },

    /// Two-way branch on an `i1` condition.
    Branch {
        condition: Operand,
        true_target: BlockId,
        false_target: BlockId,
    },

    /// Return from the function.
    Return { value: Operand },
}

impl IrOp {
    /// Returns the value defined by this instruction, if any.
    #[must_use]
    pub fn dest(&self) -> Option<ValueId> {
        match self {
            Self::Alloca { dest, .. }
            | Self::Load { dest, .. }
            | Self::Binary { dest, .. }
            | Self::Compare { dest, .. }
            | Self::ZExt { dest, .. }
            | Self::Phi { dest, .. } => Some(*dest),
            Self::Call { dest, .. } => *dest,
            Self::Store { .. } | Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. } => {
                None
            }
        }
    }

    /// Returns the type of the defined value, if any.
    #[must_use]
    pub fn result_type(&self) -> Option<IrType> {
        match self {
            Self::Alloca { .. } => Some(IrType::Ptr),
            Self::Compare { .. } => Some(IrType::I1),
            Self::Load { .. } | Self::Binary { .. } | Self::ZExt { .. } | Self::Phi { .. } => {
                Some(IrType::I32)
            }
            Self::Call { dest, .. } => dest.map(|_| IrType::I32),
            Self::Store { .. } | Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. } => {
                None
            }
        }
    }

    /// Returns every operand read by this instruction, in order.
    #[must_use]
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            Self::Alloca { .. } | Self::Jump { .. } => vec![],
            Self::Load { addr, .. } => vec![*addr],
            Self::Store { addr, value } => vec![*addr, *value],
            Self::Binary { left, right, .. } | Self::Compare { left, right, .. } => {
                vec![*left, *right]
            }
            Self::ZExt { operand, .. } => vec![*operand],
            Self::Phi { incoming, .. } => incoming.iter().map(|(_, op)| *op).collect(),
            Self::Call { args, .. } => args.clone(),
            Self::Branch { condition, .. } => vec![*condition],
            Self::Return { value } => vec![*value],
        }
    }

    /// Returns mutable references to every operand of this instruction.
    pub fn operands_mut(&mut self) -> Vec<&mut Operand> {
        match self {
            Self::Alloca { .. } | Self::Jump { .. } => vec![],
            Self::Load { addr, .. } => vec![addr],
            Self::Store { addr, value } => vec![addr, value],
            Self::Binary { left, right, .. } | Self::Compare { left, right, .. } => {
                vec![left, right]
            }
            Self::ZExt { operand, .. } => vec![operand],
            Self::Phi { incoming, .. } => incoming.iter_mut().map(|(_, op)| op).collect(),
            Self::Call { args, .. } => args.iter_mut().collect(),
            Self::Branch { condition, .. } => vec![condition],
            Self::Return { value } => vec![value],
        }
    }

    /// Returns the SSA values read by this instruction.
    #[must_use]
    pub fn uses(&self) -> Vec<ValueId> {
        self.operands()
            .iter()
            .filter_map(Operand::as_value)
            .collect()
    }

    /// Counts how often `value` is read by this instruction.
    #[must_use]
    pub fn use_count(&self, value: ValueId) -> usize {
        self.operands().iter().filter(|op| op.uses(value)).count()
    }

    /// Replaces every read of `value` with `replacement`.
    ///
    /// Returns the number of operands rewritten.
    pub fn replace_uses(&mut self, value: ValueId, replacement: Operand) -> usize {
        let mut replaced = 0;
        for operand in self.operands_mut() {
            if operand.uses(value) {
                *operand = replacement;
                replaced += 1;
            }
        }
        replaced
    }

    /// Returns `true` if this operation ends a basic block.
    #[must_use]
    pub const fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Jump { .. } | Self::Branch { .. } | Self::Return { .. }
        )
    }

    /// Returns `true` if this operation has effects beyond its result.
    #[must_use]
    pub const fn has_side_effects(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Call { .. })
    }

    /// Returns `true` if this is a phi.
    #[must_use]
    pub const fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }

    /// Returns the successor blocks of a terminator.
    #[must_use]
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Jump { target } => vec![*target],
            Self::Branch {
                true_target,
                false_target,
                ..
            } => vec![*true_target, *false_target],
            _ => vec![],
        }
    }

    /// Rewrites block references (branch targets and phi predecessors).
    pub fn remap_blocks(&mut self, map: impl Fn(BlockId) -> BlockId) {
        match self {
            Self::Jump { target } => *target = map(*target),
            Self::Branch {
                true_target,
                false_target,
                ..
            } => {
                *true_target = map(*true_target);
                *false_target = map(*false_target);
            }
            Self::Phi { incoming, .. } => {
                for (pred, _) in incoming.iter_mut() {
                    *pred = map(*pred);
                }
            }
            _ => {}
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Operand]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "i32 {arg}")?;
    }
    Ok(())
}

impl fmt::Display for IrOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloca { dest, name } => write!(f, "{dest} = alloca i32 ; {name}"),
            Self::Load { dest, addr } => write!(f, "{dest} = load i32, ptr {addr}"),
            Self::Store { addr, value } => write!(f, "store i32 {value}, ptr {addr}"),
            Self::Binary {
                dest,
                kind,
                left,
                right,
            } => write!(f, "{dest} = {kind} i32 {left}, {right}"),
            Self::Compare {
                dest,
                predicate,
                left,
                right,
            } => write!(f, "{dest} = icmp {predicate} i32 {left}, {right}"),
            Self::ZExt { dest, operand } => write!(f, "{dest} = zext i1 {operand} to i32"),
            Self::Phi { dest, incoming } => {
                write!(f, "{dest} = phi i32 ")?;
                for (i, (pred, value)) in incoming.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "[ {value}, {pred} ]")?;
                }
                Ok(())
            }
            Self::Call { dest, callee, args } => {
                match dest {
                    Some(dest) => write!(f, "{dest} = call i32 {callee}(")?,
                    None => write!(f, "call void {callee}(")?,
                }
                write_args(f, args)?;
                f.write_str(")")
            }
            Self::Jump { target } => write!(f, "br label {target}"),
            Self::Branch {
                condition,
                true_target,
                false_target,
            } => write!(
                f,
                "br i1 {condition}, label {true_target}, label {false_target}"
            ),
            Self::Return { value } => write!(f, "ret i32 {value}"),
        }
    }
}
