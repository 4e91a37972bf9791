//! Lattice traits and the abstract domain of constant propagation.
//!
//! # Lattice Background
//!
//! Abstract values only ever move upward: the solver combines states with
//! `join` (least upper bound) at control flow merge points, and a bounded
//! lattice height guarantees termination.
//!
//! ```text
//!              Top
//!               │
//!            NonZero
//!       ┌──────┼──────┐
//!   Const(1) Const(7) ...       Const(0)
//!       └──────┼──────┘            │
//!              │                   │
//!            Bottom ───────────────┘
//! ```
//!
//! `Const(0)` sits directly below `Top`: merging zero with anything else loses
//! even the knowledge that the value is non-zero.

use std::{collections::HashMap, fmt, fmt::Debug};

use crate::ir::Operand;

/// A join semi-lattice with a join (least upper bound) operation.
///
/// The join must be:
///
/// - **Idempotent**: `x.join(x) = x`
/// - **Commutative**: `x.join(y) = y.join(x)`
/// - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Computes the join (least upper bound) of two lattice elements.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns `true` if this is the top element.
    ///
    /// Top represents "unknown"; it absorbs every join.
    fn is_top(&self) -> bool;

    /// Joins `other` into `self`.
    ///
    /// Returns `true` if `self` changed.
    fn join_assign(&mut self, other: &Self) -> bool {
        let joined = self.join(other);
        if joined == *self {
            false
        } else {
            *self = joined;
            true
        }
    }
}

/// A bounded lattice with distinct extremes.
pub trait Lattice: JoinSemiLattice {
    /// Returns the top (⊤) element.
    fn top() -> Self;

    /// Returns the bottom (⊥) element, the identity for join.
    fn bottom() -> Self;

    /// Returns `true` if this is the bottom element.
    fn is_bottom(&self) -> bool;
}

/// Abstract value of a single `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AValue {
    /// No information yet: no path defining the value has been seen
    #[default]
    Bottom,
    /// Exactly this value on every path seen so far
    Const(i32),
    /// Some non-zero value
    NonZero,
    /// Any value
    Top,
}

impl AValue {
    /// Returns the constant, if this value is one.
    #[must_use]
    pub const fn as_const(self) -> Option<i32> {
        match self {
            Self::Const(value) => Some(value),
            _ => None,
        }
    }

    /// Returns `true` if the value is known to be non-zero.
    #[must_use]
    pub const fn is_nonzero(self) -> bool {
        match self {
            Self::Const(value) => value != 0,
            Self::NonZero => true,
            Self::Bottom | Self::Top => false,
        }
    }
}

impl JoinSemiLattice for AValue {
    fn join(&self, other: &Self) -> Self {
        match (*self, *other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x,
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (Self::Const(a), Self::Const(b)) if a == b => Self::Const(a),
            (Self::Const(a), Self::Const(b)) => {
                if a == 0 || b == 0 {
                    Self::Top
                } else {
                    Self::NonZero
                }
            }
            (Self::NonZero, Self::NonZero) => Self::NonZero,
            (Self::NonZero, Self::Const(v)) | (Self::Const(v), Self::NonZero) => {
                if v == 0 {
                    Self::Top
                } else {
                    Self::NonZero
                }
            }
        }
    }

    fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }
}

impl Lattice for AValue {
    fn top() -> Self {
        Self::Top
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }
}

impl fmt::Display for AValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => f.write_str("⊥"),
            Self::Const(value) => write!(f, "{value}"),
            Self::NonZero => f.write_str("≠0"),
            Self::Top => f.write_str("⊤"),
        }
    }
}

/// Abstract program state: the [`AValue`] of every SSA value, stack slot and
/// global cell at one program point.
///
/// Missing entries read as [`AValue::Bottom`] and immediates read as their
/// constant. Bottom is never stored, so structurally equal states compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AState {
    values: HashMap<Operand, AValue>,
}

impl AState {
    /// Creates an empty state, mapping everything to bottom.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the abstract value of an operand.
    #[must_use]
    pub fn get(&self, operand: &Operand) -> AValue {
        match operand {
            Operand::Imm(value) => AValue::Const(*value),
            _ => self.values.get(operand).copied().unwrap_or_default(),
        }
    }

    /// Records the abstract value of an operand. Immediates are ignored.
    pub fn set(&mut self, operand: Operand, value: AValue) {
        if matches!(operand, Operand::Imm(_)) {
            return;
        }
        if value.is_bottom() {
            self.values.remove(&operand);
        } else {
            self.values.insert(operand, value);
        }
    }

    /// Number of operands with information.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if every operand reads as bottom.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over the operands with information.
    pub fn iter(&self) -> impl Iterator<Item = (&Operand, &AValue)> {
        self.values.iter()
    }
}

impl JoinSemiLattice for AState {
    fn join(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.join_assign(other);
        result
    }

    fn is_top(&self) -> bool {
        false
    }

    fn join_assign(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (operand, value) in &other.values {
            let current = self.get(operand);
            let joined = current.join(value);
            if joined != current {
                self.values.insert(*operand, joined);
                changed = true;
            }
        }
        changed
    }
}
