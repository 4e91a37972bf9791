//! Abstract syntax tree consumed by the code generator.
//!
//! The tree is produced upstream by a parser and never mutated here. It is a
//! closed set of node kinds: statements and expressions share the single
//! [`Node`] type, because in Mila every construct may appear where a value is
//! expected (the value of a block is the value of its last statement).
//!
//! # Structure
//!
//! ```text
//! Module
//!  ├─ declarations   global `var` cells and `const` bindings
//!  ├─ functions      user functions, each with parameters and a body node
//!  └─ body           top-level node, lowered into the entry function `main`
//! ```
//!
//! Every node carries a [`SourcePos`] used in diagnostics.
//!
//! # Serialization
//!
//! All types derive `serde` traits, so a parser living in another process can
//! hand the tree over as JSON. Nodes are internally tagged by `"kind"`:
//!
//! ```json
//! { "pos": { "line": 1, "col": 1 }, "kind": "Binary", "op": "+",
//!   "lhs": { "kind": "Number", "value": 2 },
//!   "rhs": { "kind": "Number", "value": 3 } }
//! ```
//!
//! Trees can also be built in code with the [`builder`] module.

pub mod builder;

use std::{fmt, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, IntoStaticStr};

/// An interned name.
///
/// Cloning a symbol only bumps a reference count. Equality, ordering and
/// hashing are by name, so two symbols created from the same string are
/// interchangeable as scope keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Creates a symbol from a name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Symbol::from)
    }
}

/// Line and column of a node in the source text, both 1-based.
///
/// Nodes built in code default to `0:0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePos {
    /// Source line
    pub line: u32,
    /// Source column
    pub col: u32,
}

impl SourcePos {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line: {}, col: {}", self.line, self.col)
    }
}

/// Binary operators.
///
/// The first four are arithmetic; the rest are comparisons yielding `0` or `1`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr, Serialize, Deserialize,
)]
pub enum BinaryOperator {
    /// Wrapping addition
    #[strum(serialize = "+")]
    #[serde(rename = "+")]
    Add,
    /// Wrapping subtraction
    #[strum(serialize = "-")]
    #[serde(rename = "-")]
    Sub,
    /// Wrapping multiplication
    #[strum(serialize = "*")]
    #[serde(rename = "*")]
    Mul,
    /// Truncating signed division
    #[strum(serialize = "/")]
    #[serde(rename = "/")]
    Div,
    /// Equality
    #[strum(serialize = "=")]
    #[serde(rename = "=")]
    Eq,
    /// Inequality
    #[strum(serialize = "<>")]
    #[serde(rename = "<>")]
    Ne,
    /// Signed less-than
    #[strum(serialize = "<")]
    #[serde(rename = "<")]
    Lt,
    /// Signed greater-than
    #[strum(serialize = ">")]
    #[serde(rename = ">")]
    Gt,
    /// Signed less-or-equal
    #[strum(serialize = "<=")]
    #[serde(rename = "<=")]
    Le,
    /// Signed greater-or-equal
    #[strum(serialize = ">=")]
    #[serde(rename = ">=")]
    Ge,
}

impl BinaryOperator {
    /// Returns `true` for the comparison operators.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        !matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

/// Unary operators.
///
/// Mila's unary operators adjust the operand by one; they do not negate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `+x` evaluates to `x + 1`
    #[strum(serialize = "+")]
    #[serde(rename = "+")]
    Inc,
    /// `-x` evaluates to `x - 1`
    #[strum(serialize = "-")]
    #[serde(rename = "-")]
    Dec,
}

/// A `var` or `const` declaration.
///
/// A declaration without a value is a mutable variable initialized to zero; a
/// declaration with a value is a constant bound to that value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Declared name
    pub symbol: Symbol,
    /// Initializer of a constant
    #[serde(default)]
    pub value: Option<Node>,
    /// Position of the declaration
    #[serde(default)]
    pub pos: SourcePos,
}

impl Declaration {
    /// Returns `true` if this declares a constant.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.value.is_some()
    }
}

/// A user function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function name
    pub name: Symbol,
    /// Parameter names, in call order
    #[serde(default)]
    pub arguments: Vec<Symbol>,
    /// Function body; its value is the function's return value
    pub body: Node,
    /// Position of the definition
    #[serde(default)]
    pub pos: SourcePos,
}

/// A whole program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Global declarations
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    /// User functions
    #[serde(default)]
    pub functions: Vec<Function>,
    /// Top-level code, executed by the entry point
    pub body: Node,
    /// Position of the module
    #[serde(default)]
    pub pos: SourcePos,
}

/// A single AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Position of the node in the source
    #[serde(default)]
    pub pos: SourcePos,
    /// What the node is
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Creates a node without position information.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            pos: SourcePos::default(),
            kind,
        }
    }

    /// Sets the source position of this node.
    #[must_use]
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.pos = SourcePos::new(line, col);
        self
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    /// `begin ... end`, opening a new scope
    Block {
        /// Local declarations, visible to the statements
        #[serde(default)]
        declarations: Vec<Declaration>,
        /// Statements in execution order
        #[serde(default)]
        statements: Vec<Node>,
    },
    /// `if cond then a else b`
    If {
        /// Condition, true when non-zero
        condition: Box<Node>,
        /// Taken when the condition holds
        true_case: Box<Node>,
        /// Taken otherwise
        #[serde(default)]
        false_case: Option<Box<Node>>,
    },
    /// `while cond do body`
    While {
        /// Loop condition, evaluated before each iteration
        condition: Box<Node>,
        /// Loop body
        body: Box<Node>,
    },
    /// `return expr`
    Return {
        /// Returned value
        value: Box<Node>,
    },
    /// `symbol := value`
    Assignment {
        /// Assignment target
        symbol: Symbol,
        /// Assigned value
        value: Box<Node>,
    },
    /// `read(symbol)`, storing one integer of program input
    Read {
        /// Target variable
        symbol: Symbol,
    },
    /// `write(value)`, emitting one integer of program output
    Write {
        /// Written value
        value: Box<Node>,
    },
    /// `function(arguments...)`
    Call {
        /// Callee name
        function: Symbol,
        /// Arguments, evaluated left to right
        #[serde(default)]
        arguments: Vec<Node>,
    },
    /// `lhs op rhs`
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand, evaluated first
        lhs: Box<Node>,
        /// Right operand
        rhs: Box<Node>,
    },
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOperator,
        /// Operand
        operand: Box<Node>,
    },
    /// A variable or constant reference
    Variable {
        /// Referenced name
        symbol: Symbol,
    },
    /// An integer literal
    Number {
        /// Literal value
        value: i32,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_symbol_equality_by_name() {
        let a = Symbol::from("counter");
        let b = Symbol::from(String::from("counter"));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&Symbol::from("other")));
    }

    #[test]
    fn test_source_pos_display() {
        assert_eq!(SourcePos::new(4, 12).to_string(), "line: 4, col: 12");
    }

    #[test]
    fn test_operator_mnemonics() {
        assert_eq!(BinaryOperator::Le.to_string(), "<=");
        assert_eq!(UnaryOperator::Dec.to_string(), "-");
        assert!(BinaryOperator::Ne.is_comparison());
        assert!(!BinaryOperator::Div.is_comparison());
    }

    #[test]
    fn test_node_from_json() {
        let json = r#"{
            "pos": { "line": 2, "col": 5 },
            "kind": "Binary",
            "op": "<>",
            "lhs": { "kind": "Variable", "symbol": "x" },
            "rhs": { "kind": "Number", "value": 3 }
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.pos, SourcePos::new(2, 5));
        match node.kind {
            NodeKind::Binary { op, lhs, rhs } => {
                assert_eq!(op, BinaryOperator::Ne);
                assert_eq!(
                    lhs.kind,
                    NodeKind::Variable {
                        symbol: Symbol::from("x")
                    }
                );
                assert_eq!(rhs.kind, NodeKind::Number { value: 3 });
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_module_from_json_defaults() {
        let json = r#"{ "body": { "kind": "Number", "value": 7 } }"#;
        let module: Module = serde_json::from_str(json).unwrap();
        assert!(module.declarations.is_empty());
        assert!(module.functions.is_empty());
        assert_eq!(module.body.pos, SourcePos::default());
    }
}
