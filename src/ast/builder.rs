//! Fluent construction of ASTs in code.
//!
//! Upstream parsers normally produce the tree, but tests, benchmarks and
//! embedders often want to write programs directly. The free functions build
//! single nodes; [`BlockBuilder`] and [`ModuleBuilder`] assemble scopes and
//! whole programs.
//!
//! # Examples
//!
//! ```rust
//! use mila::ast::builder::*;
//!
//! // function sq(x) x * x
//! // begin sq(7) end
//! let module = ModuleBuilder::new()
//!     .function("sq", &["x"], mul(var("x"), var("x")))
//!     .body(call("sq", vec![num(7)]))
//!     .build();
//! assert_eq!(module.functions.len(), 1);
//! ```

use crate::ast::{
    BinaryOperator, Declaration, Function, Module, Node, NodeKind, SourcePos, Symbol,
    UnaryOperator,
};

/// An integer literal.
#[must_use]
pub fn num(value: i32) -> Node {
    Node::new(NodeKind::Number { value })
}

/// A reference to a variable or constant.
#[must_use]
pub fn var(symbol: &str) -> Node {
    Node::new(NodeKind::Variable {
        symbol: Symbol::from(symbol),
    })
}

/// A binary operation.
#[must_use]
pub fn binary(op: BinaryOperator, lhs: Node, rhs: Node) -> Node {
    Node::new(NodeKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

/// `lhs + rhs`
#[must_use]
pub fn add(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Add, lhs, rhs)
}

/// `lhs - rhs`
#[must_use]
pub fn sub(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Sub, lhs, rhs)
}

/// `lhs * rhs`
#[must_use]
pub fn mul(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Mul, lhs, rhs)
}

/// `lhs / rhs`
#[must_use]
pub fn div(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Div, lhs, rhs)
}

/// `lhs = rhs`
#[must_use]
pub fn eq(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Eq, lhs, rhs)
}

/// `lhs <> rhs`
#[must_use]
pub fn ne(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Ne, lhs, rhs)
}

/// `lhs < rhs`
#[must_use]
pub fn lt(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Lt, lhs, rhs)
}

/// `lhs > rhs`
#[must_use]
pub fn gt(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Gt, lhs, rhs)
}

/// `lhs <= rhs`
#[must_use]
pub fn le(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Le, lhs, rhs)
}

/// `lhs >= rhs`
#[must_use]
pub fn ge(lhs: Node, rhs: Node) -> Node {
    binary(BinaryOperator::Ge, lhs, rhs)
}

/// `+operand`, i.e. `operand + 1`.
#[must_use]
pub fn inc(operand: Node) -> Node {
    Node::new(NodeKind::Unary {
        op: UnaryOperator::Inc,
        operand: Box::new(operand),
    })
}

/// `-operand`, i.e. `operand - 1`.
#[must_use]
pub fn dec(operand: Node) -> Node {
    Node::new(NodeKind::Unary {
        op: UnaryOperator::Dec,
        operand: Box::new(operand),
    })
}

/// `symbol := value`
#[must_use]
pub fn assign(symbol: &str, value: Node) -> Node {
    Node::new(NodeKind::Assignment {
        symbol: Symbol::from(symbol),
        value: Box::new(value),
    })
}

/// `read(symbol)`
#[must_use]
pub fn read(symbol: &str) -> Node {
    Node::new(NodeKind::Read {
        symbol: Symbol::from(symbol),
    })
}

/// `write(value)`
#[must_use]
pub fn write(value: Node) -> Node {
    Node::new(NodeKind::Write {
        value: Box::new(value),
    })
}

/// `function(arguments...)`
#[must_use]
pub fn call(function: &str, arguments: Vec<Node>) -> Node {
    Node::new(NodeKind::Call {
        function: Symbol::from(function),
        arguments,
    })
}

/// `return value`
#[must_use]
pub fn ret(value: Node) -> Node {
    Node::new(NodeKind::Return {
        value: Box::new(value),
    })
}

/// `if condition then true_case`
#[must_use]
pub fn if_then(condition: Node, true_case: Node) -> Node {
    Node::new(NodeKind::If {
        condition: Box::new(condition),
        true_case: Box::new(true_case),
        false_case: None,
    })
}

/// `if condition then true_case else false_case`
#[must_use]
pub fn if_else(condition: Node, true_case: Node, false_case: Node) -> Node {
    Node::new(NodeKind::If {
        condition: Box::new(condition),
        true_case: Box::new(true_case),
        false_case: Some(Box::new(false_case)),
    })
}

/// `while condition do body`
#[must_use]
pub fn while_do(condition: Node, body: Node) -> Node {
    Node::new(NodeKind::While {
        condition: Box::new(condition),
        body: Box::new(body),
    })
}

/// A block without declarations.
#[must_use]
pub fn block(statements: Vec<Node>) -> Node {
    BlockBuilder::new().statements(statements).build()
}

/// Builder for `begin ... end` blocks with local declarations.
///
/// ```rust
/// use mila::ast::builder::*;
///
/// // begin var i; i := 10; return i end
/// let node = BlockBuilder::new()
///     .var("i")
///     .stmt(assign("i", num(10)))
///     .stmt(ret(var("i")))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct BlockBuilder {
    declarations: Vec<Declaration>,
    statements: Vec<Node>,
    pos: SourcePos,
}

impl BlockBuilder {
    /// Creates an empty block builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a zero-initialized local variable.
    #[must_use]
    pub fn var(mut self, symbol: &str) -> Self {
        self.declarations.push(Declaration {
            symbol: Symbol::from(symbol),
            value: None,
            pos: SourcePos::default(),
        });
        self
    }

    /// Declares a local constant.
    #[must_use]
    pub fn constant(mut self, symbol: &str, value: Node) -> Self {
        self.declarations.push(Declaration {
            symbol: Symbol::from(symbol),
            value: Some(value),
            pos: SourcePos::default(),
        });
        self
    }

    /// Adds a fully specified declaration.
    #[must_use]
    pub fn declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Appends a statement.
    #[must_use]
    pub fn stmt(mut self, statement: Node) -> Self {
        self.statements.push(statement);
        self
    }

    /// Appends several statements.
    #[must_use]
    pub fn statements(mut self, statements: impl IntoIterator<Item = Node>) -> Self {
        self.statements.extend(statements);
        self
    }

    /// Sets the position of the block node.
    #[must_use]
    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.pos = SourcePos::new(line, col);
        self
    }

    /// Builds the block node.
    #[must_use]
    pub fn build(self) -> Node {
        Node {
            pos: self.pos,
            kind: NodeKind::Block {
                declarations: self.declarations,
                statements: self.statements,
            },
        }
    }
}

/// Builder for whole programs.
///
/// A module without an explicit body evaluates to `0`.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    declarations: Vec<Declaration>,
    functions: Vec<Function>,
    body: Option<Node>,
}

impl ModuleBuilder {
    /// Creates an empty module builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a zero-initialized global variable.
    #[must_use]
    pub fn var(mut self, symbol: &str) -> Self {
        self.declarations.push(Declaration {
            symbol: Symbol::from(symbol),
            value: None,
            pos: SourcePos::default(),
        });
        self
    }

    /// Declares a global constant.
    #[must_use]
    pub fn constant(mut self, symbol: &str, value: Node) -> Self {
        self.declarations.push(Declaration {
            symbol: Symbol::from(symbol),
            value: Some(value),
            pos: SourcePos::default(),
        });
        self
    }

    /// Adds a fully specified global declaration.
    #[must_use]
    pub fn declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Defines a function.
    #[must_use]
    pub fn function(mut self, name: &str, arguments: &[&str], body: Node) -> Self {
        self.functions.push(Function {
            name: Symbol::from(name),
            arguments: arguments.iter().map(|a| Symbol::from(*a)).collect(),
            body,
            pos: SourcePos::default(),
        });
        self
    }

    /// Adds a fully specified function.
    #[must_use]
    pub fn function_def(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Sets the top-level body.
    #[must_use]
    pub fn body(mut self, body: Node) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the module.
    #[must_use]
    pub fn build(self) -> Module {
        Module {
            declarations: self.declarations,
            functions: self.functions,
            body: self.body.unwrap_or_else(|| num(0)),
            pos: SourcePos::default(),
        }
    }
}
