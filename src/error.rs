use thiserror::Error;

use crate::ast::{SourcePos, Symbol};

macro_rules! verify_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::IrVerification($msg.to_string())
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::IrVerification(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Lowering Errors
/// Raised by the code generator for invalid programs. Each carries the offending symbol
/// and the source position of the node that triggered it. Any of these aborts the whole
/// module compilation; no partial IR is handed on.
/// - [`Error::Redefinition`] - A name is declared twice in the same scope
/// - [`Error::ReservedName`] - A user function uses a name owned by the runtime
/// - [`Error::UndefinedSymbol`] - A variable or function is used but never declared
/// - [`Error::ConstantAssignment`] - A constant is the target of an assignment or read
/// - [`Error::ArityMismatch`] - A call passes the wrong number of arguments
/// - [`Error::UnreachableCode`] - A statement follows an unconditional return
/// - [`Error::NonConstantInitializer`] - A module-level constant cannot be evaluated statically
/// - [`Error::ConstantDivisionByZero`] - A module-level constant divides by zero
///
/// ## Internal Errors
/// - [`Error::IrVerification`] - Generated or transformed IR is malformed
///
/// ## Runtime Errors
/// - [`Error::Fault`] - The executed program faulted
/// - [`Error::RecursionLimit`] - The call depth limit of the execution engine was exceeded
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem or console I/O errors
///
/// # Examples
///
/// ```rust
/// use mila::{ast::builder::*, Compiler, Error};
///
/// let module = ModuleBuilder::new().body(assign("x", num(1))).build();
/// match Compiler::default().compile(&module) {
///     Err(Error::UndefinedSymbol { symbol, .. }) => assert_eq!(symbol.as_str(), "x"),
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A name is already bound in the current scope.
    ///
    /// Covers variables and constants declared twice in one block, duplicate parameter
    /// names and duplicate function names.
    #[error("Redefinition of '{symbol}' ({pos})")]
    Redefinition {
        /// The name declared twice
        symbol: Symbol,
        /// Position of the second declaration
        pos: SourcePos,
    },

    /// A user function takes a name reserved for the entry point or a runtime import.
    #[error("Name '{symbol}' is reserved ({pos})")]
    ReservedName {
        /// The reserved name
        symbol: Symbol,
        /// Position of the offending function
        pos: SourcePos,
    },

    /// A variable, constant or function could not be resolved.
    #[error("Undefined symbol '{symbol}' ({pos})")]
    UndefinedSymbol {
        /// The name that failed to resolve
        symbol: Symbol,
        /// Position of the use
        pos: SourcePos,
    },

    /// A constant binding was used as the target of a write.
    #[error("Cannot assign to constant '{symbol}' ({pos})")]
    ConstantAssignment {
        /// The constant's name
        symbol: Symbol,
        /// Position of the assignment
        pos: SourcePos,
    },

    /// A call passes a different number of arguments than the callee declares.
    #[error("Function '{symbol}' expects {expected} arguments, got {found} ({pos})")]
    ArityMismatch {
        /// The callee
        symbol: Symbol,
        /// Declared parameter count
        expected: usize,
        /// Number of arguments at the call site
        found: usize,
        /// Position of the call
        pos: SourcePos,
    },

    /// Code follows a construct that unconditionally transferred control.
    #[error("Code after return statement is not allowed ({pos})")]
    UnreachableCode {
        /// Position of the first unreachable node
        pos: SourcePos,
    },

    /// The initializer of a module-level constant is not a compile-time constant.
    #[error("Initializer of global constant '{symbol}' is not constant ({pos})")]
    NonConstantInitializer {
        /// The constant's name
        symbol: Symbol,
        /// Position of the declaration
        pos: SourcePos,
    },

    /// The initializer of a module-level constant divides by zero.
    #[error("Division by zero in initializer of global constant '{symbol}' ({pos})")]
    ConstantDivisionByZero {
        /// The constant's name
        symbol: Symbol,
        /// Position of the division
        pos: SourcePos,
    },

    /// The IR violates a structural invariant.
    ///
    /// This signals a defect in the compiler itself, never a problem with the
    /// compiled program.
    #[error("IR verification failed - {0}")]
    IrVerification(String),

    /// The executed program faulted.
    #[error("Runtime fault - {0}")]
    Fault(#[from] RuntimeFault),

    /// Recursion limit reached.
    ///
    /// The execution engine bounds the call depth of the compiled program. The
    /// associated value is the limit that was exceeded.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

/// Faults raised while executing a compiled program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeFault {
    /// Signed division with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// `read` was called with no input left.
    #[error("unexpected end of input")]
    EndOfInput,

    /// `read` received something that is not a 32-bit integer.
    #[error("invalid integer input '{0}'")]
    InvalidInput(String),
}
