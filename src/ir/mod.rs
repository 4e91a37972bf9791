//! SSA intermediate representation.
//!
//! # Architecture
//!
//! ```text
//! IrModule
//!  ├─ imports      read() -> i32, write(i32) -> void
//!  ├─ globals      zero-initialized i32 cells (@g0, @g1, ...)
//!  └─ functions    IrFunction
//!                   ├─ params       %0 .. %n-1
//!                   └─ blocks       BasicBlock (bb0 is the entry)
//!                                    └─ instructions   IrOp, ending in a terminator
//! ```
//!
//! Mutable source variables live in stack slots (`alloca`) or global cells and
//! are accessed with `load`/`store`; only the results of `if` expressions are
//! merged with phis. Constant propagation tracks the contents of slots
//! directly, so promotion to registers is not needed for optimization.
//!
//! The textual form produced by `Display` is modelled on LLVM assembly and is
//! what the command line driver emits.

mod block;
mod function;
mod module;
mod ops;
mod value;
mod verify;

pub use block::BasicBlock;
pub use function::{dominates, IrFunction};
pub use module::{Global, IrModule, ENTRY_POINT};
pub use ops::{BinaryKind, Callee, ComparePredicate, IrOp, RuntimeImport};
pub use value::{BlockId, GlobalId, IrType, Operand, ValueId};
pub use verify::{verify_function, verify_module};
