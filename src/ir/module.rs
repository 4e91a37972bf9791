//! IR modules.

use std::fmt;

use strum::IntoEnumIterator;

use crate::{
    ast::Symbol,
    ir::{
        function::IrFunction,
        ops::RuntimeImport,
        value::GlobalId,
    },
};

/// Name of the synthesized entry function.
pub const ENTRY_POINT: &str = "main";

/// A module-level `i32` cell, zero-initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    /// Source-level name
    pub name: Symbol,
}

/// A compiled program: runtime imports, global cells and functions.
///
/// The module is self-contained; nothing in it refers to process-wide state,
/// so any number of modules may be built and optimized side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct IrModule {
    imports: Vec<RuntimeImport>,
    globals: Vec<Global>,
    functions: Vec<IrFunction>,
}

impl Default for IrModule {
    fn default() -> Self {
        Self::new()
    }
}

impl IrModule {
    /// Creates a module declaring the `read` and `write` runtime imports.
    #[must_use]
    pub fn new() -> Self {
        Self {
            imports: RuntimeImport::iter().collect(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// The declared runtime imports.
    #[must_use]
    pub fn imports(&self) -> &[RuntimeImport] {
        &self.imports
    }

    /// Adds a zero-initialized global cell.
    pub fn add_global(&mut self, name: Symbol) -> GlobalId {
        let id = GlobalId::new(self.globals.len());
        self.globals.push(Global { name });
        id
    }

    /// The global cells.
    #[must_use]
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Returns a global by id.
    #[must_use]
    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(id.index())
    }

    /// Adds a function.
    pub fn add_function(&mut self, function: IrFunction) {
        self.functions.push(function);
    }

    /// The functions, in definition order.
    #[must_use]
    pub fn functions(&self) -> &[IrFunction] {
        &self.functions
    }

    /// Mutable access to the functions.
    pub fn functions_mut(&mut self) -> &mut [IrFunction] {
        &mut self.functions
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name().as_str() == name)
    }

    /// Returns the index of a function by name.
    #[must_use]
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name().as_str() == name)
    }

    /// Returns the entry function.
    #[must_use]
    pub fn entry(&self) -> Option<&IrFunction> {
        self.function(ENTRY_POINT)
    }

    /// Total number of instructions across all functions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(IrFunction::instruction_count).sum()
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            let params = if import.arity() == 0 { "" } else { "i32" };
            let ret = if import.returns_value() { "i32" } else { "void" };
            writeln!(f, "declare {ret} @{}({params})", import.symbol())?;
        }
        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for (index, global) in self.globals.iter().enumerate() {
            writeln!(
                f,
                "{} = common global i32 0 ; {}",
                GlobalId::new(index),
                global.name
            )?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
