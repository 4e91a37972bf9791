//! Name resolution for the code generator.
//!
//! Scopes form an explicit stack of frames. The bottom frame holds module
//! globals; each function body and each `begin ... end` block pushes a frame
//! on entry and pops it on exit. Lookup walks from the innermost frame
//! outward, so inner declarations shadow outer ones.

use std::collections::HashMap;

use crate::{ast::Symbol, ir::Operand};

/// What a name is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A `const`: the bound value itself
    Constant(Operand),
    /// A `var` or parameter: the address of its storage
    Variable(Operand),
}

/// One frame of bindings.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: HashMap<Symbol, Location>,
}

impl Scope {
    /// Binds a name unless this frame already binds it.
    ///
    /// Returns `false` if the name was already bound here.
    pub fn declare(&mut self, symbol: Symbol, location: Location) -> bool {
        if self.bindings.contains_key(&symbol) {
            return false;
        }
        self.bindings.insert(symbol, location);
        true
    }

    /// Looks a name up in this frame only.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Location> {
        self.bindings.get(symbol)
    }
}

/// The stack of active scopes.
#[derive(Debug)]
pub struct ScopeChain {
    frames: Vec<Scope>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    /// Creates a chain holding only the global frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![Scope::default()],
        }
    }

    /// Enters a nested scope.
    pub fn push(&mut self) {
        self.frames.push(Scope::default());
    }

    /// Leaves the innermost scope. The global frame is never popped.
    pub fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "popping the global scope");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of active frames, including the global one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Binds a name in the innermost scope.
    ///
    /// Returns `false` if the innermost scope already binds it.
    pub fn declare(&mut self, symbol: Symbol, location: Location) -> bool {
        match self.frames.last_mut() {
            Some(frame) => frame.declare(symbol, location),
            None => false,
        }
    }

    /// Resolves a name, innermost scope first.
    #[must_use]
    pub fn lookup(&self, symbol: &Symbol) -> Option<&Location> {
        self.frames.iter().rev().find_map(|frame| frame.get(symbol))
    }
}
