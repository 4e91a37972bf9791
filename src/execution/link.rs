//! Finalization: linking verified IR into a dense executable form.
//!
//! Every SSA value becomes a register index, every `alloca` a frame slot and
//! every global an index into the global table. Call targets are resolved to
//! function indices, runtime imports to host functions, once, before the
//! first instruction runs.

use std::{collections::HashMap, fmt, sync::Arc};

use log::debug;

use crate::{
    ast::Symbol,
    execution::runtime::RuntimeIo,
    ir::{BinaryKind, Callee, ComparePredicate, IrFunction, IrModule, IrOp, Operand, RuntimeImport},
    Result,
};

/// A function supplied by the host.
///
/// Receives the engine's I/O and the evaluated arguments; returns the call
/// result, or `None` for functions without one.
pub type HostFunction =
    Arc<dyn Fn(&mut dyn RuntimeIo, &[i32]) -> Result<Option<i32>> + Send + Sync>;

/// Resolves runtime import symbols to host functions.
///
/// Registered symbols take precedence over the built-in `read` and `write`,
/// so a host may intercept program I/O.
///
/// # Examples
///
/// ```rust
/// use mila::execution::SymbolResolver;
///
/// let mut resolver = SymbolResolver::new();
/// resolver.register("write", |_io, args| {
///     assert_eq!(args.len(), 1);
///     Ok(None)
/// });
/// assert!(resolver.resolve("write").is_some());
/// assert!(resolver.resolve("read").is_some());
/// assert!(resolver.resolve("print").is_none());
/// ```
#[derive(Clone)]
pub struct SymbolResolver {
    symbols: HashMap<String, HostFunction>,
    builtins: bool,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("SymbolResolver")
            .field("symbols", &names)
            .field("builtins", &self.builtins)
            .finish()
    }
}

impl SymbolResolver {
    /// Creates a resolver that falls back to the built-in imports.
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            builtins: true,
        }
    }

    /// Creates a resolver without built-ins; only registered symbols resolve.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            symbols: HashMap::new(),
            builtins: false,
        }
    }

    /// Registers (or replaces) a host function under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&mut dyn RuntimeIo, &[i32]) -> Result<Option<i32>> + Send + Sync + 'static,
    {
        self.symbols.insert(name.into(), Arc::new(function));
        self
    }

    /// Looks up a symbol: registered functions first, then the built-ins.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<HostFunction> {
        if let Some(function) = self.symbols.get(name) {
            return Some(Arc::clone(function));
        }
        if !self.builtins {
            return None;
        }
        RuntimeImport::from_symbol(name).map(builtin)
    }
}

fn builtin(import: RuntimeImport) -> HostFunction {
    match import {
        RuntimeImport::Read => {
            Arc::new(|io: &mut dyn RuntimeIo, _: &[i32]| io.read_int().map(Some))
        }
        RuntimeImport::Write => Arc::new(|io: &mut dyn RuntimeIo, args: &[i32]| {
            io.write_int(args.first().copied().unwrap_or_default())?;
            Ok(None)
        }),
    }
}

/// A source of an `i32` at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Src {
    Imm(i32),
    Reg(usize),
}

/// A memory cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Addr {
    Slot(usize),
    Global(usize),
}

#[derive(Clone)]
pub(crate) enum Target {
    Function(usize),
    Host(Symbol, HostFunction),
}

#[derive(Clone)]
pub(crate) enum Inst {
    Load { dest: usize, addr: Addr },
    Store { addr: Addr, value: Src },
    Binary { dest: usize, kind: BinaryKind, left: Src, right: Src },
    Compare { dest: usize, predicate: ComparePredicate, left: Src, right: Src },
    Copy { dest: usize, src: Src },
    Call { dest: Option<usize>, target: Target, args: Vec<Src> },
    Jump(usize),
    Branch { condition: Src, then: usize, other: usize },
    Return(Src),
}

/// A phi: `(register, [(predecessor, source)])`.
pub(crate) type LinkedPhi = (usize, Vec<(usize, Src)>);

#[derive(Clone)]
pub(crate) struct LinkedBlock {
    pub phis: Vec<LinkedPhi>,
    pub body: Vec<Inst>,
}

#[derive(Clone)]
pub(crate) struct LinkedFunction {
    pub name: Symbol,
    pub params: Vec<usize>,
    pub register_count: usize,
    pub slot_count: usize,
    pub blocks: Vec<LinkedBlock>,
}

/// A finalized module.
#[derive(Clone)]
pub(crate) struct LinkedProgram {
    pub functions: Vec<LinkedFunction>,
    pub global_count: usize,
    pub entry: usize,
}

/// Links a verified module.
///
/// # Errors
///
/// Returns [`crate::Error::IrVerification`] if the module lacks an entry
/// function or uses an operand in a position the verifier should have
/// rejected.
///
/// # Panics
///
/// Panics if a runtime import cannot be resolved by `resolver`. The program
/// cannot run without it.
pub(crate) fn link(module: &IrModule, resolver: &SymbolResolver) -> Result<LinkedProgram> {
    let entry = module
        .function_index(crate::ir::ENTRY_POINT)
        .ok_or_else(|| verify_error!("no entry function @{}", crate::ir::ENTRY_POINT))?;

    let mut hosts: HashMap<RuntimeImport, HostFunction> = HashMap::new();
    for import in module.imports() {
        let Some(function) = resolver.resolve(import.symbol()) else {
            panic!(
                "Program used external function '{}' which couldn't be resolved",
                import.symbol()
            );
        };
        hosts.insert(*import, function);
    }

    let functions = module
        .functions()
        .iter()
        .map(|function| FunctionLinker::new(module, &hosts).link(function))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "linked {} functions, {} globals, {} imports",
        functions.len(),
        module.globals().len(),
        hosts.len()
    );
    Ok(LinkedProgram {
        functions,
        global_count: module.globals().len(),
        entry,
    })
}

struct FunctionLinker<'a> {
    module: &'a IrModule,
    hosts: &'a HashMap<RuntimeImport, HostFunction>,
    slots: HashMap<usize, usize>,
}

impl<'a> FunctionLinker<'a> {
    fn new(module: &'a IrModule, hosts: &'a HashMap<RuntimeImport, HostFunction>) -> Self {
        Self {
            module,
            hosts,
            slots: HashMap::new(),
        }
    }

    fn link(mut self, function: &IrFunction) -> Result<LinkedFunction> {
        for (_, op) in function.instructions() {
            if let IrOp::Alloca { dest, .. } = op {
                let next = self.slots.len();
                self.slots.insert(dest.index(), next);
            }
        }

        let mut blocks = Vec::with_capacity(function.block_count());
        for block in function.blocks() {
            let mut linked = LinkedBlock {
                phis: Vec::new(),
                body: Vec::with_capacity(block.len()),
            };
            for op in &block.instructions {
                match op {
                    IrOp::Alloca { .. } => {}
                    IrOp::Phi { dest, incoming } => {
                        let sources = incoming
                            .iter()
                            .map(|(pred, operand)| Ok((pred.index(), self.src(operand)?)))
                            .collect::<Result<Vec<_>>>()?;
                        linked.phis.push((dest.index(), sources));
                    }
                    other => linked.body.push(self.inst(other)?),
                }
            }
            blocks.push(linked);
        }

        Ok(LinkedFunction {
            name: function.name().clone(),
            params: function.params().iter().map(|p| p.index()).collect(),
            register_count: function.value_count(),
            slot_count: self.slots.len(),
            blocks,
        })
    }

    fn src(&self, operand: &Operand) -> Result<Src> {
        match operand {
            Operand::Imm(value) => Ok(Src::Imm(*value)),
            Operand::Value(value) if !self.slots.contains_key(&value.index()) => {
                Ok(Src::Reg(value.index()))
            }
            other => Err(verify_error!("address {} used as a value", other)),
        }
    }

    fn addr(&self, operand: &Operand) -> Result<Addr> {
        match operand {
            Operand::Global(global) => Ok(Addr::Global(global.index())),
            Operand::Value(value) => self
                .slots
                .get(&value.index())
                .map(|slot| Addr::Slot(*slot))
                .ok_or_else(|| verify_error!("{} is not an address", value)),
            Operand::Imm(value) => Err(verify_error!("immediate {} used as an address", value)),
        }
    }

    fn inst(&self, op: &IrOp) -> Result<Inst> {
        Ok(match op {
            IrOp::Load { dest, addr } => Inst::Load {
                dest: dest.index(),
                addr: self.addr(addr)?,
            },
            IrOp::Store { addr, value } => Inst::Store {
                addr: self.addr(addr)?,
                value: self.src(value)?,
            },
            IrOp::Binary {
                dest,
                kind,
                left,
                right,
            } => Inst::Binary {
                dest: dest.index(),
                kind: *kind,
                left: self.src(left)?,
                right: self.src(right)?,
            },
            IrOp::Compare {
                dest,
                predicate,
                left,
                right,
            } => Inst::Compare {
                dest: dest.index(),
                predicate: *predicate,
                left: self.src(left)?,
                right: self.src(right)?,
            },
            IrOp::ZExt { dest, operand } => Inst::Copy {
                dest: dest.index(),
                src: self.src(operand)?,
            },
            IrOp::Call { dest, callee, args } => Inst::Call {
                dest: dest.map(|d| d.index()),
                target: self.target(callee)?,
                args: args.iter().map(|a| self.src(a)).collect::<Result<_>>()?,
            },
            IrOp::Jump { target } => Inst::Jump(target.index()),
            IrOp::Branch {
                condition,
                true_target,
                false_target,
            } => Inst::Branch {
                condition: self.src(condition)?,
                then: true_target.index(),
                other: false_target.index(),
            },
            IrOp::Return { value } => Inst::Return(self.src(value)?),
            IrOp::Alloca { .. } | IrOp::Phi { .. } => {
                return Err(verify_error!("unexpected {} in block body", op));
            }
        })
    }

    fn target(&self, callee: &Callee) -> Result<Target> {
        match callee {
            Callee::Function(name) => self
                .module
                .function_index(name.as_str())
                .map(Target::Function)
                .ok_or_else(|| verify_error!("call to unknown function @{}", name)),
            Callee::Import(import) => self
                .hosts
                .get(import)
                .map(|host| Target::Host(Symbol::from(import.symbol()), Arc::clone(host)))
                .ok_or_else(|| verify_error!("import {} is not declared", import)),
        }
    }
}
