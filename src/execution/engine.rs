//! The execution engine: runs finalized modules in process.

use std::cell::{Ref, RefCell};

use log::{debug, trace};

use crate::{
    execution::{
        link::{link, Addr, Inst, LinkedFunction, LinkedProgram, Src, SymbolResolver, Target},
        runtime::{RuntimeIo, StdIo},
    },
    ir::{verify_module, IrModule},
    Error, Result, RuntimeFault,
};

/// Default bound on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Execution limits.
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_call_depth` | 1,024 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum call stack depth, counting the entry function.
    ///
    /// Exceeding it stops execution with [`Error::RecursionLimit`].
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Sets the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }
}

/// Executes a verified module.
///
/// Construction verifies and finalizes the module; after that, the entry
/// point can be called any number of times. Global cells are reset to zero
/// at the start of every call.
///
/// # Examples
///
/// ```rust
/// use mila::{ast::builder::*, execution::BufferedIo, Compiler, ExecutionEngine};
///
/// let ast = ModuleBuilder::new()
///     .var("x")
///     .body(block(vec![read("x"), write(mul(var("x"), num(2))), num(0)]))
///     .build();
/// let module = Compiler::default().compile(&ast)?;
/// let engine = ExecutionEngine::new(module)?.with_io(BufferedIo::new([21]));
/// assert_eq!(engine.entry_point().call()?, 0);
/// assert_eq!(engine.io().output(), &[42]);
/// # Ok::<(), mila::Error>(())
/// ```
pub struct ExecutionEngine<I: RuntimeIo = StdIo> {
    program: LinkedProgram,
    config: EngineConfig,
    io: RefCell<I>,
}

impl ExecutionEngine<StdIo> {
    /// Finalizes `module` with the built-in runtime imports and console I/O.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IrVerification`] if the module is malformed.
    pub fn new(module: IrModule) -> Result<Self> {
        Self::with_resolver(module, &SymbolResolver::new())
    }

    /// Finalizes `module`, resolving runtime imports through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IrVerification`] if the module is malformed.
    ///
    /// # Panics
    ///
    /// Panics if a runtime import of the module cannot be resolved.
    pub fn with_resolver(module: IrModule, resolver: &SymbolResolver) -> Result<Self> {
        verify_module(&module)?;
        let program = link(&module, resolver)?;
        Ok(Self {
            program,
            config: EngineConfig::default(),
            io: RefCell::new(StdIo::new()),
        })
    }
}

impl<I: RuntimeIo> ExecutionEngine<I> {
    /// Replaces the I/O used by the runtime imports.
    #[must_use]
    pub fn with_io<J: RuntimeIo>(self, io: J) -> ExecutionEngine<J> {
        ExecutionEngine {
            program: self.program,
            config: self.config,
            io: RefCell::new(io),
        }
    }

    /// Replaces the execution limits.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The active execution limits.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Borrows the engine's I/O, e.g. to inspect buffered output.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a host function during execution.
    #[must_use]
    pub fn io(&self) -> Ref<'_, I> {
        self.io.borrow()
    }

    /// Consumes the engine, returning its I/O.
    pub fn into_io(self) -> I {
        self.io.into_inner()
    }

    /// The zero-argument entry function of the program.
    #[must_use]
    pub fn entry_point(&self) -> EntryPoint<'_, I> {
        EntryPoint { engine: self }
    }

    fn run(&self) -> Result<i32> {
        let mut globals = vec![0; self.program.global_count];
        let mut io = self.io.borrow_mut();
        let mut machine = Machine {
            program: &self.program,
            max_depth: self.config.max_call_depth,
            globals: &mut globals,
            io: &mut *io,
        };
        let result = machine.run(self.program.entry)?;
        debug!("entry point returned {result}");
        Ok(result)
    }
}

/// A callable handle to the entry function.
pub struct EntryPoint<'a, I: RuntimeIo> {
    engine: &'a ExecutionEngine<I>,
}

impl<I: RuntimeIo> EntryPoint<'_, I> {
    /// Runs the program to completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fault`] if the program faults and
    /// [`Error::RecursionLimit`] if it nests calls too deeply.
    pub fn call(&self) -> Result<i32> {
        self.engine.run()
    }
}

/// Mutable state of one program run.
///
/// Activations live on an explicit stack, so the depth of the interpreted
/// program never consumes host stack.
struct Machine<'a> {
    program: &'a LinkedProgram,
    max_depth: usize,
    globals: &'a mut [i32],
    io: &'a mut dyn RuntimeIo,
}

/// One activation: its registers, slots and position.
struct Frame {
    function: usize,
    registers: Vec<i32>,
    slots: Vec<i32>,
    block: usize,
    pc: usize,
    /// Register of this frame awaiting the result of the pending call.
    pending: Option<usize>,
}

/// Why a frame stopped executing.
enum Step {
    Call { callee: usize, args: Vec<i32> },
    Return(i32),
}

impl Frame {
    fn new(function: &LinkedFunction, index: usize, args: &[i32]) -> Self {
        let mut registers = vec![0; function.register_count];
        for (reg, value) in function.params.iter().zip(args) {
            registers[*reg] = *value;
        }
        Self {
            function: index,
            registers,
            slots: vec![0; function.slot_count],
            block: 0,
            pc: 0,
            pending: None,
        }
    }

    fn get(&self, src: Src) -> i32 {
        match src {
            Src::Imm(value) => value,
            Src::Reg(reg) => self.registers[reg],
        }
    }

    /// Moves to `target`, reading its phis on the edge from the current block.
    fn enter(&mut self, function: &LinkedFunction, target: usize) {
        let values: Vec<(usize, i32)> = function.blocks[target]
            .phis
            .iter()
            .filter_map(|(dest, incoming)| {
                incoming
                    .iter()
                    .find(|(from, _)| *from == self.block)
                    .map(|(_, src)| (*dest, self.get(*src)))
            })
            .collect();
        for (dest, value) in values {
            self.registers[dest] = value;
        }
        self.block = target;
        self.pc = 0;
    }
}

impl Machine<'_> {
    fn activate(&self, index: usize, args: &[i32], depth: usize) -> Result<Frame> {
        if depth > self.max_depth {
            return Err(Error::RecursionLimit(self.max_depth));
        }
        let function = &self.program.functions[index];
        trace!("call @{} depth {}", function.name, depth);
        Ok(Frame::new(function, index, args))
    }

    fn run(&mut self, entry: usize) -> Result<i32> {
        let mut stack = vec![self.activate(entry, &[], 1)?];

        loop {
            let Some(frame) = stack.last_mut() else {
                return Err(verify_error!("call stack underflow"));
            };
            match self.step(frame)? {
                Step::Call { callee, args } => {
                    let callee = self.activate(callee, &args, stack.len() + 1)?;
                    stack.push(callee);
                }
                Step::Return(value) => {
                    stack.pop();
                    let Some(caller) = stack.last_mut() else {
                        return Ok(value);
                    };
                    if let Some(dest) = caller.pending.take() {
                        caller.registers[dest] = value;
                    }
                }
            }
        }
    }

    /// Runs `frame` until it returns or calls a user function.
    fn step(&mut self, frame: &mut Frame) -> Result<Step> {
        let program = self.program;
        let function = &program.functions[frame.function];

        loop {
            let Some(inst) = function.blocks[frame.block].body.get(frame.pc) else {
                return Err(verify_error!(
                    "block {} of @{} has no terminator",
                    frame.block,
                    function.name
                ));
            };
            frame.pc += 1;

            match inst {
                Inst::Load { dest, addr } => {
                    frame.registers[*dest] = match addr {
                        Addr::Slot(slot) => frame.slots[*slot],
                        Addr::Global(global) => self.globals[*global],
                    };
                }
                Inst::Store { addr, value } => {
                    let value = frame.get(*value);
                    match addr {
                        Addr::Slot(slot) => frame.slots[*slot] = value,
                        Addr::Global(global) => self.globals[*global] = value,
                    }
                }
                Inst::Binary {
                    dest,
                    kind,
                    left,
                    right,
                } => {
                    frame.registers[*dest] = kind
                        .evaluate(frame.get(*left), frame.get(*right))
                        .ok_or(RuntimeFault::DivisionByZero)?;
                }
                Inst::Compare {
                    dest,
                    predicate,
                    left,
                    right,
                } => {
                    frame.registers[*dest] =
                        i32::from(predicate.evaluate(frame.get(*left), frame.get(*right)));
                }
                Inst::Copy { dest, src } => frame.registers[*dest] = frame.get(*src),
                Inst::Call { dest, target, args } => {
                    let args: Vec<i32> = args.iter().map(|a| frame.get(*a)).collect();
                    match target {
                        Target::Function(callee) => {
                            frame.pending = *dest;
                            return Ok(Step::Call {
                                callee: *callee,
                                args,
                            });
                        }
                        Target::Host(name, host) => {
                            trace!("host call {name}{args:?}");
                            let result = host(&mut *self.io, &args)?;
                            if let Some(dest) = dest {
                                frame.registers[*dest] = result.unwrap_or_default();
                            }
                        }
                    }
                }
                Inst::Jump(target) => frame.enter(function, *target),
                Inst::Branch {
                    condition,
                    then,
                    other,
                } => {
                    let target = if frame.get(*condition) != 0 { *then } else { *other };
                    frame.enter(function, target);
                }
                Inst::Return(value) => return Ok(Step::Return(frame.get(*value))),
            }
        }
    }
}
