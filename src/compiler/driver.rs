//! The compilation driver.
//!
//! [`Compiler`] ties the stages together: lowering, verification and the
//! optimization pipeline. It owns its [`EventLog`], so several compilations
//! may run side by side without sharing state.

use log::debug;

use crate::{
    ast::Module,
    codegen::lower_module,
    compiler::{events::EventLog, scheduler::PassScheduler, scheduler::DEFAULT_MAX_ROUNDS},
    ir::{verify_module, IrModule},
    Result,
};

/// Knobs for a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Run the optimization pipeline.
    pub optimize: bool,
    /// Optimize functions in parallel.
    pub parallel: bool,
    /// Maximum pipeline rounds per function.
    pub max_rounds: usize,
    /// Verify the module again after optimization.
    pub verify_passes: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            parallel: true,
            max_rounds: DEFAULT_MAX_ROUNDS,
            verify_passes: true,
        }
    }
}

/// Compiles AST modules into verified, optionally optimized IR.
///
/// # Examples
///
/// ```rust
/// use mila::{ast::builder::*, Compiler, ExecutionEngine};
///
/// let ast = ModuleBuilder::new().body(add(num(2), mul(num(3), num(4)))).build();
/// let module = Compiler::default().compile(&ast)?;
/// let engine = ExecutionEngine::new(module)?;
/// assert_eq!(engine.entry_point().call()?, 14);
/// # Ok::<(), mila::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Compiler {
    options: CompilerOptions,
    events: EventLog,
}

impl Compiler {
    /// Creates a compiler with the given options.
    #[must_use]
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            events: EventLog::new(),
        }
    }

    /// The options of this compiler.
    #[must_use]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Events recorded by every optimization run of this compiler.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Lowers an AST module to IR and verifies it.
    ///
    /// # Errors
    ///
    /// Returns a lowering error for invalid programs, or
    /// [`crate::Error::IrVerification`] if the generated IR is malformed.
    pub fn lower(&self, ast: &Module) -> Result<IrModule> {
        let module = lower_module(ast)?;
        verify_module(&module)?;
        Ok(module)
    }

    /// Runs the optimization pipeline on `module` in place.
    ///
    /// Returns the largest number of changing rounds any function needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::IrVerification`] if `verify_passes` is set and
    /// the optimized module is malformed.
    pub fn optimize(&self, module: &mut IrModule) -> Result<usize> {
        let before = module.instruction_count();
        let rounds = PassScheduler::standard(self.options.max_rounds)
            .with_parallel(self.options.parallel)
            .run(module, &self.events)?;
        if self.options.verify_passes {
            verify_module(module)?;
        }
        debug!(
            "optimization: {} -> {} instructions",
            before,
            module.instruction_count()
        );
        Ok(rounds)
    }

    /// Lowers, verifies and (if enabled) optimizes an AST module.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage.
    pub fn compile(&self, ast: &Module) -> Result<IrModule> {
        let mut module = self.lower(ast)?;
        if self.options.optimize {
            self.optimize(&mut module)?;
        }
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::builder::*, compiler::EventKind, ir::IrOp};

    #[test]
    fn test_compile_without_optimization() {
        let compiler = Compiler::new(CompilerOptions {
            optimize: false,
            ..CompilerOptions::default()
        });
        let module = compiler
            .compile(&ModuleBuilder::new().body(add(num(1), num(2))).build())
            .unwrap();
        assert_eq!(module.entry().unwrap().instruction_count(), 2);
        assert!(compiler.events().is_empty());
    }

    #[test]
    fn test_compile_records_events() {
        let compiler = Compiler::default();
        let module = compiler
            .compile(&ModuleBuilder::new().body(add(num(1), num(2))).build())
            .unwrap();
        assert_eq!(
            module.entry().unwrap().blocks()[0].instructions,
            vec![IrOp::Return {
                value: crate::ir::Operand::Imm(3)
            }]
        );
        assert!(compiler.events().has(EventKind::ConstantFolded));
        assert!(compiler.events().has(EventKind::InstructionRemoved));
    }

    #[test]
    fn test_second_optimization_is_a_no_op() {
        let body = BlockBuilder::new()
            .var("a")
            .var("b")
            .stmt(assign("a", num(1)))
            .stmt(while_do(lt(var("a"), num(10)), assign("a", add(var("a"), num(1)))))
            .stmt(assign("b", var("a")))
            .stmt(var("b"))
            .build();
        let compiler = Compiler::default();
        let mut module = compiler.compile(&ModuleBuilder::new().body(body).build()).unwrap();
        let snapshot = module.clone();
        assert_eq!(compiler.optimize(&mut module).unwrap(), 0);
        assert_eq!(module, snapshot);
    }
}
