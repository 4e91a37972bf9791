//! Lowering from the AST to SSA IR.
//!
//! # Architecture
//!
//! ```text
//! ast::Module ──► CodeGenerator ──► IrModule
//!                  ├─ ScopeChain         symbol → Location, innermost first
//!                  ├─ signatures         function name → arity, declared up front
//!                  └─ FunctionBuilder    insertion point of the function being built
//! ```
//!
//! Lowering happens in three steps: global declarations, then every function
//! signature (so calls may target functions defined later, including mutual
//! recursion), then the function bodies and finally the top-level body as the
//! entry function `main`.
//!
//! Each node lowers to an optional value: the value of the last evaluated
//! construct. Statements such as `while` or `write` yield none. Where a value
//! is required and none exists, `0` is used.
//!
//! # Control flow
//!
//! - `if`: the condition is compared `ne 0` and branches to `if.then`/`if.else`.
//!   Branches that fall through jump to `if.end`, which merges their values in
//!   a phi. If both branches return, no join block is created and the `if`
//!   terminates the current position.
//! - `while`: `while.cond` re-evaluates the condition before every iteration;
//!   `while.body` jumps back unless it returned; `while.end` follows.
//! - `return`: terminates the current position. Anything lowered after it in
//!   the same block is rejected.

mod scope;

use std::collections::HashMap;

use log::debug;

pub use scope::{Location, Scope, ScopeChain};

use crate::{
    ast::{BinaryOperator, Declaration, Module, Node, NodeKind, SourcePos, Symbol, UnaryOperator},
    ir::{
        BinaryKind, BlockId, Callee, ComparePredicate, IrFunction, IrModule, IrOp, Operand,
        RuntimeImport, ValueId, ENTRY_POINT,
    },
    Error, Result,
};

/// Lowers an AST module into a fresh IR module.
///
/// # Errors
///
/// Returns the first lowering error encountered; no partial module is
/// produced.
pub fn lower_module(ast: &Module) -> Result<IrModule> {
    CodeGenerator::new().lower(ast)
}

/// Insertion point and bookkeeping for the function being lowered.
struct FunctionBuilder {
    function: IrFunction,
    current: BlockId,
    terminated: bool,
}

impl FunctionBuilder {
    fn new(name: Symbol, param_count: usize) -> Self {
        let mut function = IrFunction::new(name, param_count);
        let entry = function.add_block("entry");
        Self {
            function,
            current: entry,
            terminated: false,
        }
    }

    fn add_block(&mut self, label: &'static str) -> BlockId {
        self.function.add_block(label)
    }

    fn switch_to(&mut self, block: BlockId) {
        self.current = block;
        self.terminated = false;
    }

    fn emit_into(&mut self, block: BlockId, op: IrOp) {
        if let Some(block) = self.function.block_mut(block) {
            block.instructions.push(op);
        }
    }

    fn emit(&mut self, op: IrOp) {
        debug_assert!(!self.terminated, "emitting into a terminated block");
        self.emit_into(self.current, op);
    }

    fn emit_value(&mut self, build: impl FnOnce(ValueId) -> IrOp) -> ValueId {
        let dest = self.function.new_value();
        self.emit(build(dest));
        dest
    }

    fn terminate(&mut self, op: IrOp) {
        self.emit(op);
        self.terminated = true;
    }

    fn finish(self) -> IrFunction {
        self.function
    }
}

/// AST-to-IR lowering for one module.
///
/// A generator is consumed by [`CodeGenerator::lower`]; create a new one per
/// module.
pub struct CodeGenerator {
    module: IrModule,
    scopes: ScopeChain,
    signatures: HashMap<Symbol, usize>,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    /// Creates a generator with an empty module.
    #[must_use]
    pub fn new() -> Self {
        Self {
            module: IrModule::new(),
            scopes: ScopeChain::new(),
            signatures: HashMap::new(),
        }
    }

    /// Lowers `ast` into IR.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Redefinition`], [`Error::ReservedName`],
    /// [`Error::UndefinedSymbol`], [`Error::ConstantAssignment`],
    /// [`Error::ArityMismatch`], [`Error::UnreachableCode`] or
    /// [`Error::NonConstantInitializer`] or [`Error::ConstantDivisionByZero`]
    /// for invalid programs.
    pub fn lower(mut self, ast: &Module) -> Result<IrModule> {
        self.declare_globals(&ast.declarations)?;
        self.declare_functions(ast)?;

        for function in &ast.functions {
            let lowered = self.lower_function(function.name.clone(), &function.arguments, &function.body, function.pos)?;
            self.module.add_function(lowered);
        }

        let main = self.lower_function(Symbol::from(ENTRY_POINT), &[], &ast.body, ast.pos)?;
        self.module.add_function(main);

        debug!(
            "lowered {} functions, {} globals, {} instructions",
            self.module.functions().len(),
            self.module.globals().len(),
            self.module.instruction_count()
        );
        Ok(self.module)
    }

    fn declare_globals(&mut self, declarations: &[Declaration]) -> Result<()> {
        for declaration in declarations {
            let location = match &declaration.value {
                None => {
                    let id = self.module.add_global(declaration.symbol.clone());
                    Location::Variable(Operand::Global(id))
                }
                Some(value) => {
                    Location::Constant(Operand::Imm(self.fold_constant(value, declaration)?))
                }
            };
            self.declare(&declaration.symbol, location, declaration.pos)?;
        }
        Ok(())
    }

    fn declare_functions(&mut self, ast: &Module) -> Result<()> {
        for function in &ast.functions {
            let name = function.name.as_str();
            if name == ENTRY_POINT || RuntimeImport::from_symbol(name).is_some() {
                return Err(Error::ReservedName {
                    symbol: function.name.clone(),
                    pos: function.pos,
                });
            }
            if self
                .signatures
                .insert(function.name.clone(), function.arguments.len())
                .is_some()
            {
                return Err(Error::Redefinition {
                    symbol: function.name.clone(),
                    pos: function.pos,
                });
            }
        }
        Ok(())
    }

    /// Evaluates the initializer `node` of the module-level constant
    /// `declaration`.
    ///
    /// Literals, previously declared constants and arithmetic over them fold.
    fn fold_constant(&self, node: &Node, declaration: &Declaration) -> Result<i32> {
        let not_constant = || Error::NonConstantInitializer {
            symbol: declaration.symbol.clone(),
            pos: declaration.pos,
        };
        match &node.kind {
            NodeKind::Number { value } => Ok(*value),
            NodeKind::Variable { symbol } => match self.scopes.lookup(symbol) {
                Some(Location::Constant(Operand::Imm(value))) => Ok(*value),
                _ => Err(not_constant()),
            },
            NodeKind::Unary { op, operand } => {
                let value = self.fold_constant(operand, declaration)?;
                Ok(match op {
                    UnaryOperator::Inc => value.wrapping_add(1),
                    UnaryOperator::Dec => value.wrapping_sub(1),
                })
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let left = self.fold_constant(lhs, declaration)?;
                let right = self.fold_constant(rhs, declaration)?;
                match lower_operator(*op) {
                    Lowered::Arithmetic(kind) => kind.evaluate(left, right).ok_or_else(|| {
                        Error::ConstantDivisionByZero {
                            symbol: declaration.symbol.clone(),
                            pos: node.pos,
                        }
                    }),
                    Lowered::Comparison(predicate) => {
                        Ok(i32::from(predicate.evaluate(left, right)))
                    }
                }
            }
            _ => Err(not_constant()),
        }
    }

    fn declare(&mut self, symbol: &Symbol, location: Location, pos: SourcePos) -> Result<()> {
        if self.scopes.declare(symbol.clone(), location) {
            Ok(())
        } else {
            Err(Error::Redefinition {
                symbol: symbol.clone(),
                pos,
            })
        }
    }

    fn lower_function(
        &mut self,
        name: Symbol,
        arguments: &[Symbol],
        body: &Node,
        pos: SourcePos,
    ) -> Result<IrFunction> {
        let mut builder = FunctionBuilder::new(name, arguments.len());

        self.scopes.push();
        let value = self
            .bind_parameters(&mut builder, arguments, pos)
            .and_then(|()| self.lower_node(&mut builder, body));
        self.scopes.pop();
        debug_assert_eq!(self.scopes.depth(), 1, "scopes left open after a function body");
        let value = value?;

        if !builder.terminated {
            builder.terminate(IrOp::Return {
                value: value.unwrap_or(Operand::Imm(0)),
            });
        }

        let function = builder.finish();
        debug!(
            "lowered @{}: {} blocks, {} instructions",
            function.name(),
            function.block_count(),
            function.instruction_count()
        );
        Ok(function)
    }

    /// Parameters are copied into stack slots so they can be reassigned.
    fn bind_parameters(
        &mut self,
        builder: &mut FunctionBuilder,
        arguments: &[Symbol],
        pos: SourcePos,
    ) -> Result<()> {
        for (index, argument) in arguments.iter().enumerate() {
            let param = builder.function.params()[index];
            let slot = builder.emit_value(|dest| IrOp::Alloca {
                dest,
                name: argument.clone(),
            });
            builder.emit(IrOp::Store {
                addr: Operand::Value(slot),
                value: Operand::Value(param),
            });
            self.declare(argument, Location::Variable(Operand::Value(slot)), pos)?;
        }
        Ok(())
    }

    fn lower_declarations(
        &mut self,
        builder: &mut FunctionBuilder,
        declarations: &[Declaration],
    ) -> Result<()> {
        for declaration in declarations {
            let location = match &declaration.value {
                None => {
                    let slot = builder.emit_value(|dest| IrOp::Alloca {
                        dest,
                        name: declaration.symbol.clone(),
                    });
                    builder.emit(IrOp::Store {
                        addr: Operand::Value(slot),
                        value: Operand::Imm(0),
                    });
                    Location::Variable(Operand::Value(slot))
                }
                Some(value) => Location::Constant(self.lower_operand(builder, value)?),
            };
            self.declare(&declaration.symbol, location, declaration.pos)?;
        }
        Ok(())
    }

    /// Lowers a node whose value is required.
    fn lower_operand(&mut self, builder: &mut FunctionBuilder, node: &Node) -> Result<Operand> {
        let value = self.lower_node(builder, node)?;
        if builder.terminated {
            return Err(Error::UnreachableCode { pos: node.pos });
        }
        Ok(value.unwrap_or(Operand::Imm(0)))
    }

    fn lower_node(&mut self, builder: &mut FunctionBuilder, node: &Node) -> Result<Option<Operand>> {
        match &node.kind {
            NodeKind::Block {
                declarations,
                statements,
            } => {
                self.scopes.push();
                let value = self.lower_block(builder, declarations, statements);
                self.scopes.pop();
                value
            }
            NodeKind::If {
                condition,
                true_case,
                false_case,
            } => self.lower_if(builder, condition, true_case, false_case.as_deref()),
            NodeKind::While { condition, body } => self.lower_while(builder, condition, body),
            NodeKind::Return { value } => {
                let value = self.lower_operand(builder, value)?;
                builder.terminate(IrOp::Return { value });
                Ok(None)
            }
            NodeKind::Assignment { symbol, value } => {
                let value = self.lower_operand(builder, value)?;
                let addr = self.resolve_variable(symbol, node.pos)?;
                builder.emit(IrOp::Store { addr, value });
                Ok(Some(value))
            }
            NodeKind::Read { symbol } => {
                let addr = self.resolve_variable(symbol, node.pos)?;
                let value = builder.emit_value(|dest| IrOp::Call {
                    dest: Some(dest),
                    callee: Callee::Import(RuntimeImport::Read),
                    args: vec![],
                });
                builder.emit(IrOp::Store {
                    addr,
                    value: Operand::Value(value),
                });
                Ok(Some(Operand::Value(value)))
            }
            NodeKind::Write { value } => {
                let value = self.lower_operand(builder, value)?;
                builder.emit(IrOp::Call {
                    dest: None,
                    callee: Callee::Import(RuntimeImport::Write),
                    args: vec![value],
                });
                Ok(None)
            }
            NodeKind::Call {
                function,
                arguments,
            } => self.lower_call(builder, function, arguments, node.pos),
            NodeKind::Binary { op, lhs, rhs } => {
                let left = self.lower_operand(builder, lhs)?;
                let right = self.lower_operand(builder, rhs)?;
                let value = match lower_operator(*op) {
                    Lowered::Arithmetic(kind) => builder.emit_value(|dest| IrOp::Binary {
                        dest,
                        kind,
                        left,
                        right,
                    }),
                    Lowered::Comparison(predicate) => {
                        let flag = builder.emit_value(|dest| IrOp::Compare {
                            dest,
                            predicate,
                            left,
                            right,
                        });
                        builder.emit_value(|dest| IrOp::ZExt {
                            dest,
                            operand: Operand::Value(flag),
                        })
                    }
                };
                Ok(Some(Operand::Value(value)))
            }
            NodeKind::Unary { op, operand } => {
                let left = self.lower_operand(builder, operand)?;
                let kind = match op {
                    UnaryOperator::Inc => BinaryKind::Add,
                    UnaryOperator::Dec => BinaryKind::Sub,
                };
                let value = builder.emit_value(|dest| IrOp::Binary {
                    dest,
                    kind,
                    left,
                    right: Operand::Imm(1),
                });
                Ok(Some(Operand::Value(value)))
            }
            NodeKind::Variable { symbol } => match self.scopes.lookup(symbol) {
                Some(Location::Constant(value)) => Ok(Some(*value)),
                Some(Location::Variable(addr)) => {
                    let addr = *addr;
                    let value = builder.emit_value(|dest| IrOp::Load { dest, addr });
                    Ok(Some(Operand::Value(value)))
                }
                None => Err(Error::UndefinedSymbol {
                    symbol: symbol.clone(),
                    pos: node.pos,
                }),
            },
            NodeKind::Number { value } => Ok(Some(Operand::Imm(*value))),
        }
    }

    fn lower_block(
        &mut self,
        builder: &mut FunctionBuilder,
        declarations: &[Declaration],
        statements: &[Node],
    ) -> Result<Option<Operand>> {
        self.lower_declarations(builder, declarations)?;

        let mut value = None;
        for statement in statements {
            if builder.terminated {
                return Err(Error::UnreachableCode { pos: statement.pos });
            }
            value = self.lower_node(builder, statement)?;
        }
        Ok(value)
    }

    fn lower_if(
        &mut self,
        builder: &mut FunctionBuilder,
        condition: &Node,
        true_case: &Node,
        false_case: Option<&Node>,
    ) -> Result<Option<Operand>> {
        let condition = self.lower_operand(builder, condition)?;
        let test = builder.emit_value(|dest| IrOp::Compare {
            dest,
            predicate: ComparePredicate::Ne,
            left: condition,
            right: Operand::Imm(0),
        });

        let then_block = builder.add_block("if.then");
        let else_block = builder.add_block("if.else");
        builder.terminate(IrOp::Branch {
            condition: Operand::Value(test),
            true_target: then_block,
            false_target: else_block,
        });

        let mut exits: Vec<(BlockId, Operand)> = Vec::with_capacity(2);

        builder.switch_to(then_block);
        let value = self.lower_node(builder, true_case)?;
        if !builder.terminated {
            exits.push((builder.current, value.unwrap_or(Operand::Imm(0))));
        }

        builder.switch_to(else_block);
        let value = match false_case {
            Some(node) => self.lower_node(builder, node)?,
            None => None,
        };
        if !builder.terminated {
            exits.push((builder.current, value.unwrap_or(Operand::Imm(0))));
        }

        if exits.is_empty() {
            return Ok(None);
        }

        let join = builder.add_block("if.end");
        for (exit, _) in &exits {
            builder.emit_into(*exit, IrOp::Jump { target: join });
        }
        builder.switch_to(join);
        let merged = builder.emit_value(|dest| IrOp::Phi {
            dest,
            incoming: exits,
        });
        Ok(Some(Operand::Value(merged)))
    }

    fn lower_while(
        &mut self,
        builder: &mut FunctionBuilder,
        condition: &Node,
        body: &Node,
    ) -> Result<Option<Operand>> {
        let cond_block = builder.add_block("while.cond");
        let body_block = builder.add_block("while.body");
        let exit_block = builder.add_block("while.end");
        builder.terminate(IrOp::Jump { target: cond_block });

        builder.switch_to(cond_block);
        let condition = self.lower_operand(builder, condition)?;
        let test = builder.emit_value(|dest| IrOp::Compare {
            dest,
            predicate: ComparePredicate::Ne,
            left: condition,
            right: Operand::Imm(0),
        });
        builder.terminate(IrOp::Branch {
            condition: Operand::Value(test),
            true_target: body_block,
            false_target: exit_block,
        });

        builder.switch_to(body_block);
        self.lower_node(builder, body)?;
        if !builder.terminated {
            builder.terminate(IrOp::Jump { target: cond_block });
        }

        builder.switch_to(exit_block);
        Ok(None)
    }

    fn lower_call(
        &mut self,
        builder: &mut FunctionBuilder,
        function: &Symbol,
        arguments: &[Node],
        pos: SourcePos,
    ) -> Result<Option<Operand>> {
        let Some(&expected) = self.signatures.get(function) else {
            return Err(Error::UndefinedSymbol {
                symbol: function.clone(),
                pos,
            });
        };
        if expected != arguments.len() {
            return Err(Error::ArityMismatch {
                symbol: function.clone(),
                expected,
                found: arguments.len(),
                pos,
            });
        }

        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.lower_operand(builder, argument)?);
        }
        let value = builder.emit_value(|dest| IrOp::Call {
            dest: Some(dest),
            callee: Callee::Function(function.clone()),
            args,
        });
        Ok(Some(Operand::Value(value)))
    }

    /// Resolves the storage of a writable name.
    fn resolve_variable(&self, symbol: &Symbol, pos: SourcePos) -> Result<Operand> {
        match self.scopes.lookup(symbol) {
            Some(Location::Variable(addr)) => Ok(*addr),
            Some(Location::Constant(_)) => Err(Error::ConstantAssignment {
                symbol: symbol.clone(),
                pos,
            }),
            None => Err(Error::UndefinedSymbol {
                symbol: symbol.clone(),
                pos,
            }),
        }
    }
}

enum Lowered {
    Arithmetic(BinaryKind),
    Comparison(ComparePredicate),
}

fn lower_operator(op: BinaryOperator) -> Lowered {
    match op {
        BinaryOperator::Add => Lowered::Arithmetic(BinaryKind::Add),
        BinaryOperator::Sub => Lowered::Arithmetic(BinaryKind::Sub),
        BinaryOperator::Mul => Lowered::Arithmetic(BinaryKind::Mul),
        BinaryOperator::Div => Lowered::Arithmetic(BinaryKind::SDiv),
        BinaryOperator::Eq => Lowered::Comparison(ComparePredicate::Eq),
        BinaryOperator::Ne => Lowered::Comparison(ComparePredicate::Ne),
        BinaryOperator::Lt => Lowered::Comparison(ComparePredicate::Slt),
        BinaryOperator::Gt => Lowered::Comparison(ComparePredicate::Sgt),
        BinaryOperator::Le => Lowered::Comparison(ComparePredicate::Sle),
        BinaryOperator::Ge => Lowered::Comparison(ComparePredicate::Sge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::builder::*, ir::verify_module};

    fn lower(module: &Module) -> IrModule {
        let ir = lower_module(module).unwrap();
        verify_module(&ir).unwrap();
        ir
    }

    fn mnemonics(function: &IrFunction) -> Vec<&'static str> {
        function
            .instructions()
            .map(|(_, op)| match op {
                IrOp::Alloca { .. } => "alloca",
                IrOp::Load { .. } => "load",
                IrOp::Store { .. } => "store",
                IrOp::Binary { kind, .. } => (*kind).into(),
                IrOp::Compare { .. } => "icmp",
                IrOp::ZExt { .. } => "zext",
                IrOp::Phi { .. } => "phi",
                IrOp::Call { .. } => "call",
                IrOp::Jump { .. } => "br",
                IrOp::Branch { .. } => "cbr",
                IrOp::Return { .. } => "ret",
            })
            .collect()
    }

    #[test]
    fn test_arithmetic_shape() {
        let ir = lower(&ModuleBuilder::new().body(add(num(2), mul(num(3), num(4)))).build());
        let main = ir.entry().unwrap();
        assert_eq!(mnemonics(main), vec!["mul", "add", "ret"]);
    }

    #[test]
    fn test_comparison_is_widened() {
        let ir = lower(&ModuleBuilder::new().body(le(num(2), num(2))).build());
        assert_eq!(mnemonics(ir.entry().unwrap()), vec!["icmp", "zext", "ret"]);
    }

    #[test]
    fn test_locals_are_zero_initialized() {
        let body = BlockBuilder::new()
            .var("a")
            .var("b")
            .stmt(assign("a", num(2)))
            .stmt(assign("b", num(5)))
            .stmt(add(var("a"), var("b")))
            .build();
        let ir = lower(&ModuleBuilder::new().function("f", &[], body).build());
        assert_eq!(
            mnemonics(ir.function("f").unwrap()),
            vec![
                "alloca", "store", "alloca", "store", "store", "store", "load", "load", "add",
                "ret"
            ]
        );
    }

    #[test]
    fn test_parameters_get_slots() {
        let ir = lower(
            &ModuleBuilder::new()
                .function("t4", &["a", "b"], add(var("a"), var("b")))
                .body(call("t4", vec![num(1), num(2)]))
                .build(),
        );
        assert_eq!(
            mnemonics(ir.function("t4").unwrap()),
            vec!["alloca", "store", "alloca", "store", "load", "load", "add", "ret"]
        );
        assert_eq!(mnemonics(ir.entry().unwrap()), vec!["call", "ret"]);
    }

    #[test]
    fn test_if_both_branches_return() {
        let body = if_else(lt(var("i"), var("j")), ret(var("i")), ret(var("j")));
        let ir = lower(&ModuleBuilder::new().function("t6", &["i", "j"], body).build());
        let f = ir.function("t6").unwrap();
        // entry, then, else; no join block
        assert_eq!(f.block_count(), 3);
        assert!(!mnemonics(f).contains(&"phi"));
    }

    #[test]
    fn test_if_merges_with_phi() {
        let body = if_then(var("x"), num(5));
        let ir = lower(&ModuleBuilder::new().function("f", &["x"], body).build());
        let f = ir.function("f").unwrap();
        assert_eq!(f.block_count(), 4);
        let join = f.block(BlockId::new(3)).unwrap();
        let IrOp::Phi { incoming, .. } = &join.instructions[0] else {
            panic!("join block must start with a phi");
        };
        assert_eq!(
            incoming,
            &vec![
                (BlockId::new(1), Operand::Imm(5)),
                (BlockId::new(2), Operand::Imm(0))
            ]
        );
    }

    #[test]
    fn test_if_single_fallthrough() {
        let body = if_else(var("x"), ret(num(1)), num(2));
        let ir = lower(&ModuleBuilder::new().function("f", &["x"], body).build());
        let join = ir.function("f").unwrap().block(BlockId::new(3)).unwrap();
        let IrOp::Phi { incoming, .. } = &join.instructions[0] else {
            panic!("join block must start with a phi");
        };
        assert_eq!(incoming, &vec![(BlockId::new(2), Operand::Imm(2))]);
    }

    #[test]
    fn test_while_without_back_edge() {
        let body = BlockBuilder::new()
            .var("i")
            .stmt(assign("i", num(10)))
            .stmt(while_do(
                gt(var("i"), num(0)),
                block(vec![assign("i", sub(var("i"), num(1))), ret(num(67))]),
            ))
            .build();
        let ir = lower(&ModuleBuilder::new().function("f", &[], body).build());
        let f = ir.function("f").unwrap();
        let body_block = f.block(BlockId::new(2)).unwrap();
        assert_eq!(body_block.label, "while.body");
        assert!(body_block.successors().is_empty());
        let cond = f.block(BlockId::new(1)).unwrap();
        assert_eq!(f.predecessors()[cond.id.index()], vec![BlockId::ENTRY]);
    }

    #[test]
    fn test_globals_and_constants() {
        let ir = lower(
            &ModuleBuilder::new()
                .var("g")
                .constant("k", mul(num(6), num(7)))
                .body(block(vec![assign("g", var("k")), var("g")]))
                .build(),
        );
        assert_eq!(ir.globals().len(), 1);
        let main = ir.entry().unwrap();
        let store = main
            .instructions()
            .find_map(|(_, op)| match op {
                IrOp::Store { value, .. } => Some(*value),
                _ => None,
            })
            .unwrap();
        assert_eq!(store, Operand::Imm(42));
    }

    #[test]
    fn test_forward_and_mutual_calls() {
        let ir = lower(
            &ModuleBuilder::new()
                .function(
                    "even",
                    &["n"],
                    if_else(
                        eq(var("n"), num(0)),
                        num(1),
                        call("odd", vec![sub(var("n"), num(1))]),
                    ),
                )
                .function(
                    "odd",
                    &["n"],
                    if_else(
                        eq(var("n"), num(0)),
                        num(0),
                        call("even", vec![sub(var("n"), num(1))]),
                    ),
                )
                .body(call("even", vec![num(4)]))
                .build(),
        );
        assert_eq!(ir.functions().len(), 3);
    }

    #[test]
    fn test_read_stores_result() {
        let body = BlockBuilder::new().var("x").stmt(read("x")).stmt(write(var("x"))).build();
        let ir = lower(&ModuleBuilder::new().body(body).build());
        assert_eq!(
            mnemonics(ir.entry().unwrap()),
            vec!["alloca", "store", "call", "store", "load", "call", "ret"]
        );
    }

    #[test]
    fn test_errors() {
        let dup = BlockBuilder::new().var("x").var("x").build();
        assert!(matches!(
            lower_module(&ModuleBuilder::new().body(dup).build()),
            Err(Error::Redefinition { .. })
        ));

        assert!(matches!(
            lower_module(&ModuleBuilder::new().function("main", &[], num(1)).build()),
            Err(Error::ReservedName { .. })
        ));
        assert!(matches!(
            lower_module(&ModuleBuilder::new().function("write", &["x"], num(1)).build()),
            Err(Error::ReservedName { .. })
        ));

        assert!(matches!(
            lower_module(&ModuleBuilder::new().body(var("nope").at(4, 2)).build()),
            Err(Error::UndefinedSymbol { pos, .. }) if pos == SourcePos::new(4, 2)
        ));

        let assign_const = BlockBuilder::new()
            .constant("c", num(1))
            .stmt(assign("c", num(2)))
            .build();
        assert!(matches!(
            lower_module(&ModuleBuilder::new().body(assign_const).build()),
            Err(Error::ConstantAssignment { .. })
        ));

        assert!(matches!(
            lower_module(
                &ModuleBuilder::new()
                    .function("f", &["a"], var("a"))
                    .body(call("f", vec![]))
                    .build()
            ),
            Err(Error::ArityMismatch {
                expected: 1,
                found: 0,
                ..
            })
        ));

        let after_return = block(vec![ret(num(1)), num(2).at(3, 9)]);
        assert!(matches!(
            lower_module(&ModuleBuilder::new().body(after_return).build()),
            Err(Error::UnreachableCode { pos }) if pos == SourcePos::new(3, 9)
        ));

        assert!(matches!(
            lower_module(&ModuleBuilder::new().var("g").constant("k", var("g")).build()),
            Err(Error::NonConstantInitializer { .. })
        ));
    }
}
