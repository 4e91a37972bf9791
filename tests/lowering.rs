//! Lowering integration tests.
//!
//! Programs are lowered without optimization and the instruction sequence of
//! each function is compared against the expected shape.

use mila::{
    ast::{builder::*, Module},
    ir::{verify_module, BlockId, IrFunction, IrModule, IrOp, IrType, Operand},
    Compiler, CompilerOptions, ExecutionEngine, Result,
};

fn lower(ast: &Module) -> Result<IrModule> {
    Compiler::new(CompilerOptions {
        optimize: false,
        ..CompilerOptions::default()
    })
    .compile(ast)
}

/// Block-separated mnemonics: `B` opens every block.
fn shape(function: &IrFunction) -> String {
    let mut out = Vec::new();
    for block in function.blocks() {
        out.push("B");
        for op in &block.instructions {
            out.push(match op {
                IrOp::Alloca { .. } => "alloca",
                IrOp::Load { .. } => "load",
                IrOp::Store { .. } => "store",
                IrOp::Binary { kind, .. } => (*kind).into(),
                IrOp::Compare { predicate, .. } => (*predicate).into(),
                IrOp::ZExt { .. } => "zext",
                IrOp::Phi { .. } => "phi",
                IrOp::Call { .. } => "call",
                IrOp::Jump { .. } => "br",
                IrOp::Branch { .. } => "cbr",
                IrOp::Return { .. } => "ret",
            });
        }
    }
    out.join(" ")
}

fn main_shape(node: mila::ast::Node) -> String {
    let module = lower(&ModuleBuilder::new().body(node).build()).unwrap();
    shape(module.entry().unwrap())
}

#[test]
fn test_expression_shapes() {
    assert_eq!(main_shape(num(1)), "B ret");
    assert_eq!(main_shape(add(num(2), num(3))), "B add ret");
    assert_eq!(main_shape(ret(add(num(2), num(5)))), "B add ret");
    assert_eq!(main_shape(block(vec![ret(add(num(2), num(5)))])), "B add ret");
    assert_eq!(main_shape(sub(num(2), num(3))), "B sub ret");
    assert_eq!(main_shape(mul(num(2), num(3))), "B mul ret");
    assert_eq!(main_shape(div(num(10), num(3))), "B sdiv ret");
    assert_eq!(main_shape(eq(num(2), num(2))), "B eq zext ret");
    assert_eq!(main_shape(ne(num(2), num(3))), "B ne zext ret");
    assert_eq!(main_shape(lt(num(1), num(2))), "B slt zext ret");
    assert_eq!(main_shape(le(num(2), num(2))), "B sle zext ret");
    assert_eq!(main_shape(ge(num(2), num(2))), "B sge zext ret");
    assert_eq!(main_shape(gt(num(4), num(3))), "B sgt zext ret");
    assert_eq!(main_shape(add(num(2), mul(num(3), num(4)))), "B mul add ret");
}

#[test]
fn test_function_shapes() -> Result<()> {
    let module = lower(
        &ModuleBuilder::new()
            .function("t4", &["a", "b"], add(var("a"), var("b")))
            .body(call("t4", vec![num(1), num(2)]))
            .build(),
    )?;
    assert_eq!(shape(module.entry().unwrap()), "B call ret");
    assert_eq!(
        shape(module.function("t4").unwrap()),
        "B alloca store alloca store load load add ret"
    );

    let t7 = if_else(lt(var("i"), var("j")), ret(var("i")), ret(num(4)));
    let module = lower(&ModuleBuilder::new().function("t7", &["i", "j"], t7).build())?;
    assert_eq!(
        shape(module.function("t7").unwrap()),
        "B alloca store alloca store load load slt zext ne cbr B load ret B ret"
    );
    Ok(())
}

#[test]
fn test_scoped_locals() -> Result<()> {
    let inner = BlockBuilder::new()
        .var("i")
        .stmt(assign("i", num(12)))
        .stmt(ret(var("i")))
        .build();
    let body = BlockBuilder::new()
        .var("i")
        .stmt(assign("i", num(10)))
        .stmt(inner)
        .build();
    let module = lower(&ModuleBuilder::new().body(body).build())?;
    let main = module.entry().unwrap();
    assert_eq!(
        shape(main),
        "B alloca store store alloca store store load ret"
    );

    // The load reads the inner slot, not the outer one.
    let slots: Vec<_> = main
        .instructions()
        .filter_map(|(_, op)| match op {
            IrOp::Alloca { dest, .. } => Some(Operand::Value(*dest)),
            _ => None,
        })
        .collect();
    let loaded = main
        .instructions()
        .find_map(|(_, op)| match op {
            IrOp::Load { addr, .. } => Some(*addr),
            _ => None,
        })
        .unwrap();
    assert_eq!(loaded, slots[1]);
    Ok(())
}

#[test]
fn test_while_shape() -> Result<()> {
    let body = BlockBuilder::new()
        .var("i")
        .var("b")
        .stmt(assign("i", num(10)))
        .stmt(assign("b", num(1)))
        .stmt(while_do(
            ne(var("i"), num(0)),
            block(vec![
                assign("b", mul(var("b"), num(2))),
                assign("i", sub(var("i"), num(1))),
            ]),
        ))
        .stmt(ret(var("b")))
        .build();
    let module = lower(&ModuleBuilder::new().body(body).build())?;
    let main = module.entry().unwrap();
    assert_eq!(
        shape(main),
        "B alloca store alloca store store store br \
         B load ne zext ne cbr \
         B load mul store load sub store br \
         B load ret"
    );

    let labels: Vec<_> = main.blocks().iter().map(|b| b.label).collect();
    assert_eq!(labels, vec!["entry", "while.cond", "while.body", "while.end"]);
    assert_eq!(
        main.predecessors()[1],
        vec![BlockId::ENTRY, BlockId::new(2)]
    );
    Ok(())
}

#[test]
fn test_if_value_is_merged() -> Result<()> {
    let module = lower(
        &ModuleBuilder::new()
            .function("pick", &["x"], if_else(var("x"), num(10), num(20)))
            .body(call("pick", vec![num(0)]))
            .build(),
    )?;
    let pick = module.function("pick").unwrap();
    let join = pick.blocks().last().unwrap();
    assert_eq!(join.label, "if.end");
    let phi = &join.instructions[0];
    assert!(phi.is_phi());
    assert_eq!(phi.result_type(), Some(IrType::I32));

    assert_eq!(ExecutionEngine::new(module)?.entry_point().call()?, 20);
    Ok(())
}

#[test]
fn test_program_from_json() -> Result<()> {
    // var x; begin read(x); write(x * 2); x end
    let json = r#"{
        "declarations": [{ "symbol": "x" }],
        "body": {
            "kind": "Block",
            "statements": [
                { "kind": "Read", "symbol": "x" },
                { "kind": "Write", "value": {
                    "kind": "Binary", "op": "*",
                    "lhs": { "kind": "Variable", "symbol": "x" },
                    "rhs": { "kind": "Number", "value": 2 }
                } },
                { "kind": "Variable", "symbol": "x", "pos": { "line": 1, "col": 40 } }
            ]
        }
    }"#;
    let ast: Module = serde_json::from_str(json).unwrap();
    assert_eq!(ast.declarations.len(), 1);

    let module = lower(&ast)?;
    verify_module(&module)?;
    assert_eq!(module.globals().len(), 1);

    let text = module.to_string();
    assert!(text.contains("declare i32 @read()"));
    assert!(text.contains("declare void @write(i32)"));
    assert!(text.contains("define i32 @main()"));

    let round_trip: Module = serde_json::from_str(&serde_json::to_string(&ast).unwrap()).unwrap();
    assert_eq!(round_trip, ast);
    Ok(())
}
