//! End-to-end execution tests.
//!
//! Every program is compiled twice, with and without the optimization
//! pipeline, and both builds must produce the same result.

use mila::{
    ast::{builder::*, Module},
    execution::BufferedIo,
    Compiler, CompilerOptions, EngineConfig, Error, ExecutionEngine, Result, RuntimeFault,
};

fn execute(ast: &Module, optimize: bool, input: &[i32]) -> Result<(i32, Vec<i32>)> {
    let compiler = Compiler::new(CompilerOptions {
        optimize,
        ..CompilerOptions::default()
    });
    let module = compiler.compile(ast)?;
    let engine = ExecutionEngine::new(module)?.with_io(BufferedIo::new(input.iter().copied()));
    let result = engine.entry_point().call()?;
    Ok((result, engine.into_io().take_output()))
}

/// Runs `ast` optimized and unoptimized, asserting both agree.
fn run(ast: &Module) -> i32 {
    let plain = execute(ast, false, &[]).unwrap();
    let optimized = execute(ast, true, &[]).unwrap();
    assert_eq!(plain, optimized, "optimization changed the result");
    plain.0
}

fn eval(node: mila::ast::Node) -> i32 {
    run(&ModuleBuilder::new().body(node).build())
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval(num(1)), 1);
    assert_eq!(eval(add(num(2), num(3))), 5);
    assert_eq!(eval(ret(add(num(2), num(5)))), 7);
    assert_eq!(eval(block(vec![add(num(2), num(5))])), 7);
    assert_eq!(eval(sub(num(2), num(3))), -1);
    assert_eq!(eval(mul(num(2), num(3))), 6);
    assert_eq!(eval(div(num(10), num(2))), 5);
    assert_eq!(eval(div(num(10), num(3))), 3);
    assert_eq!(eval(div(num(-10), num(3))), -3);
    assert_eq!(eval(add(num(2), mul(num(3), num(4)))), 14);
    assert_eq!(eval(mul(num(i32::MAX), num(2))), -2);
    assert_eq!(eval(inc(num(4))), 5);
    assert_eq!(eval(dec(num(4))), 3);
}

#[test]
fn test_comparisons() {
    let cases = [
        (eq(num(2), num(2)), 1),
        (eq(num(2), num(3)), 0),
        (ne(num(2), num(2)), 0),
        (ne(num(2), num(3)), 1),
        (lt(num(1), num(2)), 1),
        (lt(num(4), num(3)), 0),
        (le(num(2), num(2)), 1),
        (ge(num(2), num(2)), 1),
        (gt(num(1), num(2)), 0),
        (gt(num(4), num(3)), 1),
    ];
    for (node, expected) in cases {
        assert_eq!(eval(node), expected);
    }
}

#[test]
fn test_locals() {
    let body = BlockBuilder::new()
        .var("a")
        .var("b")
        .stmt(assign("a", num(2)))
        .stmt(assign("b", num(5)))
        .stmt(add(var("a"), var("b")))
        .build();
    assert_eq!(eval(body), 7);

    let body = BlockBuilder::new()
        .var("i")
        .stmt(assign("i", num(678)))
        .stmt(ret(var("i")))
        .build();
    assert_eq!(eval(body), 678);
}

#[test]
fn test_calls() {
    let module = ModuleBuilder::new()
        .function("t4", &["a", "b"], add(var("a"), var("b")))
        .body(call("t4", vec![num(1), num(2)]))
        .build();
    assert_eq!(run(&module), 3);

    let t6 = |a, b| {
        ModuleBuilder::new()
            .function(
                "t6",
                &["i", "j"],
                if_else(lt(var("i"), var("j")), ret(var("i")), ret(var("j"))),
            )
            .body(call("t6", vec![num(a), num(b)]))
            .build()
    };
    assert_eq!(run(&t6(5, 2)), 2);
    assert_eq!(run(&t6(3, 10)), 3);

    let t7 = |a, b| {
        ModuleBuilder::new()
            .function(
                "t7",
                &["i", "j"],
                if_else(lt(var("i"), var("j")), ret(var("i")), ret(num(4))),
            )
            .body(call("t7", vec![num(a), num(b)]))
            .build()
    };
    assert_eq!(run(&t7(3, 10)), 3);
    assert_eq!(run(&t7(10, 2)), 4);
}

#[test]
fn test_recursion() {
    // function fact(r, x) if (x = 0) then r else fact(r * x, x - 1)
    let module = ModuleBuilder::new()
        .function(
            "fact",
            &["r", "x"],
            if_else(
                eq(var("x"), num(0)),
                var("r"),
                call("fact", vec![mul(var("r"), var("x")), sub(var("x"), num(1))]),
            ),
        )
        .body(call("fact", vec![num(1), num(10)]))
        .build();
    assert_eq!(run(&module), 3_628_800);
}

#[test]
fn test_loops() {
    let returning = BlockBuilder::new()
        .var("i")
        .stmt(assign("i", num(10)))
        .stmt(while_do(
            gt(var("i"), num(0)),
            block(vec![assign("i", sub(var("i"), num(1))), ret(num(67))]),
        ))
        .build();
    assert_eq!(eval(returning), 67);

    let doubling = BlockBuilder::new()
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
    assert_eq!(eval(doubling), 1024);
}

#[test]
fn test_shadowing() {
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
    assert_eq!(eval(body), 12);

    let inner = BlockBuilder::new()
        .var("i")
        .stmt(assign("i", num(12)))
        .build();
    let body = BlockBuilder::new()
        .var("i")
        .stmt(assign("i", num(10)))
        .stmt(inner)
        .stmt(ret(var("i")))
        .build();
    assert_eq!(eval(body), 10);
}

#[test]
fn test_globals_and_constants() {
    let module = ModuleBuilder::new()
        .var("h")
        .constant("k", num(3))
        .function("g", &[], assign("h", var("k")))
        .body(block(vec![call("g", vec![]), mul(var("h"), num(2))]))
        .build();
    assert_eq!(run(&module), 6);
}

#[test]
fn test_read_write_round_trip() -> Result<()> {
    let body = BlockBuilder::new()
        .var("x")
        .var("y")
        .stmt(read("x"))
        .stmt(read("y"))
        .stmt(write(var("y")))
        .stmt(write(var("x")))
        .stmt(add(var("x"), var("y")))
        .build();
    let module = ModuleBuilder::new().body(body).build();

    for optimize in [false, true] {
        let (result, output) = execute(&module, optimize, &[-5, 42])?;
        assert_eq!(result, 37);
        assert_eq!(output, vec![42, -5]);
    }
    Ok(())
}

#[test]
fn test_missing_input() {
    let module = ModuleBuilder::new()
        .var("x")
        .body(block(vec![read("x"), var("x")]))
        .build();
    assert!(matches!(
        execute(&module, true, &[]),
        Err(Error::Fault(RuntimeFault::EndOfInput))
    ));
}

#[test]
fn test_faults() {
    let body = BlockBuilder::new()
        .var("z")
        .stmt(read("z"))
        .stmt(div(num(1), var("z")))
        .build();
    let module = ModuleBuilder::new().body(body).build();
    assert!(matches!(
        execute(&module, true, &[0]),
        Err(Error::Fault(RuntimeFault::DivisionByZero))
    ));

    // Constant division by zero is left for the runtime.
    assert!(matches!(
        execute(&ModuleBuilder::new().body(div(num(1), num(0))).build(), true, &[]),
        Err(Error::Fault(RuntimeFault::DivisionByZero))
    ));
}

#[test]
fn test_call_depth_limit() -> Result<()> {
    let module = ModuleBuilder::new()
        .function(
            "down",
            &["n"],
            if_else(eq(var("n"), num(0)), num(0), call("down", vec![sub(var("n"), num(1))])),
        )
        .body(call("down", vec![num(100)]))
        .build();
    let compiled = Compiler::default().compile(&module)?;

    let engine = ExecutionEngine::new(compiled.clone())?
        .with_io(BufferedIo::default())
        .with_config(EngineConfig::default().with_max_call_depth(50));
    assert!(matches!(
        engine.entry_point().call(),
        Err(Error::RecursionLimit(50))
    ));

    let engine = ExecutionEngine::new(compiled)?.with_io(BufferedIo::default());
    assert_eq!(engine.entry_point().call()?, 0);
    Ok(())
}
