//! Every user error aborts compilation with a positioned error and no module.

use mila::{
    ast::{builder::*, Declaration, Module, SourcePos, Symbol},
    Compiler, Error,
};

fn compile(ast: &Module) -> Error {
    match Compiler::default().compile(ast) {
        Ok(module) => panic!("expected an error, got:\n{module}"),
        Err(error) => error,
    }
}

#[test]
fn test_redefinition() {
    let body = BlockBuilder::new()
        .var("x")
        .declaration(Declaration {
            symbol: Symbol::from("x"),
            value: None,
            pos: SourcePos::new(2, 5),
        })
        .build();
    let error = compile(&ModuleBuilder::new().body(body).build());
    assert!(matches!(
        &error,
        Error::Redefinition { symbol, pos } if symbol.as_str() == "x" && *pos == SourcePos::new(2, 5)
    ));
    assert_eq!(error.to_string(), "Redefinition of 'x' (line: 2, col: 5)");

    let error = compile(
        &ModuleBuilder::new()
            .function("f", &["a", "a"], num(0))
            .build(),
    );
    assert!(matches!(error, Error::Redefinition { .. }));

    let error = compile(
        &ModuleBuilder::new()
            .function("f", &[], num(0))
            .function("f", &[], num(1))
            .build(),
    );
    assert!(matches!(error, Error::Redefinition { .. }));
}

#[test]
fn test_shadowing_is_not_redefinition() {
    let inner = BlockBuilder::new().var("x").stmt(num(0)).build();
    let body = BlockBuilder::new().var("x").stmt(inner).build();
    assert!(Compiler::default()
        .compile(&ModuleBuilder::new().body(body).build())
        .is_ok());
}

#[test]
fn test_reserved_names() {
    for name in ["main", "read", "write"] {
        let error = compile(&ModuleBuilder::new().function(name, &[], num(0)).build());
        assert!(
            matches!(&error, Error::ReservedName { symbol, .. } if symbol.as_str() == name),
            "{error}"
        );
    }
}

#[test]
fn test_undefined_symbols() {
    let error = compile(&ModuleBuilder::new().body(var("y").at(1, 3)).build());
    assert_eq!(error.to_string(), "Undefined symbol 'y' (line: 1, col: 3)");

    let error = compile(&ModuleBuilder::new().body(assign("y", num(1))).build());
    assert!(matches!(error, Error::UndefinedSymbol { .. }));

    let error = compile(&ModuleBuilder::new().body(call("nowhere", vec![])).build());
    assert!(matches!(error, Error::UndefinedSymbol { .. }));

    // Locals do not outlive their block.
    let body = block(vec![BlockBuilder::new().var("t").build(), var("t")]);
    let error = compile(&ModuleBuilder::new().body(body).build());
    assert!(matches!(error, Error::UndefinedSymbol { .. }));
}

#[test]
fn test_constant_assignment() {
    let error = compile(
        &ModuleBuilder::new()
            .constant("k", num(1))
            .body(assign("k", num(2)))
            .build(),
    );
    assert!(matches!(error, Error::ConstantAssignment { .. }));

    let error = compile(
        &ModuleBuilder::new()
            .constant("k", num(1))
            .body(read("k"))
            .build(),
    );
    assert!(matches!(error, Error::ConstantAssignment { .. }));
}

#[test]
fn test_assignment_lowers_value_before_target() {
    let error = compile(&ModuleBuilder::new().body(assign("x", var("y"))).build());
    assert!(matches!(error, Error::UndefinedSymbol { symbol, .. } if symbol.as_str() == "y"));

    let error = compile(
        &ModuleBuilder::new()
            .constant("k", num(1))
            .body(assign("k", var("z")))
            .build(),
    );
    assert!(matches!(error, Error::UndefinedSymbol { symbol, .. } if symbol.as_str() == "z"));
}

#[test]
fn test_arity_mismatch() {
    let error = compile(
        &ModuleBuilder::new()
            .function("pair", &["a", "b"], add(var("a"), var("b")))
            .body(call("pair", vec![num(1), num(2), num(3)]).at(7, 1))
            .build(),
    );
    assert_eq!(
        error.to_string(),
        "Function 'pair' expects 2 arguments, got 3 (line: 7, col: 1)"
    );
}

#[test]
fn test_unreachable_code() {
    let body = block(vec![ret(num(1)), write(num(2)).at(2, 1)]);
    let error = compile(&ModuleBuilder::new().body(body).build());
    assert!(matches!(error, Error::UnreachableCode { pos } if pos == SourcePos::new(2, 1)));

    let body = block(vec![
        if_else(num(1), ret(num(1)), ret(num(2))),
        num(3).at(4, 2),
    ]);
    let error = compile(&ModuleBuilder::new().body(body).build());
    assert!(matches!(error, Error::UnreachableCode { .. }));
}

#[test]
fn test_non_constant_global_initializer() {
    let error = compile(
        &ModuleBuilder::new()
            .constant("k", call("f", vec![]))
            .function("f", &[], num(1))
            .build(),
    );
    assert!(matches!(error, Error::NonConstantInitializer { .. }));

    // Constant folding of initializers may use earlier constants.
    assert!(Compiler::default()
        .compile(
            &ModuleBuilder::new()
                .constant("a", num(6))
                .constant("b", mul(var("a"), num(7)))
                .body(var("b"))
                .build()
        )
        .is_ok());
}

#[test]
fn test_constant_division_by_zero() {
    let error = compile(
        &ModuleBuilder::new()
            .constant("k", div(num(1), num(0)).at(1, 11))
            .body(var("k"))
            .build(),
    );
    assert!(matches!(
        &error,
        Error::ConstantDivisionByZero { symbol, pos }
            if symbol.as_str() == "k" && *pos == SourcePos::new(1, 11)
    ));
    assert_eq!(
        error.to_string(),
        "Division by zero in initializer of global constant 'k' (line: 1, col: 11)"
    );

    // Only a constant zero divisor is rejected.
    assert!(matches!(
        compile(
            &ModuleBuilder::new()
                .constant("k", div(num(1), call("f", vec![])))
                .function("f", &[], num(0))
                .build()
        ),
        Error::NonConstantInitializer { .. }
    ));
}
