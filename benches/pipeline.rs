//! Benchmarks for the compilation pipeline.
//!
//! Measures each stage on a synthetic module of loop-heavy functions:
//! - Lowering and verification
//! - Optimization, sequential and parallel
//! - Execution of the optimized entry point

extern crate mila;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mila::{
    ast::{builder::*, Module},
    execution::BufferedIo,
    Compiler, CompilerOptions, ExecutionEngine,
};
use std::hint::black_box;

/// `count` functions, each summing `i * k` over a counted loop with some
/// constant arithmetic that the optimizer can remove.
fn synthetic(count: usize) -> Module {
    let mut module = ModuleBuilder::new().var("acc");
    for index in 0..count {
        let k = i32::try_from(index).unwrap_or(i32::MAX);
        let body = BlockBuilder::new()
            .var("i")
            .var("s")
            .var("unused")
            .stmt(assign("unused", mul(num(k), num(3))))
            .stmt(assign("i", var("n")))
            .stmt(while_do(
                gt(var("i"), num(0)),
                block(vec![
                    assign("s", add(var("s"), mul(var("i"), add(num(k), num(1))))),
                    assign("i", sub(var("i"), num(1))),
                    if_then(eq(num(1), num(0)), assign("acc", num(-1))),
                ]),
            ))
            .stmt(assign("acc", add(var("acc"), var("s"))))
            .stmt(var("s"))
            .build();
        module = module.function(&format!("f{index}"), &["n"], body);
    }

    let calls = (0..count)
        .map(|index| call(&format!("f{index}"), vec![num(100)]))
        .collect::<Vec<_>>();
    module.body(block(calls)).build()
}

fn bench_lowering(c: &mut Criterion) {
    let ast = synthetic(64);
    let compiler = Compiler::default();

    c.bench_function("lower_64_functions", |b| {
        b.iter(|| {
            let module = compiler.lower(black_box(&ast)).unwrap();
            black_box(module)
        });
    });
}

fn bench_optimization(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");
    for count in [8, 64] {
        let ast = synthetic(count);
        for parallel in [false, true] {
            let options = CompilerOptions {
                parallel,
                ..CompilerOptions::default()
            };
            let lowered = Compiler::new(options).lower(&ast).unwrap();
            let label = if parallel { "parallel" } else { "sequential" };

            group.bench_with_input(BenchmarkId::new(label, count), &lowered, |b, lowered| {
                b.iter(|| {
                    // A fresh compiler keeps the event log from growing across iterations.
                    let compiler = Compiler::new(options);
                    let mut module = lowered.clone();
                    compiler.optimize(black_box(&mut module)).unwrap();
                    black_box(module)
                });
            });
        }
    }
    group.finish();
}

fn bench_execution(c: &mut Criterion) {
    let ast = synthetic(16);
    for optimize in [false, true] {
        let compiler = Compiler::new(CompilerOptions {
            optimize,
            ..CompilerOptions::default()
        });
        let engine = ExecutionEngine::new(compiler.compile(&ast).unwrap())
            .unwrap()
            .with_io(BufferedIo::default());
        let name = if optimize {
            "execute_optimized"
        } else {
            "execute_unoptimized"
        };

        c.bench_function(name, |b| {
            b.iter(|| black_box(engine.entry_point().call().unwrap()));
        });
    }
}

criterion_group!(
    benches,
    bench_lowering,
    bench_optimization,
    bench_execution
);
criterion_main!(benches);
