use std::{fs, path::Path};

use anyhow::Context;
use log::info;
use mila::{ast::Module, Compiler, ExecutionEngine};

use crate::app::Cli;

/// Loads a JSON-serialized AST module.
pub fn load_module(path: &Path) -> anyhow::Result<Module> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a valid AST", path.display()))
}

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let ast = load_module(&cli.path)?;
    if cli.verbose {
        println!("###### INPUT FILE ######");
        println!("{}", serde_json::to_string_pretty(&ast)?);
    }

    let compiler = Compiler::new(cli.compiler_options());
    let mut module = compiler
        .lower(&ast)
        .with_context(|| format!("failed to compile {}", cli.path.display()))?;
    if cli.verbose {
        println!("###### PRE-OPTIMIZATION ######");
        print!("{module}");
    }

    if compiler.options().optimize {
        compiler
            .optimize(&mut module)
            .context("optimization produced invalid IR")?;
        if cli.verbose {
            println!("###### POST-OPTIMIZATION ######");
            print!("{module}");
        }
    }

    if cli.stats {
        let events = compiler.events();
        println!("{}", events.summary());
        for (kind, count) in events.count_by_kind() {
            println!("  {:<24} {count}", kind.to_string());
        }
        for (pass, count) in events.count_by_pass() {
            println!("  {pass:<32} {count} changes");
        }
    }

    if let Some(path) = &cli.emit {
        fs::write(path, module.to_string())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote IR to {}", path.display());
        return Ok(());
    }

    let engine = ExecutionEngine::new(module)?.with_config(cli.engine_config());
    let result = engine.entry_point().call().context("program failed")?;
    info!("program returned {result}");
    Ok(())
}
