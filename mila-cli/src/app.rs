use std::path::PathBuf;

use clap::Parser;

/// mila - compile and run programs given as JSON syntax trees
#[derive(Debug, Parser)]
#[command(name = "mila", version, about, long_about = None)]
pub struct Cli {
    /// Path to the AST of the program, serialized as JSON.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Echo the AST and the IR before and after optimization; enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the IR to this file instead of executing the program.
    #[arg(long, value_name = "PATH")]
    pub emit: Option<PathBuf>,

    /// Skip the optimization pipeline.
    #[arg(long)]
    pub no_opt: bool,

    /// Optimize functions one after another instead of in parallel.
    #[arg(long)]
    pub sequential: bool,

    /// Maximum optimization rounds per function.
    #[arg(long, default_value_t = mila::compiler::DEFAULT_MAX_ROUNDS)]
    pub max_rounds: usize,

    /// Maximum call depth of the running program.
    #[arg(long, default_value_t = mila::execution::DEFAULT_MAX_CALL_DEPTH)]
    pub max_call_depth: usize,

    /// Print a summary of the optimizations that were applied.
    #[arg(long)]
    pub stats: bool,
}

impl Cli {
    /// Compiler options selected on the command line.
    pub fn compiler_options(&self) -> mila::CompilerOptions {
        mila::CompilerOptions {
            optimize: !self.no_opt,
            parallel: !self.sequential,
            max_rounds: self.max_rounds,
            ..mila::CompilerOptions::default()
        }
    }

    /// Execution limits selected on the command line.
    pub fn engine_config(&self) -> mila::EngineConfig {
        mila::EngineConfig::default().with_max_call_depth(self.max_call_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["mila", "program.json"]);
        assert!(!cli.verbose);
        assert!(cli.emit.is_none());
        let options = cli.compiler_options();
        assert!(options.optimize);
        assert!(options.parallel);
        assert_eq!(options.max_rounds, mila::compiler::DEFAULT_MAX_ROUNDS);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "mila",
            "--verbose",
            "--no-opt",
            "--emit",
            "out.ll",
            "--max-call-depth",
            "8",
            "program.json",
        ]);
        assert!(cli.verbose);
        assert!(!cli.compiler_options().optimize);
        assert_eq!(cli.emit.as_deref(), Some(std::path::Path::new("out.ll")));
        assert_eq!(cli.engine_config().max_call_depth, 8);
    }
}
