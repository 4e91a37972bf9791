//! The pass interface.

use crate::{compiler::context::CompilerContext, ir::IrFunction, Result};

/// An optimization pass over one IR function.
///
/// Passes must be thread-safe (`Send + Sync`): the scheduler runs the same
/// pass instance on different functions in parallel. A pass receives
/// exclusive access to the function it transforms and shared access to the
/// context. Changes should be recorded to `ctx.events`.
///
/// New passes plug into the pipeline through
/// [`PassScheduler::add_pass`](crate::compiler::PassScheduler::add_pass).
pub trait SsaPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Short description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Should this pass run on a specific function?
    ///
    /// Called before `run_on_function`. Override to skip functions the pass
    /// cannot improve.
    fn should_run(&self, _function: &IrFunction, _ctx: &CompilerContext<'_>) -> bool {
        true
    }

    /// Runs the pass on a single function.
    ///
    /// Returns `true` if any change was made, `false` otherwise. A pass that
    /// reports no change must leave the function untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the function.
    fn run_on_function(&self, function: &mut IrFunction, ctx: &CompilerContext<'_>)
        -> Result<bool>;
}
