//! Pass scheduler for orchestrating pass execution.
//!
//! The `PassScheduler` runs its pass sequence over every function of a
//! module, repeating the sequence per function until a round makes no
//! change. Functions share no mutable state during optimization, so they are
//! processed in parallel.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    compiler::{
        context::CompilerContext,
        events::EventLog,
        pass::SsaPass,
        passes::{
            ConstantPropagationPass, DeadCodeEliminationPass, DeadInstructionEliminationPass,
            DeadStoreEliminationPass,
        },
    },
    ir::{IrFunction, IrModule},
    Result,
};

/// Default bound on pipeline rounds per function.
pub const DEFAULT_MAX_ROUNDS: usize = 32;

/// Orchestrates pass execution to a per-function fixpoint.
///
/// Every round runs all passes in order on one function. The scheduler stops
/// as soon as a round reports no change, or after `max_rounds` rounds as a
/// safety net.
pub struct PassScheduler {
    /// Maximum rounds per function.
    max_rounds: usize,
    /// Whether functions are processed on the rayon pool.
    parallel: bool,
    /// Passes in execution order.
    passes: Vec<Box<dyn SsaPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::standard(DEFAULT_MAX_ROUNDS)
    }
}

impl PassScheduler {
    /// Creates a scheduler without passes.
    ///
    /// # Arguments
    ///
    /// * `max_rounds` - Maximum pipeline rounds per function before stopping.
    #[must_use]
    pub fn new(max_rounds: usize) -> Self {
        Self {
            max_rounds,
            parallel: true,
            passes: Vec::new(),
        }
    }

    /// Creates a scheduler with the standard pipeline: constant propagation,
    /// dead instruction, dead code and dead store elimination.
    #[must_use]
    pub fn standard(max_rounds: usize) -> Self {
        let mut scheduler = Self::new(max_rounds);
        scheduler.add_pass(ConstantPropagationPass::new());
        scheduler.add_pass(DeadInstructionEliminationPass::new());
        scheduler.add_pass(DeadCodeEliminationPass::new());
        scheduler.add_pass(DeadStoreEliminationPass::new());
        scheduler
    }

    /// Appends a pass to the end of the sequence.
    pub fn add_pass(&mut self, pass: impl SsaPass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Enables or disables parallel processing of functions.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns the pass names in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Returns the maximum number of rounds per function.
    #[must_use]
    pub const fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Runs one round of every pass on a function.
    ///
    /// Returns `true` if any pass made changes.
    fn run_round(&self, function: &mut IrFunction, ctx: &CompilerContext<'_>) -> Result<bool> {
        let mut changed = false;
        for pass in &self.passes {
            if !pass.should_run(function, ctx) {
                continue;
            }
            if pass.run_on_function(function, ctx)? {
                debug!("{} changed @{}", pass.name(), function.name());
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Runs the pipeline on one function until a round makes no change.
    ///
    /// # Returns
    ///
    /// The number of rounds that made changes.
    fn optimize_function(
        &self,
        function: &mut IrFunction,
        ctx: &CompilerContext<'_>,
    ) -> Result<usize> {
        for round in 0..self.max_rounds {
            if !self.run_round(function, ctx)? {
                return Ok(round);
            }
        }

        warn!(
            "@{} still changing after {} rounds",
            function.name(),
            self.max_rounds
        );
        ctx.events.warn(format!(
            "@{} did not converge within {} rounds",
            function.name(),
            self.max_rounds
        ));
        Ok(self.max_rounds)
    }

    /// Runs the pipeline over every function of `module`.
    ///
    /// # Arguments
    ///
    /// * `module` - The module to optimize in place.
    /// * `events` - Log receiving the changes made by each pass.
    ///
    /// # Returns
    ///
    /// The largest number of changing rounds any function needed.
    ///
    /// # Errors
    ///
    /// Returns an error if any pass fails.
    pub fn run(&self, module: &mut IrModule, events: &EventLog) -> Result<usize> {
        let ctx = CompilerContext::new(module, events);
        for pass in &self.passes {
            debug!("pass {}: {}", pass.name(), pass.description());
        }
        let changed_functions = AtomicUsize::new(0);

        let optimize = |function: &mut IrFunction| -> Result<usize> {
            let rounds = self.optimize_function(function, &ctx)?;
            if rounds > 0 {
                changed_functions.fetch_add(1, Ordering::Relaxed);
            }
            Ok(rounds)
        };

        let rounds: Vec<usize> = if self.parallel {
            module
                .functions_mut()
                .par_iter_mut()
                .map(optimize)
                .collect::<Result<_>>()?
        } else {
            module
                .functions_mut()
                .iter_mut()
                .map(optimize)
                .collect::<Result<_>>()?
        };

        let max_rounds = rounds.into_iter().max().unwrap_or(0);
        info!(
            "optimized {} of {} functions ({} rounds at most, {})",
            changed_functions.load(Ordering::Relaxed),
            module.functions().len(),
            max_rounds,
            events.summary()
        );
        Ok(max_rounds)
    }
}
