//! Pass scheduler for orchestrating pass execution over many methods.
//!
//! The `PassScheduler` runs its registered passes over every method body held by a
//! [`CompilerContext`], repeating until no pass changes anything or the iteration
//! limit is hit.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    compiler::{context::CompilerContext, events::EventKind, pass::MethodPass},
    Result,
};

/// Runs passes over all methods of a context until a fixpoint.
pub struct PassScheduler {
    /// Maximum iterations for the entire pipeline.
    max_iterations: usize,
    /// Registered passes, run in order.
    passes: Vec<Box<dyn MethodPass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(4)
    }
}

impl PassScheduler {
    /// Creates a scheduler without passes.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum iterations for the entire pipeline before stopping.
    #[must_use]
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            passes: Vec::new(),
        }
    }

    /// Appends a pass.
    pub fn add_pass(&mut self, pass: Box<dyn MethodPass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    /// Returns the names of the registered passes, in run order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Runs all passes once over all methods.
    ///
    /// Returns `true` if any pass made changes, `false` otherwise.
    ///
    /// Methods are processed in parallel using rayon. Each body is taken out of the
    /// context while its pass runs, so no lock is held during the transformation.
    fn run_passes_once(ctx: &CompilerContext, passes: &mut [Box<dyn MethodPass>]) -> Result<bool> {
        let any_changed = AtomicBool::new(false);

        for pass in passes.iter_mut() {
            pass.initialize(ctx)?;
        }

        let methods = ctx.method_keys();

        for pass in passes.iter() {
            ctx.events.record(EventKind::PassStarted).pass(pass.name());

            methods.par_iter().for_each(|method| {
                if !pass.should_run(method, ctx) {
                    return;
                }

                // Remove the body (brief lock, then released)
                let Some((_, mut body)) = ctx.bodies.remove(method) else {
                    return;
                };

                let result = pass.run_on_method(&mut body, method, ctx);

                ctx.bodies.insert(method.clone(), body);

                match result {
                    Ok(true) => {
                        any_changed.store(true, Ordering::Relaxed);
                        ctx.processed_methods.insert(method.clone());
                    }
                    Ok(false) => {}
                    Err(err) => {
                        warn!("{} failed on {method}: {err}", pass.name());
                        ctx.events
                            .record(EventKind::Error)
                            .method(method.to_string())
                            .pass(pass.name())
                            .message(err.to_string());
                    }
                }
            });

            ctx.events.record(EventKind::PassCompleted).pass(pass.name());
        }

        for pass in passes.iter_mut() {
            pass.finalize(ctx)?;
        }

        Ok(any_changed.load(Ordering::Relaxed))
    }

    /// Runs the registered passes until nothing changes.
    ///
    /// # Returns
    ///
    /// The number of iterations completed. Events are accumulated in `ctx.events`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass fails to initialize or finalize. Per-method
    /// failures are recorded as events and do not stop the run.
    pub fn run_pipeline(&mut self, ctx: &CompilerContext) -> Result<usize> {
        let mut iterations = 0;

        for iteration in 0..self.max_iterations {
            iterations = iteration + 1;
            if !Self::run_passes_once(ctx, &mut self.passes)? {
                break;
            }
        }

        debug!(
            "pipeline finished after {iterations} iterations: {}",
            ctx.derived_stats()
        );
        Ok(iterations)
    }
}
