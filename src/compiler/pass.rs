//! The per-method pass interface.

use crate::{
    assembly::MethodBody,
    compiler::{CompilerContext, MethodKey},
    Result,
};

/// A transformation applied to one method body at a time.
///
/// Passes must be `Send + Sync`: the [`PassScheduler`](crate::compiler::PassScheduler)
/// runs a pass on many methods in parallel. Each invocation owns its body
/// exclusively; shared state goes through the [`CompilerContext`].
pub trait MethodPass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// One-line description of what the pass does.
    fn description(&self) -> &'static str {
        ""
    }

    /// Should this pass run on a specific method?
    ///
    /// Called before `run_on_method`. Override to skip methods that don't
    /// need this pass.
    fn should_run(&self, _method: &MethodKey, _ctx: &CompilerContext) -> bool {
        true
    }

    /// Runs the pass on a single method body.
    ///
    /// Returns `true` if any changes were made, `false` otherwise.
    /// Events should be recorded directly to `ctx.events`.
    ///
    /// # Arguments
    ///
    /// * `body` - The method body to transform.
    /// * `method` - The identity of the method.
    /// * `ctx` - The shared context (thread-safe, uses shared reference).
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the method. The body must be
    /// left unmodified in that case.
    fn run_on_method(
        &self,
        body: &mut MethodBody,
        method: &MethodKey,
        ctx: &CompilerContext,
    ) -> Result<bool>;

    /// Called once before the pass runs over the methods.
    ///
    /// # Errors
    ///
    /// Returns an error if initialization fails.
    fn initialize(&mut self, _ctx: &CompilerContext) -> Result<()> {
        Ok(())
    }

    /// Called once after the pass ran over all methods.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    fn finalize(&mut self, _ctx: &CompilerContext) -> Result<()> {
        Ok(())
    }
}
