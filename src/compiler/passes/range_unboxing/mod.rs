//! Removes boxing from `for` loops over numeric ranges.
//!
//! A loop over `kotlin.ranges.IntRange` that is compiled through the generic
//! `java.util.Iterator` protocol boxes every element in `next()` and unboxes it again
//! with `Number.intValue()`. When the abstract interpreter can prove that the
//! iterator came from a range, the fetch is replaced by the primitive
//! `IntIterator.nextInt()` call and the box never exists.
//!
//! The work happens in three steps per method:
//!
//! 1. [`Analyzer`] with the [`ProvenanceInterpreter`] computes a frame per instruction,
//!    tagging iterators obtained from ranges.
//! 2. [`find_occurrences`] scans the stream once and collects the element fetches
//!    whose receiver is tagged.
//! 3. [`rewrite_occurrences`] replaces them in ascending order.
//!
//! A method the analyzer cannot handle is left exactly as it was.
//!
//! # Example
//!
//! ```rust
//! use rangeopt::{assembly::InstructionAssembler, optimize};
//!
//! let mut asm = InstructionAssembler::new_static("sum", "(I)V");
//! let head = asm.new_label();
//! let exit = asm.new_label();
//! asm.iconst(0)
//!     .iload(0)
//!     .invokestatic("kotlin/ranges/RangesKt", "until", "(II)Lkotlin/ranges/IntRange;")
//!     .invokevirtual("kotlin/ranges/IntRange", "iterator", "()Ljava/util/Iterator;")
//!     .astore(1)
//!     .mark(head)
//!     .aload(1)
//!     .invokeinterface("java/util/Iterator", "hasNext", "()Z")
//!     .ifeq(exit)
//!     .aload(1)
//!     .invokeinterface("java/util/Iterator", "next", "()Ljava/lang/Object;")
//!     .astore(2)
//!     .aload(2)
//!     .checkcast("java/lang/Number")
//!     .invokevirtual("java/lang/Number", "intValue", "()I")
//!     .istore(3)
//!     .goto(head)
//!     .mark(exit)
//!     .return_void();
//! let mut body = asm.finish()?;
//! let before = body.len();
//!
//! optimize("demo/Loops", &mut body);
//! assert_eq!(body.len(), before - 1);
//! # Ok::<(), rangeopt::Error>(())
//! ```

mod matcher;
mod rewriter;

pub use matcher::{find_occurrences, Occurrence, PATTERN_LEN};
pub use rewriter::{
    live_position, original_position, rewrite_occurrences, RewriteOutcome, INSERTED, REMOVED,
};

use log::{debug, warn};

use crate::{
    analysis::{Analyzer, ProvenanceInterpreter},
    assembly::MethodBody,
    compiler::{
        context::{MethodKey, MethodStats},
        pass::MethodPass,
        CompilerContext, EventKind, EventLog,
    },
    config::OptimizerConfig,
    Result,
};

/// Optimizes one method body in place with the default configuration.
///
/// Failures never propagate: a method that cannot be analyzed, or whose rewrite
/// fails, keeps its original instructions and a warning is logged.
pub fn optimize(owner: &str, body: &mut MethodBody) {
    let config = OptimizerConfig::default();
    let events = EventLog::new();
    if let Err(err) = optimize_with(owner, body, &config, &events) {
        warn!("{owner}.{}: range unboxing failed: {err}", body.name());
    }
}

/// Optimizes one method body in place.
///
/// Events are appended to `events`. The returned statistics describe what happened;
/// [`MethodStats::analyzed`] is `false` when the analyzer rejected the method.
///
/// # Errors
///
/// Returns an error if an occurrence could not be rewritten. The body is restored to
/// its original instructions before the error is returned. Analysis failures are not
/// errors.
pub fn optimize_with(
    owner: &str,
    body: &mut MethodBody,
    config: &OptimizerConfig,
    events: &EventLog,
) -> Result<MethodStats> {
    let mut stats = MethodStats {
        instructions_before: body.len(),
        instructions_after: body.len(),
        ..MethodStats::default()
    };
    if !config.enabled {
        return Ok(stats);
    }

    let method = MethodKey::of(owner, body).to_string();
    let analyzer = Analyzer::new(ProvenanceInterpreter::new(&config.convention))
        .with_iteration_limit(config.max_analysis_iterations);

    let frames = match analyzer.analyze(owner, body) {
        Ok(frames) => frames,
        Err(err) if err.is_analysis_failure() => {
            warn!("{method}: skipping range unboxing, {err}");
            events
                .record(EventKind::AnalysisFailed)
                .method(method.as_str())
                .message(err.to_string());
            return Ok(stats);
        }
        Err(err) => return Err(err),
    };
    stats.analyzed = true;

    let occurrences = find_occurrences(body, &frames, &config.convention);
    stats.matched = occurrences.len();
    if occurrences.is_empty() {
        return Ok(stats);
    }

    let snapshot = body.instructions().to_vec();
    let outcome = match rewrite_occurrences(
        body,
        &occurrences,
        &frames,
        &config.convention,
        &method,
        events,
    ) {
        Ok(outcome) => outcome,
        Err(err) => {
            body.restore(snapshot);
            return Err(err);
        }
    };
    stats.rewritten = outcome.rewritten;
    stats.skipped = outcome.skipped;

    if config.verify_after_rewrite && outcome.rewritten > 0 {
        if let Err(err) = analyzer.analyze(owner, body) {
            warn!("{method}: rewritten body does not verify, restoring: {err}");
            body.restore(snapshot);
            stats.reverted = true;
            events
                .record(EventKind::RewriteReverted)
                .method(method.as_str())
                .message(err.to_string());
        }
    }

    stats.instructions_after = body.len();
    debug!(
        "{method}: {} matched, {} rewritten, {} skipped",
        stats.matched, stats.rewritten, stats.skipped
    );
    Ok(stats)
}

/// [`MethodPass`] wrapper around [`optimize_with`].
///
/// Uses the configuration and event log of the [`CompilerContext`] and records the
/// per-method statistics there.
#[derive(Debug, Default)]
pub struct RangeUnboxingPass;

impl RangeUnboxingPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MethodPass for RangeUnboxingPass {
    fn name(&self) -> &'static str {
        "range-unboxing"
    }

    fn description(&self) -> &'static str {
        "Replaces boxed range iteration with specialized primitive iterators"
    }

    fn should_run(&self, _method: &MethodKey, ctx: &CompilerContext) -> bool {
        ctx.config.enabled
    }

    fn run_on_method(
        &self,
        body: &mut MethodBody,
        method: &MethodKey,
        ctx: &CompilerContext,
    ) -> Result<bool> {
        let stats = optimize_with(&method.owner, body, &ctx.config, &ctx.events)?;
        ctx.record_stats(method, stats);
        Ok(stats.changed())
    }
}
