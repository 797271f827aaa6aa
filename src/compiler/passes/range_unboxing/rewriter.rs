//! Replaces matched element fetches with calls to the specialized iterator.
//!
//! Each occurrence is rewritten in place:
//!
//! ```text
//! before                                     after
//! aload it                                   aload it
//! invokeinterface Iterator.next()Object      aconst_null
//! astore s                                   astore s
//! aload s                                    checkcast kotlin/collections/IntIterator
//! checkcast java/lang/Number                 invokevirtual IntIterator.nextInt()I
//! invokevirtual Number.intValue()I           istore x
//! istore x
//! ```
//!
//! The null store keeps slot `s` definitely assigned for verifiers that still see a
//! later read of it. Every rewrite shrinks the stream by one instruction, so all
//! positions after it move left. Frames were computed once on the original stream;
//! [`live_position`] and [`original_position`] translate between the two coordinate
//! systems using the number of rewrites already applied.

use log::{debug, warn};

use super::Occurrence;

use crate::{
    analysis::{AnalysisResults, ProvenanceValue},
    assembly::{Constant, Instruction, InvokeKind, LocalKind, MethodBody},
    compiler::{EventKind, EventLog},
    config::RangeConvention,
    Result,
};

/// Instructions removed per rewrite: `next`, store, load, cast, accessor.
pub const REMOVED: usize = 5;

/// Instructions inserted per rewrite: null, store, cast, specialized call.
pub const INSERTED: usize = 4;

/// Position of an original index after `applied` earlier rewrites.
#[must_use]
pub fn live_position(original: usize, applied: usize) -> usize {
    original - applied * (REMOVED - INSERTED)
}

/// Inverse of [`live_position`].
#[must_use]
pub fn original_position(live: usize, applied: usize) -> usize {
    live + applied * (REMOVED - INSERTED)
}

/// Result of a rewrite run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Occurrences replaced
    pub rewritten: usize,
    /// Occurrences left alone because their kind has no specialized iterator
    pub skipped: usize,
}

/// Rewrites `occurrences` in ascending order.
///
/// `frames` must be the analysis of `body` before any of these rewrites.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if an occurrence no longer lines up with the
/// stream. The body may be partially rewritten in that case; callers keep a
/// snapshot to restore.
pub fn rewrite_occurrences(
    body: &mut MethodBody,
    occurrences: &[Occurrence],
    frames: &AnalysisResults<ProvenanceValue>,
    convention: &RangeConvention,
    method: &str,
    events: &EventLog,
) -> Result<RewriteOutcome> {
    let mut outcome = RewriteOutcome::default();

    for occurrence in occurrences {
        let live = live_position(occurrence.index, outcome.rewritten);

        let kind = frames
            .frame(original_position(live, outcome.rewritten))
            .and_then(|frame| frame.top())
            .and_then(ProvenanceValue::range_iterator_kind);
        let Some(kind) = kind else {
            return Err(malformed_error!(
                "No range iterator on the stack at {} in {}",
                occurrence.index,
                method
            ));
        };

        let iterator = convention
            .entry(kind)
            .and_then(|entry| entry.iterator.as_ref().map(|it| (entry, it)));
        let Some((entry, iterator)) = iterator else {
            warn!(
                "{method}: no specialized iterator for {kind} elements, keeping loop at {}",
                occurrence.index
            );
            events
                .record(EventKind::OccurrenceSkipped)
                .at(method, occurrence.index)
                .message(format!("no specialized iterator for {kind}"));
            outcome.skipped += 1;
            continue;
        };

        if !body
            .get(live)
            .is_some_and(|instruction| instruction.is_dynamic_call_named(&convention.next_method))
        {
            return Err(malformed_error!(
                "Expected {} call at {} (originally {}) in {}",
                convention.next_method,
                live,
                occurrence.index,
                method
            ));
        }

        let replacement = [
            Instruction::Const(Constant::Null),
            Instruction::Store {
                kind: LocalKind::Reference,
                slot: occurrence.boxed_slot,
            },
            Instruction::CheckCast(iterator.type_name.clone()),
            Instruction::invoke(
                InvokeKind::Virtual,
                &iterator.type_name,
                &iterator.next_method,
                &entry.next_descriptor(),
            ),
        ];

        body.remove(live..live + REMOVED);
        body.insert(live, replacement);

        debug!(
            "{method}: unboxed {kind} loop at {} (live {live})",
            occurrence.index
        );
        events
            .record(EventKind::OccurrenceRewritten)
            .at(method, occurrence.index)
            .message(format!("{}.{}", iterator.type_name, iterator.next_method));
        outcome.rewritten += 1;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{Analyzer, ProvenanceInterpreter},
        compiler::find_occurrences,
        config::ElementKind,
        test::{boxing_range_loop, RangeLoop},
    };

    #[test]
    fn test_position_mapping() {
        assert_eq!(live_position(10, 0), 10);
        assert_eq!(live_position(30, 2), 28);
        assert_eq!(original_position(28, 2), 30);
    }

    #[test]
    fn test_rewrite_int_loop() -> Result<()> {
        let convention = RangeConvention::default();
        let mut body = boxing_range_loop(&RangeLoop::ints("until"))?;
        let before = body.len();
        let frames =
            Analyzer::new(ProvenanceInterpreter::new(&convention)).analyze("demo/Loops", &body)?;
        let occurrences = find_occurrences(&body, &frames, &convention);
        let index = occurrences[0].index;

        let events = EventLog::new();
        let outcome = rewrite_occurrences(
            &mut body,
            &occurrences,
            &frames,
            &convention,
            "demo/Loops.run",
            &events,
        )?;

        assert_eq!(outcome.rewritten, 1);
        assert_eq!(body.len(), before - 1);
        assert_eq!(body.get(index), Some(&Instruction::Const(Constant::Null)));
        assert_eq!(
            body.get(index + 2),
            Some(&Instruction::CheckCast(
                "kotlin/collections/IntIterator".to_string()
            ))
        );
        assert_eq!(
            body.get(index + 3),
            Some(&Instruction::invoke(
                InvokeKind::Virtual,
                "kotlin/collections/IntIterator",
                "nextInt",
                "()I"
            ))
        );
        assert_eq!(body.get(index + 4).and_then(Instruction::as_store), Some((LocalKind::Int, 4)));
        assert_eq!(events.count_kind(EventKind::OccurrenceRewritten), 1);
        assert_eq!(events.iter().next().and_then(|e| e.location), Some(index));
        Ok(())
    }

    #[test]
    fn test_kind_without_iterator_is_skipped() -> Result<()> {
        let mut convention = RangeConvention::default();
        for entry in &mut convention.entries {
            if entry.kind == ElementKind::Int {
                entry.iterator = None;
            }
        }

        let mut body = boxing_range_loop(&RangeLoop::ints("rangeTo"))?;
        let original = body.clone();
        let frames =
            Analyzer::new(ProvenanceInterpreter::new(&convention)).analyze("demo/Loops", &body)?;
        let occurrences = find_occurrences(&body, &frames, &convention);
        assert_eq!(occurrences.len(), 1);

        let events = EventLog::new();
        let outcome =
            rewrite_occurrences(&mut body, &occurrences, &frames, &convention, "m", &events)?;
        assert_eq!(outcome, RewriteOutcome { rewritten: 0, skipped: 1 });
        assert_eq!(body, original);
        assert!(events.has(EventKind::OccurrenceSkipped));
        Ok(())
    }

    #[test]
    fn test_stale_occurrence_is_rejected() -> Result<()> {
        let convention = RangeConvention::default();
        let mut body = boxing_range_loop(&RangeLoop::ints("until"))?;
        let frames =
            Analyzer::new(ProvenanceInterpreter::new(&convention)).analyze("demo/Loops", &body)?;
        let occurrences = find_occurrences(&body, &frames, &convention);
        body.insert(occurrences[0].index, [Instruction::Nop]);

        let result =
            rewrite_occurrences(&mut body, &occurrences, &frames, &convention, "m", &EventLog::new());
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));
        Ok(())
    }
}
