//! Locates the boxing element-fetch shape of range loops.
//!
//! A `for` loop over a range that goes through the generic iterator protocol fetches
//! each element with six instructions:
//!
//! ```text
//! i    invokeinterface java/util/Iterator.next()Ljava/lang/Object;   receiver tagged
//! i+1  astore s
//! i+2  aload s
//! i+3  checkcast <boxed type of the kind>
//! i+4  invokevirtual <boxed type>.<accessor>()<primitive>
//! i+5  <primitive store>
//! ```
//!
//! The receiver of `next()` must be a [`ProvenanceValue::RangeIterator`] in the frame
//! at `i`. Matches are reported in ascending order and never overlap.

use log::trace;

use crate::{
    analysis::{AnalysisResults, ProvenanceValue},
    assembly::{Instruction, InvokeKind, LocalKind, MethodBody},
    config::RangeConvention,
};

/// Number of instructions in the element-fetch shape.
pub const PATTERN_LEN: usize = 6;

/// One matched element fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Position of the `next()` call, in original coordinates
    pub index: usize,
    /// Abstract value of the `next()` receiver
    pub value: ProvenanceValue,
    /// Reference slot holding the boxed element
    pub boxed_slot: u16,
}

/// Scans `body` for element fetches from range iterators.
#[must_use]
pub fn find_occurrences(
    body: &MethodBody,
    frames: &AnalysisResults<ProvenanceValue>,
    convention: &RangeConvention,
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    let mut index = 0;

    while index + PATTERN_LEN <= body.len() {
        match match_at(body, frames, convention, index) {
            Some(occurrence) => {
                occurrences.push(occurrence);
                index += PATTERN_LEN;
            }
            None => index += 1,
        }
    }

    occurrences
}

fn match_at(
    body: &MethodBody,
    frames: &AnalysisResults<ProvenanceValue>,
    convention: &RangeConvention,
    index: usize,
) -> Option<Occurrence> {
    let window = body.instructions().get(index..index + PATTERN_LEN)?;

    if !window[0].is_dynamic_call_named(&convention.next_method) {
        return None;
    }

    let receiver = frames.frame(index)?.top()?;
    let Some(kind) = receiver.range_iterator_kind() else {
        trace!("next() at {index} is not on a range iterator");
        return None;
    };
    let entry = convention.entry(kind)?;

    let (LocalKind::Reference, boxed_slot) = window[1].as_store()? else {
        return None;
    };
    if window[2].as_load()? != (LocalKind::Reference, boxed_slot) {
        return None;
    }

    if window[3].as_cast()? != entry.boxed_type {
        trace!("cast at {} does not target {}", index + 3, entry.boxed_type);
        return None;
    }

    match &window[4] {
        Instruction::Invoke {
            kind: InvokeKind::Virtual,
            name,
            ..
        } if *name == entry.accessor => {}
        _ => {
            trace!("no {} accessor call at {}", entry.accessor, index + 4);
            return None;
        }
    }

    let (store_kind, _) = window[5].as_store()?;
    if !store_kind.is_primitive() {
        return None;
    }

    Some(Occurrence {
        index,
        value: receiver.clone(),
        boxed_slot,
    })
}
