//! Method passes.
//!
//! Each pass lives in its own module and implements [`MethodPass`](crate::compiler::MethodPass).

mod range_unboxing;

pub use range_unboxing::{
    find_occurrences, live_position, optimize, optimize_with, original_position,
    rewrite_occurrences, Occurrence, RangeUnboxingPass, RewriteOutcome, INSERTED, PATTERN_LEN,
    REMOVED,
};
