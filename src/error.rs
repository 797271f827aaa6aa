use thiserror::Error;

use crate::{analysis::AnalysisError, emulation::EmulationError};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Invalid type descriptor or method body structure
/// - [`Error::Empty`] - Empty input provided where content was required
///
/// ## Analysis Errors
/// - [`Error::Analysis`] - The frame analyzer could not compute frames for a method.
///   The range-unboxing pass treats this as non-fatal: the method is left untouched.
///
/// ## Execution Errors
/// - [`Error::Emulation`] - The reference executor failed while running a method body
///
/// # Examples
///
/// ```rust
/// use rangeopt::{analysis::{Analyzer, BasicInterpreter}, assembly::InstructionAssembler, Error};
///
/// let mut asm = InstructionAssembler::new_static("broken", "()I");
/// asm.iload(0).ireturn();
/// let body = asm.finish().unwrap();
///
/// match Analyzer::new(BasicInterpreter::new()).analyze("Owner", &body) {
///     Err(Error::Analysis { index, reason }) => {
///         eprintln!("cannot analyze instruction {index}: {reason}");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input is damaged and could not be processed.
    ///
    /// Raised for malformed type or method descriptors, and for method bodies whose
    /// structure is inconsistent (for example, a duplicated label). The error includes
    /// the source location where the malformation was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The frame analyzer rejected the method body.
    ///
    /// Covers unreachable/unverifiable code shapes such as stack underflow, reads of
    /// unassigned locals, or inconsistent stack heights at a control flow merge.
    #[error("Analysis failed at instruction {index}: {reason}")]
    Analysis {
        /// Position of the instruction the analyzer was processing
        index: usize,
        /// What went wrong
        #[source]
        reason: AnalysisError,
    },

    /// The reference executor failed.
    #[error("{0}")]
    Emulation(#[from] EmulationError),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` if this error is an analysis failure.
    ///
    /// Analysis failures abort optimization of a single method and are never
    /// propagated as fatal by the range-unboxing pass.
    #[must_use]
    pub fn is_analysis_failure(&self) -> bool {
        matches!(self, Error::Analysis { .. })
    }
}
