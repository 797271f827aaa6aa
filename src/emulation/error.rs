//! Emulation error types.

use thiserror::Error;

use crate::assembly::Label;

/// Errors that can occur while executing a method body.
///
/// This enum covers every way the executor can refuse to continue, from stack
/// underflows to calls it has no implementation for.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmulationError {
    /// Pop from an empty operand stack.
    #[error("operand stack underflow")]
    StackUnderflow,

    /// Read of a local that was never written.
    #[error("local {0} read before assignment")]
    UninitializedLocal(u16),

    /// Local slot beyond the frame.
    #[error("local {slot} out of range (max_locals = {max_locals})")]
    LocalOutOfRange {
        /// The requested slot
        slot: u16,
        /// Number of local slots available
        max_locals: u16,
    },

    /// Operand of the wrong type.
    #[error("{operation} expected {expected}, found {found}")]
    TypeMismatch {
        /// Operation being performed
        operation: &'static str,
        /// Expected value type
        expected: &'static str,
        /// Actual value found
        found: String,
    },

    /// Method call or cast on `null`.
    #[error("null reference")]
    NullReference,

    /// Reference to an object the heap does not hold.
    #[error("invalid heap reference {0}")]
    InvalidHeapReference(u32),

    /// Heap object limit exceeded.
    #[error("heap limit of {0} objects exceeded")]
    HeapLimitExceeded(usize),

    /// Cast to a type the object is not an instance of.
    #[error("cannot cast {from_type} to {to_type}")]
    InvalidCast {
        /// Runtime class of the object
        from_type: String,
        /// Target type of the cast
        to_type: String,
    },

    /// `next()` on an exhausted iterator.
    #[error("iterator has no more elements")]
    NoSuchElement,

    /// `step` with a non-positive argument.
    #[error("step must be positive, was {0}")]
    InvalidStep(i64),

    /// Call the executor has no implementation for.
    #[error("unsupported method {0}")]
    UnsupportedMethod(String),

    /// Jump to a label that is not placed in the body.
    #[error("jump to unknown label {0}")]
    UnknownLabel(Label),

    /// Execution ran past the last instruction.
    #[error("execution fell off the end of the method")]
    FellOffEnd,

    /// Instruction budget exhausted.
    #[error("instruction limit of {0} exceeded")]
    InstructionLimit(u64),

    /// Wrong number of arguments for the method descriptor.
    #[error("expected {expected} arguments, got {found}")]
    ArgumentCount {
        /// Slots required by the descriptor, including the receiver
        expected: usize,
        /// Arguments supplied
        found: usize,
    },
}
