//! Runtime values.

use std::fmt;

use crate::{assembly::LocalKind, emulation::EmulationError};

/// Opaque handle to an object on the [`ManagedHeap`](crate::emulation::ManagedHeap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapRef(pub(crate) u32);

impl HeapRef {
    /// Returns the raw object id.
    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HeapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A value on the operand stack or in a local slot.
///
/// | Descriptor | Variant |
/// |------------|---------|
/// | `Z`, `B`, `C`, `S`, `I` | [`EmValue::Int`] |
/// | `J` | [`EmValue::Long`] |
/// | `F` | [`EmValue::Float`] |
/// | `D` | [`EmValue::Double`] |
/// | `Lname;`, `[T` | [`EmValue::Ref`] or [`EmValue::Null`] |
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmValue {
    /// 32-bit integer, also booleans and chars
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// The null reference
    Null,
    /// Reference to a heap object
    Ref(HeapRef),
}

impl EmValue {
    /// Returns the local category this value is stored with.
    #[must_use]
    pub fn kind(&self) -> LocalKind {
        match self {
            EmValue::Int(_) => LocalKind::Int,
            EmValue::Long(_) => LocalKind::Long,
            EmValue::Float(_) => LocalKind::Float,
            EmValue::Double(_) => LocalKind::Double,
            EmValue::Null | EmValue::Ref(_) => LocalKind::Reference,
        }
    }

    /// Short type name for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            EmValue::Int(_) => "int",
            EmValue::Long(_) => "long",
            EmValue::Float(_) => "float",
            EmValue::Double(_) => "double",
            EmValue::Null => "null",
            EmValue::Ref(_) => "reference",
        }
    }

    /// Returns the int payload.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::TypeMismatch`] for any other value.
    pub fn as_int(&self, operation: &'static str) -> Result<i32, EmulationError> {
        match self {
            EmValue::Int(v) => Ok(*v),
            other => Err(mismatch(operation, "int", other)),
        }
    }

    /// Returns the long payload.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::TypeMismatch`] for any other value.
    pub fn as_long(&self, operation: &'static str) -> Result<i64, EmulationError> {
        match self {
            EmValue::Long(v) => Ok(*v),
            other => Err(mismatch(operation, "long", other)),
        }
    }

    /// Returns the heap reference, or `None` for `null`.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::TypeMismatch`] for primitives.
    pub fn as_heap_ref(&self, operation: &'static str) -> Result<Option<HeapRef>, EmulationError> {
        match self {
            EmValue::Ref(r) => Ok(Some(*r)),
            EmValue::Null => Ok(None),
            other => Err(mismatch(operation, "reference", other)),
        }
    }
}

fn mismatch(operation: &'static str, expected: &'static str, found: &EmValue) -> EmulationError {
    EmulationError::TypeMismatch {
        operation,
        expected,
        found: found.to_string(),
    }
}

impl fmt::Display for EmValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmValue::Int(v) => write!(f, "{v}"),
            EmValue::Long(v) => write!(f, "{v}L"),
            EmValue::Float(v) => write!(f, "{v}F"),
            EmValue::Double(v) => write!(f, "{v}D"),
            EmValue::Null => f.write_str("null"),
            EmValue::Ref(r) => write!(f, "{r}"),
        }
    }
}
