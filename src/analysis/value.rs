//! Baseline abstract values.

use std::fmt;

use crate::{
    analysis::JoinSemiLattice,
    assembly::{LocalKind, Type},
};

/// Internal name of the root reference type.
pub const OBJECT_TYPE: &str = "java/lang/Object";

/// Internal name of the generic iterator interface.
pub const ITERATOR_TYPE: &str = "java/util/Iterator";

/// The generic abstract value computed by the baseline interpreter.
///
/// Carries a type token and nullability, nothing else. [`BasicValue::Uninitialized`]
/// is the top of the lattice: it stands for unassigned locals and for slots whose
/// predecessors disagree on the value category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BasicValue {
    /// Unassigned slot, or conflicting categories
    Uninitialized,
    /// 32-bit integer category
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// The null reference
    Null,
    /// A non-null-proven reference of the given type
    Reference(Type),
}

impl BasicValue {
    /// Returns the abstract value for a declared type, `None` for void.
    #[must_use]
    pub fn of_type(ty: &Type) -> Option<Self> {
        let value = match ty.local_kind()? {
            LocalKind::Int => BasicValue::Int,
            LocalKind::Long => BasicValue::Long,
            LocalKind::Float => BasicValue::Float,
            LocalKind::Double => BasicValue::Double,
            LocalKind::Reference => BasicValue::Reference(ty.clone()),
        };
        Some(value)
    }

    /// The generic iterator value, `Reference(java/util/Iterator)`.
    #[must_use]
    pub fn generic_iterator() -> Self {
        BasicValue::Reference(Type::object(ITERATOR_TYPE))
    }

    /// Returns the slot category, `None` for [`BasicValue::Uninitialized`].
    #[must_use]
    pub fn local_kind(&self) -> Option<LocalKind> {
        match self {
            BasicValue::Uninitialized => None,
            BasicValue::Int => Some(LocalKind::Int),
            BasicValue::Long => Some(LocalKind::Long),
            BasicValue::Float => Some(LocalKind::Float),
            BasicValue::Double => Some(LocalKind::Double),
            BasicValue::Null | BasicValue::Reference(_) => Some(LocalKind::Reference),
        }
    }

    /// Returns the internal type name of an object reference.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        match self {
            BasicValue::Reference(ty) => ty.internal_name(),
            _ => None,
        }
    }

    /// Returns `true` for null and references.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, BasicValue::Null | BasicValue::Reference(_))
    }
}

impl JoinSemiLattice for BasicValue {
    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a.clone(),
            (BasicValue::Null, r @ BasicValue::Reference(_))
            | (r @ BasicValue::Reference(_), BasicValue::Null) => r.clone(),
            (BasicValue::Reference(_), BasicValue::Reference(_)) => {
                BasicValue::Reference(Type::object(OBJECT_TYPE))
            }
            _ => BasicValue::Uninitialized,
        }
    }

    fn is_top(&self) -> bool {
        matches!(self, BasicValue::Uninitialized)
    }
}

impl fmt::Display for BasicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicValue::Uninitialized => f.write_str("."),
            BasicValue::Int => f.write_str("I"),
            BasicValue::Long => f.write_str("J"),
            BasicValue::Float => f.write_str("F"),
            BasicValue::Double => f.write_str("D"),
            BasicValue::Null => f.write_str("null"),
            BasicValue::Reference(ty) => write!(f, "{ty}"),
        }
    }
}
