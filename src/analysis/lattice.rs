//! Lattice trait for abstract values.
//!
//! A lattice defines how abstract values combine at control flow join points. The
//! frame analyzer only ever needs the join (least upper bound): two values flowing
//! into the same slot from different predecessors are replaced by their join.
//!
//! # Lattice Theory Background
//!
//! - **Partial Order**: Elements can be compared (≤)
//! - **Join (∨)**: Least upper bound of two elements
//! - **Top (⊤)**: Greatest element (no information)
//!
//! Termination of the analyzer relies on the join being monotone and the lattice
//! having finite height.

use std::fmt::Debug;

/// A join semi-lattice with a join (least upper bound) operation.
///
/// It must satisfy:
///
/// - **Idempotent**: `x.join(x) = x`
/// - **Commutative**: `x.join(y) = y.join(x)`
/// - **Associative**: `x.join(y.join(z)) = (x.join(y)).join(z)`
///
/// # Examples
///
/// ```rust
/// use rangeopt::analysis::{BasicValue, JoinSemiLattice};
///
/// assert_eq!(BasicValue::Int.join(&BasicValue::Int), BasicValue::Int);
/// assert!(BasicValue::Int.join(&BasicValue::Long).is_top());
/// ```
pub trait JoinSemiLattice: Clone + Debug + PartialEq {
    /// Computes the join (least upper bound) of two lattice elements.
    ///
    /// The join represents the least specific value that covers both inputs.
    #[must_use]
    fn join(&self, other: &Self) -> Self;

    /// Returns `true` if this is the top element.
    ///
    /// The top element represents "no information" or "unknown".
    fn is_top(&self) -> bool;
}
