//! Object storage for the executor.
//!
//! The heap only knows the handful of object shapes range iteration produces.
//! There is no garbage collection; a [`HeapRef`] stays valid for the lifetime of
//! the heap, and the allocation count doubles as a measure of boxing.

use std::fmt;

use crate::{
    config::ElementKind,
    emulation::{EmulationError, HeapRef},
};

/// An object allocated during execution.
///
/// Element values are kept widened to `i64`; chars are stored as their code unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapObject {
    /// A range or progression, e.g. `kotlin/ranges/IntRange`
    Progression {
        /// Runtime class
        class: String,
        /// Element kind
        kind: ElementKind,
        /// First element
        first: i64,
        /// Last element reached by `step`, inclusive
        last: i64,
        /// Non-zero step
        step: i64,
    },
    /// An iterator over a progression
    Iterator {
        /// Runtime class
        class: String,
        /// Element kind
        kind: ElementKind,
        /// Element returned by the next call
        next: i64,
        /// Last element, inclusive
        last: i64,
        /// Non-zero step
        step: i64,
        /// Whether another element is available
        has_next: bool,
    },
    /// A boxed primitive such as `java/lang/Integer`
    Boxed {
        /// Element kind
        kind: ElementKind,
        /// The primitive value
        value: i64,
    },
}

impl HeapObject {
    /// Returns the runtime class of the object.
    #[must_use]
    pub fn class(&self) -> &str {
        match self {
            HeapObject::Progression { class, .. } | HeapObject::Iterator { class, .. } => class,
            HeapObject::Boxed { kind, .. } => box_class(*kind),
        }
    }
}

/// Runtime class of a boxed element.
#[must_use]
pub fn box_class(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Byte => "java/lang/Byte",
        ElementKind::Short => "java/lang/Short",
        ElementKind::Int => "java/lang/Integer",
        ElementKind::Long => "java/lang/Long",
        ElementKind::UInt => "kotlin/UInt",
        ElementKind::ULong => "kotlin/ULong",
        ElementKind::Float => "java/lang/Float",
        ElementKind::Double => "java/lang/Double",
        ElementKind::Char => "java/lang/Character",
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapObject::Progression {
                class,
                first,
                last,
                step,
                ..
            } => write!(f, "{class}({first}..{last} step {step})"),
            HeapObject::Iterator {
                class,
                next,
                has_next,
                ..
            } => write!(f, "{class}(next = {next}, has_next = {has_next})"),
            HeapObject::Boxed { kind, value } => write!(f, "{}({value})", box_class(*kind)),
        }
    }
}

/// Append-only object store with an allocation limit.
#[derive(Debug, Clone)]
pub struct ManagedHeap {
    objects: Vec<HeapObject>,
    max_objects: usize,
}

impl ManagedHeap {
    /// Creates an empty heap that holds at most `max_objects` objects.
    #[must_use]
    pub fn new(max_objects: usize) -> Self {
        ManagedHeap {
            objects: Vec::new(),
            max_objects,
        }
    }

    /// Stores `object` and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::HeapLimitExceeded`] when the heap is full.
    pub fn alloc(&mut self, object: HeapObject) -> Result<HeapRef, EmulationError> {
        if self.objects.len() >= self.max_objects {
            return Err(EmulationError::HeapLimitExceeded(self.max_objects));
        }
        let Ok(id) = u32::try_from(self.objects.len()) else {
            return Err(EmulationError::HeapLimitExceeded(self.max_objects));
        };
        self.objects.push(object);
        Ok(HeapRef(id))
    }

    /// Returns the object behind `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::InvalidHeapReference`] for a foreign handle.
    pub fn get(&self, reference: HeapRef) -> Result<&HeapObject, EmulationError> {
        self.objects
            .get(reference.0 as usize)
            .ok_or(EmulationError::InvalidHeapReference(reference.0))
    }

    /// Mutable variant of [`Self::get`].
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::InvalidHeapReference`] for a foreign handle.
    pub fn get_mut(&mut self, reference: HeapRef) -> Result<&mut HeapObject, EmulationError> {
        self.objects
            .get_mut(reference.0 as usize)
            .ok_or(EmulationError::InvalidHeapReference(reference.0))
    }

    /// Number of objects allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Counts the boxed primitives on the heap.
    #[must_use]
    pub fn boxed_count(&self) -> usize {
        self.objects
            .iter()
            .filter(|object| matches!(object, HeapObject::Boxed { .. }))
            .count()
    }
}
