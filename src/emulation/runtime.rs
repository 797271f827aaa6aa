//! Intrinsic implementations of the range runtime library.
//!
//! Only the calls a compiled range loop makes are modelled:
//!
//! | Call | Effect |
//! |------|--------|
//! | `RangesKt.rangeTo(a, b)` | `a..b`, step 1 |
//! | `RangesKt.until(a, b)` | `a..b-1`, step 1 |
//! | `RangesKt.downTo(a, b)` | `a` down to `b`, step -1 |
//! | `RangesKt.step(p, n)` | `p` with step `n` (sign kept) |
//! | `iterator()` | fresh iterator over a progression |
//! | `hasNext()`, `next()` | generic protocol, `next()` boxes |
//! | `nextInt()`, `nextLong()`, ... | specialized protocol, no boxing |
//! | `intValue()`, `charValue()`, ... | unboxing accessors |
//!
//! The element kind of a new progression is read from the declared return type of
//! the factory, so `(II)Lkotlin/ranges/IntRange;` creates an `Int` range.

use log::trace;

use crate::{
    assembly::{MethodDescriptor, Type},
    config::{ElementKind, RangeConvention},
    emulation::{
        heap::{HeapObject, ManagedHeap},
        EmValue, EmulationError, HeapRef,
    },
};

/// Declaring type of the range factory functions.
pub const RANGES_FACADE: &str = "kotlin/ranges/RangesKt";

/// Range runtime bound to a naming convention.
#[derive(Debug, Clone, Copy)]
pub struct RangeRuntime<'a> {
    convention: &'a RangeConvention,
}

impl<'a> RangeRuntime<'a> {
    /// Creates a runtime for `convention`.
    #[must_use]
    pub fn new(convention: &'a RangeConvention) -> Self {
        RangeRuntime { convention }
    }

    /// Runs a static call on [`RANGES_FACADE`].
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::UnsupportedMethod`] for unknown functions and
    /// [`EmulationError::InvalidStep`] for a non-positive step.
    pub fn call_static(
        &self,
        heap: &mut ManagedHeap,
        name: &str,
        descriptor: &MethodDescriptor,
        args: &[EmValue],
    ) -> Result<EmValue, EmulationError> {
        let unsupported = || EmulationError::UnsupportedMethod(format!("{RANGES_FACADE}.{name}"));

        let Type::Object(class) = &descriptor.ret else {
            return Err(unsupported());
        };
        let kind = self
            .convention
            .range_element_kind(class)
            .ok_or_else(unsupported)?;

        let object = match (name, args) {
            ("step", [progression, amount]) => {
                let step = element(kind, amount)?;
                self.stepped(heap, class, kind, *progression, step)?
            }
            (_, [from, to]) => {
                let from = element(kind, from)?;
                let to = element(kind, to)?;
                let (first, last, step) = match name {
                    "rangeTo" => (from, to, 1),
                    "until" => match to.checked_sub(1) {
                        Some(last) => (from, last, 1),
                        None => (1, 0, 1),
                    },
                    "downTo" => (from, to, -1),
                    _ => return Err(unsupported()),
                };
                HeapObject::Progression {
                    class: class.clone(),
                    kind,
                    first,
                    last,
                    step,
                }
            }
            _ => return Err(unsupported()),
        };

        trace!("{RANGES_FACADE}.{name} -> {object}");
        Ok(EmValue::Ref(heap.alloc(object)?))
    }

    fn stepped(
        &self,
        heap: &ManagedHeap,
        class: &str,
        kind: ElementKind,
        progression: EmValue,
        step: i64,
    ) -> Result<HeapObject, EmulationError> {
        if step <= 0 {
            return Err(EmulationError::InvalidStep(step));
        }
        let reference = progression
            .as_heap_ref("step")?
            .ok_or(EmulationError::NullReference)?;
        let object = heap.get(reference)?;
        let HeapObject::Progression {
            first,
            last,
            step: old_step,
            ..
        } = object
        else {
            return Err(EmulationError::TypeMismatch {
                operation: "step",
                expected: "progression",
                found: object.class().to_string(),
            });
        };

        let step = if *old_step > 0 { step } else { -step };
        Ok(HeapObject::Progression {
            class: class.to_string(),
            kind,
            first: *first,
            last: progression_last(*first, *last, step),
            step,
        })
    }

    /// Runs a dynamically dispatched call on a runtime object.
    ///
    /// Returns `None` for methods returning nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::NullReference`] for a `null` receiver,
    /// [`EmulationError::NoSuchElement`] for `next` past the end, and
    /// [`EmulationError::UnsupportedMethod`] for anything not modelled.
    pub fn call_instance(
        &self,
        heap: &mut ManagedHeap,
        owner: &str,
        name: &str,
        receiver: EmValue,
    ) -> Result<Option<EmValue>, EmulationError> {
        let reference = receiver
            .as_heap_ref("invoke")?
            .ok_or(EmulationError::NullReference)?;
        let unsupported = || EmulationError::UnsupportedMethod(format!("{owner}.{name}"));

        match heap.get(reference)?.clone() {
            HeapObject::Progression {
                kind,
                first,
                last,
                step,
                ..
            } if name == self.convention.iterator_method => {
                let iterator = HeapObject::Iterator {
                    class: format!("{}{kind}ProgressionIterator", self.convention.range_package),
                    kind,
                    next: first,
                    last,
                    step,
                    has_next: if step > 0 { first <= last } else { first >= last },
                };
                Ok(Some(EmValue::Ref(heap.alloc(iterator)?)))
            }
            HeapObject::Iterator { has_next, .. } if name == "hasNext" => {
                Ok(Some(EmValue::Int(i32::from(has_next))))
            }
            HeapObject::Iterator { kind, .. } if name == self.convention.next_method => {
                let value = advance(heap, reference)?;
                let boxed = heap.alloc(HeapObject::Boxed { kind, value })?;
                Ok(Some(EmValue::Ref(boxed)))
            }
            HeapObject::Iterator { kind, .. } if self.is_specialized_next(kind, name) => {
                let value = advance(heap, reference)?;
                Ok(Some(unboxed(kind, value)))
            }
            HeapObject::Boxed { kind, value } => {
                unbox_accessor(kind, value, name).map(Some).ok_or_else(unsupported)
            }
            _ => Err(unsupported()),
        }
    }

    fn is_specialized_next(&self, kind: ElementKind, name: &str) -> bool {
        self.convention
            .entry(kind)
            .and_then(|entry| entry.iterator.as_ref())
            .is_some_and(|iterator| iterator.next_method == name)
    }

    /// Returns `true` if `object` may be cast to `target`.
    #[must_use]
    pub fn is_instance_of(&self, object: &HeapObject, target: &str) -> bool {
        if target == "java/lang/Object" || object.class() == target {
            return true;
        }
        match object {
            HeapObject::Progression { kind, .. } => {
                target == "java/lang/Iterable"
                    || target == format!("{}{kind}Progression", self.convention.range_package)
            }
            HeapObject::Iterator { kind, .. } => {
                target == "java/util/Iterator"
                    || self
                        .convention
                        .entry(*kind)
                        .and_then(|entry| entry.iterator.as_ref())
                        .is_some_and(|iterator| iterator.type_name == target)
            }
            HeapObject::Boxed { kind, .. } => {
                target == "java/lang/Comparable"
                    || self
                        .convention
                        .entry(*kind)
                        .is_some_and(|entry| entry.boxed_type == target)
            }
        }
    }
}

fn advance(heap: &mut ManagedHeap, reference: HeapRef) -> Result<i64, EmulationError> {
    let HeapObject::Iterator {
        next,
        last,
        step,
        has_next,
        ..
    } = heap.get_mut(reference)?
    else {
        return Err(EmulationError::NoSuchElement);
    };
    if !*has_next {
        return Err(EmulationError::NoSuchElement);
    }
    let value = *next;
    if value == *last {
        *has_next = false;
    } else {
        *next += *step;
    }
    Ok(value)
}

/// Reads a bound or step argument of the given element kind, widened to `i64`.
fn element(kind: ElementKind, value: &EmValue) -> Result<i64, EmulationError> {
    match kind {
        ElementKind::Long | ElementKind::ULong => value.as_long("range bound"),
        _ => value.as_int("range bound").map(i64::from),
    }
}

/// Stack representation of an unboxed element.
fn unboxed(kind: ElementKind, value: i64) -> EmValue {
    match kind {
        ElementKind::Long | ElementKind::ULong => EmValue::Long(value),
        ElementKind::Float => EmValue::Float(value as f32),
        ElementKind::Double => EmValue::Double(value as f64),
        ElementKind::Char => EmValue::Int(i32::from(value as u16)),
        _ => EmValue::Int(value as i32),
    }
}

fn unbox_accessor(kind: ElementKind, value: i64, name: &str) -> Option<EmValue> {
    if kind == ElementKind::Char {
        return (name == "charValue").then(|| unboxed(kind, value));
    }
    match name {
        "intValue" => Some(EmValue::Int(value as i32)),
        "longValue" => Some(EmValue::Long(value)),
        "shortValue" => Some(EmValue::Int(i32::from(value as i16))),
        "byteValue" => Some(EmValue::Int(i32::from(value as i8))),
        "floatValue" => Some(EmValue::Float(value as f32)),
        "doubleValue" => Some(EmValue::Double(value as f64)),
        _ => None,
    }
}

/// Unwraps boxed primitives so values from boxing and non-boxing runs compare equal.
pub(crate) fn observe(heap: &ManagedHeap, value: EmValue) -> EmValue {
    match value {
        EmValue::Ref(reference) => match heap.get(reference) {
            Ok(HeapObject::Boxed { kind, value }) => unboxed(*kind, *value),
            _ => value,
        },
        other => other,
    }
}

/// Last element of the progression from `first` towards `end` with `step`.
fn progression_last(first: i64, end: i64, step: i64) -> i64 {
    if step > 0 {
        if first >= end {
            end
        } else {
            end - difference_mod(end, first, step)
        }
    } else if first <= end {
        end
    } else {
        end + difference_mod(first, end, -step)
    }
}

fn difference_mod(a: i64, b: i64, modulus: i64) -> i64 {
    (a.rem_euclid(modulus) - b.rem_euclid(modulus)).rem_euclid(modulus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::heap::box_class;

    fn ints(
        runtime: &RangeRuntime<'_>,
        heap: &mut ManagedHeap,
        name: &str,
        from: i32,
        to: i32,
    ) -> EmValue {
        let descriptor = MethodDescriptor::parse("(II)Lkotlin/ranges/IntRange;").unwrap();
        runtime
            .call_static(heap, name, &descriptor, &[EmValue::Int(from), EmValue::Int(to)])
            .unwrap()
    }

    fn drain(runtime: &RangeRuntime<'_>, heap: &mut ManagedHeap, range: EmValue) -> Vec<EmValue> {
        let iterator = runtime
            .call_instance(heap, "kotlin/ranges/IntRange", "iterator", range)
            .unwrap()
            .unwrap();
        let mut out = Vec::new();
        while runtime
            .call_instance(heap, "java/util/Iterator", "hasNext", iterator)
            .unwrap()
            == Some(EmValue::Int(1))
        {
            out.push(
                runtime
                    .call_instance(heap, "kotlin/collections/IntIterator", "nextInt", iterator)
                    .unwrap()
                    .unwrap(),
            );
        }
        out
    }

    #[test]
    fn test_factories() {
        let convention = RangeConvention::default();
        let runtime = RangeRuntime::new(&convention);
        let mut heap = ManagedHeap::new(64);

        let until = ints(&runtime, &mut heap, "until", 0, 3);
        assert_eq!(
            drain(&runtime, &mut heap, until),
            vec![EmValue::Int(0), EmValue::Int(1), EmValue::Int(2)]
        );

        let down = ints(&runtime, &mut heap, "downTo", 2, 0);
        assert_eq!(
            drain(&runtime, &mut heap, down),
            vec![EmValue::Int(2), EmValue::Int(1), EmValue::Int(0)]
        );

        let empty = ints(&runtime, &mut heap, "rangeTo", 5, 4);
        assert!(drain(&runtime, &mut heap, empty).is_empty());
    }

    #[test]
    fn test_step_adjusts_last() {
        assert_eq!(progression_last(0, 10, 3), 9);
        assert_eq!(progression_last(10, 0, -4), 2);
        assert_eq!(progression_last(5, 5, 2), 5);

        let convention = RangeConvention::default();
        let runtime = RangeRuntime::new(&convention);
        let mut heap = ManagedHeap::new(64);
        let range = ints(&runtime, &mut heap, "rangeTo", 1, 8);
        let descriptor =
            MethodDescriptor::parse("(Lkotlin/ranges/IntProgression;I)Lkotlin/ranges/IntProgression;")
                .unwrap();
        let stepped = runtime
            .call_static(&mut heap, "step", &descriptor, &[range, EmValue::Int(3)])
            .unwrap();
        assert_eq!(
            drain(&runtime, &mut heap, stepped),
            vec![EmValue::Int(1), EmValue::Int(4), EmValue::Int(7)]
        );

        assert_eq!(
            runtime.call_static(&mut heap, "step", &descriptor, &[range, EmValue::Int(0)]),
            Err(EmulationError::InvalidStep(0))
        );
    }

    #[test]
    fn test_primitive_receiver_is_rejected() {
        let convention = RangeConvention::default();
        let runtime = RangeRuntime::new(&convention);
        let mut heap = ManagedHeap::new(64);

        let result = runtime.call_instance(
            &mut heap,
            "kotlin/ranges/IntRange",
            "iterator",
            EmValue::Int(1),
        );
        assert!(matches!(
            result,
            Err(EmulationError::TypeMismatch {
                operation: "invoke",
                expected: "reference",
                ..
            })
        ));

        let method = String::from("nextInt");
        assert_eq!(
            runtime.call_instance(&mut heap, "kotlin/collections/IntIterator", &method, EmValue::Null),
            Err(EmulationError::NullReference)
        );
    }

    #[test]
    fn test_generic_next_boxes() {
        let convention = RangeConvention::default();
        let runtime = RangeRuntime::new(&convention);
        let mut heap = ManagedHeap::new(64);
        let range = ints(&runtime, &mut heap, "rangeTo", 7, 7);
        let iterator = runtime
            .call_instance(&mut heap, "kotlin/ranges/IntRange", "iterator", range)
            .unwrap()
            .unwrap();

        let boxed = runtime
            .call_instance(&mut heap, "java/util/Iterator", "next", iterator)
            .unwrap()
            .unwrap();
        assert_eq!(heap.boxed_count(), 1);
        assert_eq!(observe(&heap, boxed), EmValue::Int(7));
        assert_eq!(
            runtime.call_instance(&mut heap, "java/lang/Number", "intValue", boxed),
            Ok(Some(EmValue::Int(7)))
        );
        assert_eq!(
            runtime.call_instance(&mut heap, "java/util/Iterator", "next", iterator),
            Err(EmulationError::NoSuchElement)
        );
    }

    #[test]
    fn test_instance_of() {
        let convention = RangeConvention::default();
        let runtime = RangeRuntime::new(&convention);
        let iterator = HeapObject::Iterator {
            class: "kotlin/ranges/IntProgressionIterator".to_string(),
            kind: ElementKind::Int,
            next: 0,
            last: 0,
            step: 1,
            has_next: true,
        };
        assert!(runtime.is_instance_of(&iterator, "kotlin/collections/IntIterator"));
        assert!(runtime.is_instance_of(&iterator, "java/util/Iterator"));
        assert!(!runtime.is_instance_of(&iterator, "kotlin/collections/LongIterator"));

        let boxed = HeapObject::Boxed {
            kind: ElementKind::Char,
            value: 97,
        };
        assert!(runtime.is_instance_of(&boxed, "java/lang/Character"));
        assert!(!runtime.is_instance_of(&boxed, "java/lang/Number"));
        assert_eq!(box_class(ElementKind::Long), "java/lang/Long");
    }
}
