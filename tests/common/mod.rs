//! Loop builders shared by the integration tests.
//!
//! Every builder emits the shape a compiler produces for `for (x in range)` when it
//! goes through `java.util.Iterator`: obtain the range, call `iterator()`, then per
//! element `next()`, store/reload the boxed value, cast, unbox and store.

#![allow(dead_code)]

use rangeopt::{
    assembly::{InstructionAssembler, Label, LocalKind, MethodBody},
    Result,
};

pub const RANGES: &str = "kotlin/ranges/RangesKt";
pub const SINK: &str = "demo/Sink";
pub const ITERATOR: &str = "java/util/Iterator";

/// What kind of range a loop iterates and how its elements are unboxed.
#[derive(Debug, Clone)]
pub struct LoopShape {
    /// Descriptor of one bound, `I`, `J` or `C`
    pub bound: &'static str,
    /// Factory on `RangesKt`
    pub factory: &'static str,
    /// Type returned by the factory
    pub range_type: &'static str,
    /// `(step, progression type)` applied after the factory
    pub step: Option<(i64, &'static str)>,
    /// Cast target of the boxed element
    pub boxed_type: &'static str,
    /// Unboxing accessor
    pub accessor: &'static str,
    /// Accessor descriptor
    pub accessor_descriptor: &'static str,
    /// Category of the element local
    pub element: LocalKind,
}

impl LoopShape {
    /// Int loop with `until`, `rangeTo` or `downTo`.
    pub fn int(factory: &'static str) -> Self {
        LoopShape {
            bound: "I",
            factory,
            range_type: if factory == "downTo" {
                "kotlin/ranges/IntProgression"
            } else {
                "kotlin/ranges/IntRange"
            },
            step: None,
            boxed_type: "java/lang/Number",
            accessor: "intValue",
            accessor_descriptor: "()I",
            element: LocalKind::Int,
        }
    }

    /// Long loop with `until`, `rangeTo` or `downTo`.
    pub fn long(factory: &'static str) -> Self {
        LoopShape {
            bound: "J",
            factory,
            range_type: if factory == "downTo" {
                "kotlin/ranges/LongProgression"
            } else {
                "kotlin/ranges/LongRange"
            },
            step: None,
            boxed_type: "java/lang/Number",
            accessor: "longValue",
            accessor_descriptor: "()J",
            element: LocalKind::Long,
        }
    }

    /// Char loop over `a..b`.
    pub fn char() -> Self {
        LoopShape {
            bound: "C",
            factory: "rangeTo",
            range_type: "kotlin/ranges/CharRange",
            step: None,
            boxed_type: "java/lang/Character",
            accessor: "charValue",
            accessor_descriptor: "()C",
            element: LocalKind::Int,
        }
    }

    /// Unsigned int loop, which has no specialized iterator.
    pub fn uint() -> Self {
        LoopShape {
            bound: "I",
            factory: "rangeTo",
            range_type: "kotlin/ranges/UIntRange",
            step: None,
            boxed_type: "kotlin/UInt",
            accessor: "unbox-impl",
            accessor_descriptor: "()I",
            element: LocalKind::Int,
        }
    }

    /// Applies `step n` to the range before iterating.
    pub fn stepped(mut self, step: i64) -> Self {
        let progression = match self.bound {
            "J" => "kotlin/ranges/LongProgression",
            "C" => "kotlin/ranges/CharProgression",
            _ => "kotlin/ranges/IntProgression",
        };
        self.step = Some((step, progression));
        self
    }

    fn bound_kind(&self) -> LocalKind {
        if self.bound == "J" {
            LocalKind::Long
        } else {
            LocalKind::Int
        }
    }
}

/// Local slots used by one emitted loop.
#[derive(Debug, Clone, Copy)]
pub struct Slots {
    /// Lower and upper bound parameters
    pub bounds: (u16, u16),
    /// Iterator local
    pub iterator: u16,
    /// Boxed element temp
    pub boxed: u16,
    /// Unboxed element local
    pub element: u16,
}

impl Slots {
    /// Bounds in 0 and 1, loop locals from `base`.
    pub fn from(base: u16) -> Self {
        Slots {
            bounds: (0, 1),
            iterator: base,
            boxed: base + 1,
            element: base + 2,
        }
    }
}

pub fn sink_descriptor(kind: LocalKind) -> &'static str {
    match kind {
        LocalKind::Int => "(I)V",
        LocalKind::Long => "(J)V",
        LocalKind::Float => "(F)V",
        LocalKind::Double => "(D)V",
        LocalKind::Reference => "(Ljava/lang/Object;)V",
    }
}

/// Pushes the range of `shape` built from the bound parameters.
pub fn emit_range(asm: &mut InstructionAssembler, shape: &LoopShape, slots: Slots) -> &'static str {
    let b = shape.bound;
    asm.load(shape.bound_kind(), slots.bounds.0)
        .load(shape.bound_kind(), slots.bounds.1)
        .invokestatic(
            RANGES,
            shape.factory,
            &format!("({b}{b})L{};", shape.range_type),
        );

    match shape.step {
        Some((step, progression)) => {
            if shape.bound == "J" {
                asm.lconst(step);
            } else {
                asm.iconst(step as i32);
            }
            let step_descriptor = if shape.bound == "J" { "J" } else { "I" };
            asm.invokestatic(
                RANGES,
                "step",
                &format!("(L{progression};{step_descriptor})L{progression};"),
            );
            progression
        }
        None => shape.range_type,
    }
}

/// Emits the iteration over the iterator held in `slots.iterator`.
pub fn emit_iteration(asm: &mut InstructionAssembler, shape: &LoopShape, slots: Slots) {
    let head = asm.new_label();
    let exit = asm.new_label();
    emit_iteration_with_labels(asm, shape, slots, head, exit);
}

fn emit_iteration_with_labels(
    asm: &mut InstructionAssembler,
    shape: &LoopShape,
    slots: Slots,
    head: Label,
    exit: Label,
) {
    asm.mark(head)
        .aload(slots.iterator)
        .invokeinterface(ITERATOR, "hasNext", "()Z")
        .ifeq(exit)
        .aload(slots.iterator)
        .invokeinterface(ITERATOR, "next", "()Ljava/lang/Object;")
        .astore(slots.boxed)
        .aload(slots.boxed)
        .checkcast(shape.boxed_type)
        .invokevirtual(shape.boxed_type, shape.accessor, shape.accessor_descriptor)
        .store(shape.element, slots.element)
        .load(shape.element, slots.element)
        .invokestatic(SINK, "accept", sink_descriptor(shape.element))
        .goto(head)
        .mark(exit);
}

/// Emits a complete loop: range, iterator, iteration.
pub fn emit_loop(asm: &mut InstructionAssembler, shape: &LoopShape, slots: Slots) {
    let range_type = emit_range(asm, shape, slots);
    asm.invokevirtual(range_type, "iterator", "()Ljava/util/Iterator;")
        .astore(slots.iterator);
    emit_iteration(asm, shape, slots);
}

/// Static `run` with one loop per shape, in sequence.
///
/// Each distinct bound descriptor gets its own `(from, to)` parameter pair, in order
/// of first appearance, so `[int, long]` yields `(IIJJ)V`. Loops of a single kind
/// take `(a, b)` in slots 0 and 1.
pub fn method_with_loops(shapes: &[LoopShape]) -> Result<MethodBody> {
    let mut bounds: Vec<&'static str> = Vec::new();
    for shape in shapes {
        if !bounds.contains(&shape.bound) {
            bounds.push(shape.bound);
        }
    }
    if bounds.is_empty() {
        bounds.push("I");
    }

    let params: String = bounds.iter().map(|b| format!("{b}{b}")).collect();
    let mut asm = InstructionAssembler::new_static("run", &format!("({params})V"));
    let first_local = 2 * bounds.len();
    for (i, shape) in shapes.iter().enumerate() {
        let pair = bounds
            .iter()
            .position(|b| *b == shape.bound)
            .expect("bound registered above");
        let base = u16::try_from(first_local + 3 * i).expect("few loops");
        let from = u16::try_from(2 * pair).expect("few kinds");
        let slots = Slots {
            bounds: (from, from + 1),
            ..Slots::from(base)
        };
        emit_loop(&mut asm, shape, slots);
    }
    asm.return_void();
    asm.finish()
}

/// Static `run(a, b)` with a single loop.
pub fn single_loop(shape: &LoopShape) -> Result<MethodBody> {
    method_with_loops(std::slice::from_ref(shape))
}

/// Static `runList(list)` iterating a `java/util/List` with the same element fetch.
pub fn list_loop() -> Result<MethodBody> {
    let mut asm = InstructionAssembler::new_static("runList", "(Ljava/util/List;)V");
    asm.aload(0)
        .invokeinterface("java/util/List", "iterator", "()Ljava/util/Iterator;")
        .astore(1);
    emit_iteration(
        &mut asm,
        &LoopShape::int("until"),
        Slots {
            bounds: (0, 0),
            iterator: 1,
            boxed: 2,
            element: 3,
        },
    );
    asm.return_void();
    asm.finish()
}

/// Counts instructions calling a method named `name`.
pub fn calls_named(body: &MethodBody, name: &str) -> usize {
    body.instructions()
        .iter()
        .filter(|i| matches!(i, rangeopt::assembly::Instruction::Invoke { name: n, .. } if n == name))
        .count()
}
