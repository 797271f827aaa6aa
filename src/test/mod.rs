//! Method bodies shared by the unit tests.
//!
//! The loops here have the exact shape a compiler emits for `for (x in range)` when
//! it goes through the generic iterator protocol. [`RangeLoop`] exposes the parts of
//! the element fetch that tests perturb to check what disqualifies a match.

use crate::{
    assembly::{InstructionAssembler, LocalKind, MethodBody},
    Result,
};

/// Declaring type of the range factory functions.
pub const RANGES: &str = "kotlin/ranges/RangesKt";

/// Range over ints.
pub const INT_RANGE: &str = "kotlin/ranges/IntRange";

/// Range over longs.
pub const LONG_RANGE: &str = "kotlin/ranges/LongRange";

/// Owner of the static `accept` call every loop body makes.
pub const SINK_OWNER: &str = "demo/Sink";

const ITERATOR: &str = "java/util/Iterator";

/// Shape of a boxing range loop.
#[derive(Debug, Clone)]
pub struct RangeLoop {
    /// Category of the two bound parameters
    pub bound: LocalKind,
    /// Descriptor of one bound parameter, e.g. `I`
    pub bound_descriptor: &'static str,
    /// Factory function on [`RANGES`], e.g. `until`
    pub factory: &'static str,
    /// Type the factory returns
    pub range_type: &'static str,
    /// Cast target of the boxed element
    pub boxed_type: &'static str,
    /// Unboxing accessor name
    pub accessor: &'static str,
    /// Unboxing accessor descriptor
    pub accessor_descriptor: &'static str,
    /// Category of the element store
    pub store: LocalKind,
    /// Slot reloaded before the cast, `None` for the boxed temp
    pub reload_slot: Option<u16>,
}

impl RangeLoop {
    /// `for (i in a <factory> b)` over ints.
    pub fn ints(factory: &'static str) -> Self {
        RangeLoop {
            bound: LocalKind::Int,
            bound_descriptor: "I",
            factory,
            range_type: if factory == "downTo" {
                "kotlin/ranges/IntProgression"
            } else {
                INT_RANGE
            },
            boxed_type: "java/lang/Number",
            accessor: "intValue",
            accessor_descriptor: "()I",
            store: LocalKind::Int,
            reload_slot: None,
        }
    }

    /// `for (i in a..b)` over longs.
    pub fn longs() -> Self {
        RangeLoop {
            bound: LocalKind::Long,
            bound_descriptor: "J",
            factory: "rangeTo",
            range_type: LONG_RANGE,
            boxed_type: "java/lang/Number",
            accessor: "longValue",
            accessor_descriptor: "()J",
            store: LocalKind::Long,
            reload_slot: None,
        }
    }
}

fn sink_descriptor(kind: LocalKind) -> &'static str {
    match kind {
        LocalKind::Int => "(I)V",
        LocalKind::Long => "(J)V",
        LocalKind::Float => "(F)V",
        LocalKind::Double => "(D)V",
        LocalKind::Reference => "(Ljava/lang/Object;)V",
    }
}

/// Static `run(a, b)` iterating the range built from its two parameters.
///
/// Slots: 0 and 1 bounds, 2 iterator, 3 boxed element, 4 element.
pub fn boxing_range_loop(shape: &RangeLoop) -> Result<MethodBody> {
    let b = shape.bound_descriptor;
    let mut asm = InstructionAssembler::new_static("run", &format!("({b}{b})V"));
    let head = asm.new_label();
    let exit = asm.new_label();

    asm.load(shape.bound, 0)
        .load(shape.bound, 1)
        .invokestatic(
            RANGES,
            shape.factory,
            &format!("({b}{b})L{};", shape.range_type),
        )
        .invokevirtual(shape.range_type, "iterator", "()Ljava/util/Iterator;")
        .astore(2)
        .mark(head)
        .aload(2)
        .invokeinterface(ITERATOR, "hasNext", "()Z")
        .ifeq(exit)
        .aload(2)
        .invokeinterface(ITERATOR, "next", "()Ljava/lang/Object;")
        .astore(3)
        .aload(shape.reload_slot.unwrap_or(3))
        .checkcast(shape.boxed_type)
        .invokevirtual(shape.boxed_type, shape.accessor, shape.accessor_descriptor)
        .store(shape.store, 4)
        .load(shape.store, 4)
        .invokestatic(SINK_OWNER, "accept", sink_descriptor(shape.store))
        .goto(head)
        .mark(exit)
        .return_void();

    asm.finish()
}

/// Static `run(list)` iterating a `java/util/List` of numbers with the same shape.
pub fn list_loop() -> Result<MethodBody> {
    let mut asm = InstructionAssembler::new_static("runList", "(Ljava/util/List;)V");
    let head = asm.new_label();
    let exit = asm.new_label();

    asm.aload(0)
        .invokeinterface("java/util/List", "iterator", "()Ljava/util/Iterator;")
        .astore(1)
        .mark(head)
        .aload(1)
        .invokeinterface(ITERATOR, "hasNext", "()Z")
        .ifeq(exit)
        .aload(1)
        .invokeinterface(ITERATOR, "next", "()Ljava/lang/Object;")
        .astore(2)
        .aload(2)
        .checkcast("java/lang/Number")
        .invokevirtual("java/lang/Number", "intValue", "()I")
        .istore(3)
        .iload(3)
        .invokestatic(SINK_OWNER, "accept", "(I)V")
        .goto(head)
        .mark(exit)
        .return_void();

    asm.finish()
}
