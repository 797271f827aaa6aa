//! Concrete execution of method bodies.
//!
//! The [`Executor`] runs a [`MethodBody`] on concrete values. Calls into the range
//! runtime are handled by [`RangeRuntime`]; any other static call returning `void` is
//! treated as an opaque sink and recorded as an [`Effect`]. Two bodies are
//! observably equivalent when they return the same value and produce the same
//! effects in the same order.

use log::trace;

use crate::{
    assembly::{
        ArithOp, Condition, Constant, Instruction, InvokeKind, LocalKind, MethodBody,
        MethodDescriptor, Type,
    },
    config::RangeConvention,
    emulation::{
        heap::ManagedHeap,
        runtime::{observe, RangeRuntime, RANGES_FACADE},
        EmValue, EmulationError,
    },
    Result,
};

/// Execution budget.
///
/// # Default Values
///
/// | Setting | Default Value |
/// |---------|---------------|
/// | `max_instructions` | 1,000,000 |
/// | `max_heap_objects` | 100,000 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulationLimits {
    /// Maximum instructions to execute
    pub max_instructions: u64,
    /// Maximum number of heap objects
    pub max_heap_objects: usize,
}

impl Default for EmulationLimits {
    fn default() -> Self {
        EmulationLimits {
            max_instructions: 1_000_000,
            max_heap_objects: 100_000,
        }
    }
}

/// A call to an opaque sink method.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// Declaring type of the callee
    pub owner: String,
    /// Callee name
    pub name: String,
    /// Arguments, with boxed primitives unwrapped
    pub args: Vec<EmValue>,
}

/// Outcome of a completed execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Returned value, with a boxed primitive unwrapped
    pub return_value: Option<EmValue>,
    /// Sink calls in execution order
    pub effects: Vec<Effect>,
    /// Instructions executed
    pub instructions: u64,
    /// Final heap
    pub heap: ManagedHeap,
}

impl ExecutionResult {
    /// Returns `true` if both runs are indistinguishable to an observer.
    #[must_use]
    pub fn same_behavior(&self, other: &ExecutionResult) -> bool {
        self.return_value == other.return_value && self.effects == other.effects
    }
}

/// Runs method bodies on concrete values.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    convention: RangeConvention,
    limits: EmulationLimits,
}

impl Executor {
    /// Creates an executor with the default convention and limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the execution budget.
    #[must_use]
    pub fn with_limits(mut self, limits: EmulationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replaces the naming convention used to recognize range types.
    #[must_use]
    pub fn with_convention(mut self, convention: RangeConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Executes `body` with `args` bound to the receiver and parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Emulation`] if execution fails, and
    /// [`crate::Error::Malformed`] for unparsable descriptors or duplicated labels.
    pub fn execute(&self, body: &MethodBody, args: &[EmValue]) -> Result<ExecutionResult> {
        let labels = body.label_table()?;
        let descriptor = MethodDescriptor::parse(body.descriptor())?;
        let expected = descriptor.params.len() + usize::from(!body.is_static());
        if args.len() != expected {
            return Err(EmulationError::ArgumentCount {
                expected,
                found: args.len(),
            }
            .into());
        }

        let runtime = RangeRuntime::new(&self.convention);
        let mut heap = ManagedHeap::new(self.limits.max_heap_objects);
        let mut locals: Vec<Option<EmValue>> = vec![None; usize::from(body.max_locals())];
        for (slot, value) in locals.iter_mut().zip(args) {
            *slot = Some(*value);
        }

        let mut stack: Vec<EmValue> = Vec::new();
        let mut effects = Vec::new();
        let mut pc = 0;
        let mut executed = 0u64;

        let return_value = loop {
            if executed >= self.limits.max_instructions {
                return Err(EmulationError::InstructionLimit(self.limits.max_instructions).into());
            }
            executed += 1;

            let Some(instruction) = body.get(pc) else {
                return Err(EmulationError::FellOffEnd.into());
            };
            pc += 1;

            match instruction {
                Instruction::Nop | Instruction::Label(_) => {}
                Instruction::Const(constant) => stack.push(match constant {
                    Constant::Null => EmValue::Null,
                    Constant::Int(v) => EmValue::Int(*v),
                    Constant::Long(v) => EmValue::Long(*v),
                    Constant::Float(v) => EmValue::Float(*v),
                    Constant::Double(v) => EmValue::Double(*v),
                    Constant::String(s) => {
                        return Err(EmulationError::UnsupportedMethod(format!("ldc \"{s}\"")).into())
                    }
                }),
                Instruction::Load { kind, slot } => {
                    let value = read_local(&locals, *slot)?;
                    check_kind("load", *kind, &value)?;
                    stack.push(value);
                }
                Instruction::Store { kind, slot } => {
                    let value = pop(&mut stack)?;
                    check_kind("store", *kind, &value)?;
                    *local_mut(&mut locals, *slot)? = Some(value);
                }
                Instruction::Increment { slot, delta } => {
                    let value = read_local(&locals, *slot)?.as_int("iinc")?;
                    *local_mut(&mut locals, *slot)? = Some(EmValue::Int(value.wrapping_add(*delta)));
                }
                Instruction::Arith { op, kind } => {
                    let right = pop(&mut stack)?;
                    let left = pop(&mut stack)?;
                    stack.push(arith(*op, *kind, left, right)?);
                }
                Instruction::Pop => {
                    pop(&mut stack)?;
                }
                Instruction::Dup => {
                    let top = *stack.last().ok_or(EmulationError::StackUnderflow)?;
                    stack.push(top);
                }
                Instruction::CheckCast(target) => {
                    let value = *stack.last().ok_or(EmulationError::StackUnderflow)?;
                    if let Some(reference) = value.as_heap_ref("checkcast")? {
                        let object = heap.get(reference)?;
                        if !runtime.is_instance_of(object, target) {
                            return Err(EmulationError::InvalidCast {
                                from_type: object.class().to_string(),
                                to_type: target.clone(),
                            }
                            .into());
                        }
                    }
                }
                Instruction::Invoke {
                    kind,
                    owner,
                    name,
                    descriptor,
                } => {
                    let callee = MethodDescriptor::parse(descriptor)?;
                    let mut args = pop_n(&mut stack, callee.params.len())?;

                    let result = if *kind == InvokeKind::Static {
                        if owner == RANGES_FACADE {
                            Some(runtime.call_static(&mut heap, name, &callee, &args)?)
                        } else if callee.ret == Type::Void {
                            args.iter_mut().for_each(|arg| *arg = observe(&heap, *arg));
                            trace!("effect {owner}.{name}{args:?}");
                            effects.push(Effect {
                                owner: owner.clone(),
                                name: name.clone(),
                                args,
                            });
                            None
                        } else {
                            return Err(EmulationError::UnsupportedMethod(format!(
                                "{owner}.{name}"
                            ))
                            .into());
                        }
                    } else {
                        let receiver = pop(&mut stack)?;
                        runtime.call_instance(&mut heap, owner, name, receiver)?
                    };

                    match (result, &callee.ret) {
                        (_, Type::Void) => {}
                        (Some(value), _) => stack.push(value),
                        (None, _) => {
                            return Err(EmulationError::UnsupportedMethod(format!(
                                "{owner}.{name}"
                            ))
                            .into())
                        }
                    }
                }
                Instruction::Jump { condition, target } => {
                    let taken = match condition {
                        Condition::Always => true,
                        Condition::Zero(cmp) => cmp.holds(pop(&mut stack)?.as_int("if")?, 0),
                        Condition::IntCompare(cmp) => {
                            let right = pop(&mut stack)?.as_int("if_icmp")?;
                            let left = pop(&mut stack)?.as_int("if_icmp")?;
                            cmp.holds(left, right)
                        }
                        Condition::Null => pop(&mut stack)?.as_heap_ref("ifnull")?.is_none(),
                        Condition::NonNull => pop(&mut stack)?.as_heap_ref("ifnonnull")?.is_some(),
                    };
                    if taken {
                        pc = *labels
                            .get(target)
                            .ok_or(EmulationError::UnknownLabel(*target))?;
                    }
                }
                Instruction::Return(kind) => match kind {
                    None => break None,
                    Some(kind) => {
                        let value = pop(&mut stack)?;
                        check_kind("return", *kind, &value)?;
                        break Some(observe(&heap, value));
                    }
                },
            }
        };

        Ok(ExecutionResult {
            return_value,
            effects,
            instructions: executed,
            heap,
        })
    }
}

fn pop(stack: &mut Vec<EmValue>) -> std::result::Result<EmValue, EmulationError> {
    stack.pop().ok_or(EmulationError::StackUnderflow)
}

fn pop_n(stack: &mut Vec<EmValue>, count: usize) -> std::result::Result<Vec<EmValue>, EmulationError> {
    if stack.len() < count {
        return Err(EmulationError::StackUnderflow);
    }
    Ok(stack.split_off(stack.len() - count))
}

fn read_local(locals: &[Option<EmValue>], slot: u16) -> std::result::Result<EmValue, EmulationError> {
    match locals.get(usize::from(slot)) {
        Some(Some(value)) => Ok(*value),
        Some(None) => Err(EmulationError::UninitializedLocal(slot)),
        None => Err(out_of_range(locals, slot)),
    }
}

fn local_mut(
    locals: &mut [Option<EmValue>],
    slot: u16,
) -> std::result::Result<&mut Option<EmValue>, EmulationError> {
    let error = out_of_range(locals, slot);
    locals.get_mut(usize::from(slot)).ok_or(error)
}

fn out_of_range(locals: &[Option<EmValue>], slot: u16) -> EmulationError {
    EmulationError::LocalOutOfRange {
        slot,
        max_locals: u16::try_from(locals.len()).unwrap_or(u16::MAX),
    }
}

fn check_kind(
    operation: &'static str,
    kind: LocalKind,
    value: &EmValue,
) -> std::result::Result<(), EmulationError> {
    if value.kind() == kind {
        Ok(())
    } else {
        Err(EmulationError::TypeMismatch {
            operation,
            expected: value_kind_name(kind),
            found: value.to_string(),
        })
    }
}

fn value_kind_name(kind: LocalKind) -> &'static str {
    match kind {
        LocalKind::Int => "int",
        LocalKind::Long => "long",
        LocalKind::Float => "float",
        LocalKind::Double => "double",
        LocalKind::Reference => "reference",
    }
}

fn arith(
    op: ArithOp,
    kind: LocalKind,
    left: EmValue,
    right: EmValue,
) -> std::result::Result<EmValue, EmulationError> {
    let value = match (kind, left, right) {
        (LocalKind::Int, EmValue::Int(a), EmValue::Int(b)) => EmValue::Int(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
        }),
        (LocalKind::Long, EmValue::Long(a), EmValue::Long(b)) => EmValue::Long(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
        }),
        (LocalKind::Float, EmValue::Float(a), EmValue::Float(b)) => EmValue::Float(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
        }),
        (LocalKind::Double, EmValue::Double(a), EmValue::Double(b)) => EmValue::Double(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
        }),
        (_, left, _) => {
            return Err(EmulationError::TypeMismatch {
                operation: "arith",
                expected: value_kind_name(kind),
                found: left.to_string(),
            })
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assembly::InstructionAssembler, Error};

    fn run(body: &MethodBody, args: &[EmValue]) -> Result<ExecutionResult> {
        Executor::new().execute(body, args)
    }

    #[test]
    fn test_arith_and_return() -> Result<()> {
        let mut asm = InstructionAssembler::new_static("f", "(II)I");
        asm.iload(0).iload(1).imul().iconst(1).iadd().ireturn();
        let result = run(&asm.finish()?, &[EmValue::Int(6), EmValue::Int(7)])?;
        assert_eq!(result.return_value, Some(EmValue::Int(43)));
        assert_eq!(result.instructions, 6);
        Ok(())
    }

    #[test]
    fn test_counting_loop_records_effects() -> Result<()> {
        let mut asm = InstructionAssembler::new_static("f", "()V");
        let head = asm.new_label();
        let exit = asm.new_label();
        asm.iconst(0)
            .istore(0)
            .mark(head)
            .iload(0)
            .iconst(3)
            .if_icmp(crate::assembly::Comparison::Ge, exit)
            .iload(0)
            .invokestatic("demo/Sink", "accept", "(I)V")
            .iinc(0, 1)
            .goto(head)
            .mark(exit)
            .return_void();
        let result = run(&asm.finish()?, &[])?;
        let values: Vec<_> = result.effects.iter().map(|e| e.args[0]).collect();
        assert_eq!(values, vec![EmValue::Int(0), EmValue::Int(1), EmValue::Int(2)]);
        Ok(())
    }

    #[test]
    fn test_failed_cast() -> Result<()> {
        let mut asm = InstructionAssembler::new_static("f", "()V");
        asm.iconst(0)
            .iconst(2)
            .invokestatic(RANGES_FACADE, "until", "(II)Lkotlin/ranges/IntRange;")
            .invokevirtual("kotlin/ranges/IntRange", "iterator", "()Ljava/util/Iterator;")
            .checkcast("kotlin/collections/LongIterator")
            .pop()
            .return_void();
        let err = run(&asm.finish()?, &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Emulation(EmulationError::InvalidCast { ref to_type, .. })
                if to_type == "kotlin/collections/LongIterator"
        ));
        Ok(())
    }

    #[test]
    fn test_instruction_limit() -> Result<()> {
        let mut asm = InstructionAssembler::new_static("spin", "()V");
        let head = asm.new_label();
        asm.mark(head).goto(head);
        let executor = Executor::new().with_limits(EmulationLimits {
            max_instructions: 50,
            ..EmulationLimits::default()
        });
        assert!(matches!(
            executor.execute(&asm.finish()?, &[]),
            Err(Error::Emulation(EmulationError::InstructionLimit(50)))
        ));
        Ok(())
    }

    #[test]
    fn test_argument_count() -> Result<()> {
        let mut asm = InstructionAssembler::new_static("f", "(I)V");
        asm.return_void();
        assert!(matches!(
            run(&asm.finish()?, &[]),
            Err(Error::Emulation(EmulationError::ArgumentCount {
                expected: 1,
                found: 0
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_uninitialized_read() -> Result<()> {
        let mut asm = InstructionAssembler::new_static("f", "()I");
        asm.iload(0).ireturn();
        assert!(matches!(
            run(&asm.finish()?, &[]),
            Err(Error::Emulation(EmulationError::UninitializedLocal(0)))
        ));
        Ok(())
    }
}
