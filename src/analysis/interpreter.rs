//! Abstract interpreters: the per-instruction semantics plugged into the analyzer.
//!
//! The [`Analyzer`](crate::analysis::Analyzer) owns control flow and stack
//! bookkeeping; an [`Interpreter`] decides which abstract value each instruction
//! produces and whether its inputs are acceptable. Operations are grouped by the
//! number of stack inputs, so an interpreter only has to reason about values:
//!
//! | Operation | Instructions |
//! |-----------|--------------|
//! | `new_operation` | constants |
//! | `copy_operation` | loads, stores, `dup` |
//! | `unary_operation` | `checkcast`, `iinc`, one-operand jumps, value returns |
//! | `binary_operation` | arithmetic, two-operand jumps |
//! | `nary_operation` | calls (receiver first, then arguments) |
//!
//! [`BasicInterpreter`] is the baseline: it tracks type category and nullability
//! and rejects code that reads unassigned locals or mixes categories.

use std::fmt::Debug;

use crate::{
    analysis::{AnalysisError, BasicValue, JoinSemiLattice},
    assembly::{Condition, Constant, Instruction, LocalKind, MethodDescriptor, Type},
};

/// Result type of interpreter operations.
pub type InterpretResult<T> = std::result::Result<T, AnalysisError>;

/// Per-instruction abstract semantics.
pub trait Interpreter {
    /// The abstract value kept in every local and stack slot.
    type Value: Clone + PartialEq + Debug;

    /// Value for an entry slot: `None` for an unassigned local, otherwise the
    /// declared type of a parameter or receiver.
    fn new_value(&self, ty: Option<&Type>) -> Self::Value;

    /// Value produced by an instruction with no stack inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the instruction is not a constant.
    fn new_operation(&self, instruction: &Instruction) -> InterpretResult<Self::Value>;

    /// Value produced by moving `value` between a local and the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` does not fit the instruction's slot kind.
    fn copy_operation(
        &self,
        instruction: &Instruction,
        value: &Self::Value,
    ) -> InterpretResult<Self::Value>;

    /// Value produced by a one-input instruction, `None` if it produces nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is not acceptable to the instruction.
    fn unary_operation(
        &self,
        instruction: &Instruction,
        value: &Self::Value,
    ) -> InterpretResult<Option<Self::Value>>;

    /// Value produced by a two-input instruction, `None` if it produces nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if either input is not acceptable.
    fn binary_operation(
        &self,
        instruction: &Instruction,
        left: &Self::Value,
        right: &Self::Value,
    ) -> InterpretResult<Option<Self::Value>>;

    /// Value produced by a call, `None` for void calls.
    ///
    /// `values` holds the receiver (for non-static calls) followed by the arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs do not match the call descriptor.
    fn nary_operation(
        &self,
        instruction: &Instruction,
        values: &[Self::Value],
    ) -> InterpretResult<Option<Self::Value>>;

    /// Joins two values reaching the same slot.
    fn merge(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;
}

/// The baseline verifying interpreter over [`BasicValue`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicInterpreter;

impl BasicInterpreter {
    /// Creates the baseline interpreter.
    #[must_use]
    pub fn new() -> Self {
        BasicInterpreter
    }

    fn expect_kind(value: &BasicValue, expected: LocalKind) -> InterpretResult<()> {
        if value.local_kind() == Some(expected) {
            Ok(())
        } else {
            Err(AnalysisError::IncompatibleValue {
                expected,
                found: value.to_string(),
            })
        }
    }

    fn unexpected(instruction: &Instruction) -> AnalysisError {
        AnalysisError::UnexpectedInstruction(instruction.to_string())
    }
}

impl Interpreter for BasicInterpreter {
    type Value = BasicValue;

    fn new_value(&self, ty: Option<&Type>) -> BasicValue {
        ty.and_then(BasicValue::of_type)
            .unwrap_or(BasicValue::Uninitialized)
    }

    fn new_operation(&self, instruction: &Instruction) -> InterpretResult<BasicValue> {
        match instruction {
            Instruction::Const(constant) => Ok(match constant {
                Constant::Null => BasicValue::Null,
                Constant::Int(_) => BasicValue::Int,
                Constant::Long(_) => BasicValue::Long,
                Constant::Float(_) => BasicValue::Float,
                Constant::Double(_) => BasicValue::Double,
                Constant::String(_) => BasicValue::Reference(Type::object("java/lang/String")),
            }),
            _ => Err(Self::unexpected(instruction)),
        }
    }

    fn copy_operation(
        &self,
        instruction: &Instruction,
        value: &BasicValue,
    ) -> InterpretResult<BasicValue> {
        match instruction {
            Instruction::Load { kind, slot } => {
                if value.is_top() {
                    return Err(AnalysisError::UninitializedLocal(*slot));
                }
                Self::expect_kind(value, *kind)?;
            }
            Instruction::Store { kind, .. } => Self::expect_kind(value, *kind)?,
            Instruction::Dup => {
                if value.is_top() {
                    return Err(Self::unexpected(instruction));
                }
            }
            _ => return Err(Self::unexpected(instruction)),
        }
        Ok(value.clone())
    }

    fn unary_operation(
        &self,
        instruction: &Instruction,
        value: &BasicValue,
    ) -> InterpretResult<Option<BasicValue>> {
        match instruction {
            Instruction::CheckCast(type_name) => {
                Self::expect_kind(value, LocalKind::Reference)?;
                if *value == BasicValue::Null {
                    Ok(Some(BasicValue::Null))
                } else {
                    Ok(Some(BasicValue::Reference(Type::object(type_name))))
                }
            }
            Instruction::Increment { slot, .. } => {
                if value.is_top() {
                    return Err(AnalysisError::UninitializedLocal(*slot));
                }
                Self::expect_kind(value, LocalKind::Int)?;
                Ok(Some(BasicValue::Int))
            }
            Instruction::Jump { condition, .. } => {
                match condition {
                    Condition::Zero(_) => Self::expect_kind(value, LocalKind::Int)?,
                    Condition::Null | Condition::NonNull => {
                        Self::expect_kind(value, LocalKind::Reference)?;
                    }
                    Condition::Always | Condition::IntCompare(_) => {
                        return Err(Self::unexpected(instruction))
                    }
                }
                Ok(None)
            }
            Instruction::Return(Some(kind)) => {
                Self::expect_kind(value, *kind)?;
                Ok(None)
            }
            _ => Err(Self::unexpected(instruction)),
        }
    }

    fn binary_operation(
        &self,
        instruction: &Instruction,
        left: &BasicValue,
        right: &BasicValue,
    ) -> InterpretResult<Option<BasicValue>> {
        match instruction {
            Instruction::Arith { kind, .. } => {
                if *kind == LocalKind::Reference {
                    return Err(Self::unexpected(instruction));
                }
                Self::expect_kind(left, *kind)?;
                Self::expect_kind(right, *kind)?;
                let result = match kind {
                    LocalKind::Long => BasicValue::Long,
                    LocalKind::Float => BasicValue::Float,
                    LocalKind::Double => BasicValue::Double,
                    _ => BasicValue::Int,
                };
                Ok(Some(result))
            }
            Instruction::Jump {
                condition: Condition::IntCompare(_),
                ..
            } => {
                Self::expect_kind(left, LocalKind::Int)?;
                Self::expect_kind(right, LocalKind::Int)?;
                Ok(None)
            }
            _ => Err(Self::unexpected(instruction)),
        }
    }

    fn nary_operation(
        &self,
        instruction: &Instruction,
        values: &[BasicValue],
    ) -> InterpretResult<Option<BasicValue>> {
        let Instruction::Invoke {
            kind, descriptor, ..
        } = instruction
        else {
            return Err(Self::unexpected(instruction));
        };

        let parsed = MethodDescriptor::parse(descriptor)
            .map_err(|_| AnalysisError::MalformedDescriptor(descriptor.clone()))?;
        let receiver = usize::from(kind.has_receiver());
        if values.len() != parsed.params.len() + receiver {
            return Err(AnalysisError::StackUnderflow);
        }

        if receiver == 1 {
            Self::expect_kind(&values[0], LocalKind::Reference)?;
        }
        for (param, value) in parsed.params.iter().zip(&values[receiver..]) {
            if let Some(expected) = param.local_kind() {
                Self::expect_kind(value, expected)?;
            }
        }

        Ok(BasicValue::of_type(&parsed.ret))
    }

    fn merge(&self, a: &BasicValue, b: &BasicValue) -> BasicValue {
        a.join(b)
    }
}
