//! Worklist-based frame analyzer.
//!
//! The analyzer computes, for every reachable instruction of a method body, the
//! abstract [`Frame`] holding just before that instruction executes. The semantics of
//! individual instructions come from an [`Interpreter`]; the analyzer contributes the
//! entry frame, stack bookkeeping, control flow, and the fixpoint iteration.
//!
//! # Algorithm
//!
//! 1. Build the entry frame: receiver (instance methods), parameters, and
//!    unassigned values for the remaining locals
//! 2. Put instruction 0 on the worklist
//! 3. While the worklist is non-empty:
//!    a. Remove an instruction and execute it on a copy of its frame
//!    b. Merge the resulting frame into every successor
//!    c. Re-queue any successor whose frame changed
//!
//! Unreachable instructions keep no frame. The value lattices used here have finite
//! height, so the iteration always terminates; an explicit iteration limit guards
//! against pathological inputs.

use std::collections::VecDeque;

use thiserror::Error;

use crate::{
    analysis::{Frame, Interpreter},
    assembly::{Instruction, Label, LocalKind, MethodBody, MethodDescriptor, Type},
    Error, Result,
};

/// Default upper bound on worklist iterations.
pub const DEFAULT_ITERATION_LIMIT: usize = 1_000_000;

/// Reasons the analyzer rejects a method body.
///
/// Wrapped into [`Error::Analysis`] together with the offending instruction index.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// An instruction needs more operands than the stack holds.
    #[error("operand stack underflow")]
    StackUnderflow,

    /// A load or increment reads a local that is not definitely assigned.
    #[error("local {0} is read before it is definitely assigned")]
    UninitializedLocal(u16),

    /// A local slot index is outside `max_locals`.
    #[error("local {slot} is out of range (max_locals = {max_locals})")]
    LocalOutOfRange {
        /// The offending slot
        slot: u16,
        /// Number of locals of the method
        max_locals: usize,
    },

    /// A value of the wrong category reaches an instruction.
    #[error("expected a value of kind '{expected}', found '{found}'")]
    IncompatibleValue {
        /// The category the instruction requires
        expected: LocalKind,
        /// Rendering of the value actually found
        found: String,
    },

    /// Two control flow paths reach an instruction with different stack heights.
    #[error("stack height mismatch at join point: {expected} vs {found}")]
    StackHeightMismatch {
        /// Height already recorded at the join point
        expected: usize,
        /// Height arriving on the new path
        found: usize,
    },

    /// A jump names a label that is not placed in the body.
    #[error("jump to undefined label {0}")]
    UnknownLabel(Label),

    /// Execution can run past the last instruction.
    #[error("execution falls off the end of the method")]
    FallsOffEnd,

    /// A call descriptor does not parse.
    #[error("malformed call descriptor '{0}'")]
    MalformedDescriptor(String),

    /// The interpreter does not handle this instruction in this position.
    #[error("unexpected instruction '{0}'")]
    UnexpectedInstruction(String),

    /// The fixpoint was not reached within the configured number of iterations.
    #[error("no fixpoint after {0} iterations")]
    IterationLimit(usize),
}

/// The frames computed for one method body.
///
/// Indexed by instruction position. `None` marks an unreachable instruction.
#[derive(Debug, Clone)]
pub struct AnalysisResults<V> {
    frames: Vec<Option<Frame<V>>>,
    iterations: usize,
}

impl<V> AnalysisResults<V> {
    /// Returns the frame before instruction `index`, `None` if unreachable.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&Frame<V>> {
        self.frames.get(index).and_then(Option::as_ref)
    }

    /// Returns all frames in instruction order.
    #[must_use]
    pub fn frames(&self) -> &[Option<Frame<V>>] {
        &self.frames
    }

    /// Returns the number of analyzed instruction positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the method had no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Returns the number of worklist iterations it took to reach the fixpoint.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the number of reachable instructions.
    #[must_use]
    pub fn reachable(&self) -> usize {
        self.frames.iter().filter(|frame| frame.is_some()).count()
    }
}

/// Worklist frame analyzer parameterized by an [`Interpreter`].
///
/// # Usage
///
/// ```rust
/// use rangeopt::analysis::{Analyzer, BasicInterpreter, BasicValue};
/// use rangeopt::assembly::InstructionAssembler;
///
/// let mut asm = InstructionAssembler::new_static("twice", "(I)I");
/// asm.iload(0).iconst(2).imul().ireturn();
/// let body = asm.finish()?;
///
/// let results = Analyzer::new(BasicInterpreter::new()).analyze("Math", &body)?;
/// let before_return = results.frame(3).unwrap();
/// assert_eq!(before_return.stack(), &[BasicValue::Int]);
/// # Ok::<(), rangeopt::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Analyzer<I: Interpreter> {
    interpreter: I,
    iteration_limit: usize,
}

impl<I: Interpreter> Analyzer<I> {
    /// Creates an analyzer with the default iteration limit.
    #[must_use]
    pub fn new(interpreter: I) -> Self {
        Analyzer {
            interpreter,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
        }
    }

    /// Sets the maximum number of worklist iterations.
    #[must_use]
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit;
        self
    }

    /// Returns the interpreter.
    #[must_use]
    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    /// Computes the frame before every reachable instruction of `body`.
    ///
    /// `owner` is the internal name of the declaring type; it types the receiver of
    /// instance methods.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Analysis`] if the body is rejected by the interpreter or is
    /// structurally invalid (stack underflow, height mismatch, undefined label,
    /// falling off the end), and [`Error::Malformed`] if its descriptor does not parse.
    pub fn analyze(&self, owner: &str, body: &MethodBody) -> Result<AnalysisResults<I::Value>> {
        let count = body.len();
        if count == 0 {
            return Err(Error::Analysis {
                index: 0,
                reason: AnalysisError::FallsOffEnd,
            });
        }

        let labels = body.label_table()?;
        let entry = self.entry_frame(owner, body)?;

        let mut frames: Vec<Option<Frame<I::Value>>> = vec![None; count];
        let mut worklist = VecDeque::from([0usize]);
        let mut in_worklist = vec![false; count];
        frames[0] = Some(entry);
        in_worklist[0] = true;

        let mut iterations = 0;
        while let Some(index) = worklist.pop_front() {
            in_worklist[index] = false;
            iterations += 1;
            if iterations > self.iteration_limit {
                return Err(Error::Analysis {
                    index,
                    reason: AnalysisError::IterationLimit(self.iteration_limit),
                });
            }

            let Some(frame) = frames[index].clone() else {
                continue;
            };
            let instruction = &body.instructions()[index];
            let fail = |reason| Error::Analysis { index, reason };

            let after = self.execute(instruction, frame).map_err(fail)?;
            let successors = Self::successors(index, instruction, count, |label| {
                labels.get(&label).copied()
            })
            .map_err(fail)?;

            for successor in successors {
                let changed = if let Some(existing) = frames[successor].as_mut() {
                    existing.merge(&after, &self.interpreter).map_err(fail)?
                } else {
                    frames[successor] = Some(after.clone());
                    true
                };
                if changed && !in_worklist[successor] {
                    in_worklist[successor] = true;
                    worklist.push_back(successor);
                }
            }
        }

        Ok(AnalysisResults { frames, iterations })
    }

    fn entry_frame(&self, owner: &str, body: &MethodBody) -> Result<Frame<I::Value>> {
        let descriptor = MethodDescriptor::parse(body.descriptor())?;
        let mut locals = vec![self.interpreter.new_value(None); usize::from(body.max_locals())];

        let mut slot = 0;
        if !body.is_static() {
            locals[slot] = self.interpreter.new_value(Some(&Type::object(owner)));
            slot += 1;
        }
        for param in &descriptor.params {
            let Some(local) = locals.get_mut(slot) else {
                return Err(malformed_error!(
                    "Parameters of {} exceed max_locals",
                    body.name()
                ));
            };
            *local = self.interpreter.new_value(Some(param));
            slot += 1;
        }

        Ok(Frame::new(locals))
    }

    fn execute(
        &self,
        instruction: &Instruction,
        mut frame: Frame<I::Value>,
    ) -> std::result::Result<Frame<I::Value>, AnalysisError> {
        let interpreter = &self.interpreter;
        match instruction {
            Instruction::Nop | Instruction::Label(_) | Instruction::Return(None) => {}
            Instruction::Const(_) => frame.push(interpreter.new_operation(instruction)?),
            Instruction::Load { slot, .. } => {
                let value = interpreter.copy_operation(instruction, frame.local(*slot)?)?;
                frame.push(value);
            }
            Instruction::Store { slot, .. } => {
                let value = frame.pop()?;
                let stored = interpreter.copy_operation(instruction, &value)?;
                frame.set_local(*slot, stored)?;
            }
            Instruction::Increment { slot, .. } => {
                if let Some(value) = interpreter.unary_operation(instruction, frame.local(*slot)?)? {
                    frame.set_local(*slot, value)?;
                }
            }
            Instruction::Arith { .. } => {
                let right = frame.pop()?;
                let left = frame.pop()?;
                if let Some(value) = interpreter.binary_operation(instruction, &left, &right)? {
                    frame.push(value);
                }
            }
            Instruction::Pop => {
                frame.pop()?;
            }
            Instruction::Dup => {
                let top = frame.top().cloned().ok_or(AnalysisError::StackUnderflow)?;
                frame.push(interpreter.copy_operation(instruction, &top)?);
            }
            Instruction::Invoke {
                kind, descriptor, ..
            } => {
                let parsed = MethodDescriptor::parse(descriptor)
                    .map_err(|_| AnalysisError::MalformedDescriptor(descriptor.clone()))?;
                let arity = parsed.params.len() + usize::from(kind.has_receiver());
                let values = frame.pop_n(arity)?;
                if let Some(value) = interpreter.nary_operation(instruction, &values)? {
                    frame.push(value);
                }
            }
            Instruction::CheckCast(_) => {
                let value = frame.pop()?;
                if let Some(result) = interpreter.unary_operation(instruction, &value)? {
                    frame.push(result);
                }
            }
            Instruction::Jump { condition, .. } => match condition.operand_count() {
                0 => {}
                1 => {
                    let value = frame.pop()?;
                    interpreter.unary_operation(instruction, &value)?;
                }
                _ => {
                    let right = frame.pop()?;
                    let left = frame.pop()?;
                    interpreter.binary_operation(instruction, &left, &right)?;
                }
            },
            Instruction::Return(Some(_)) => {
                let value = frame.pop()?;
                interpreter.unary_operation(instruction, &value)?;
            }
        }
        Ok(frame)
    }

    fn successors(
        index: usize,
        instruction: &Instruction,
        count: usize,
        resolve: impl Fn(Label) -> Option<usize>,
    ) -> std::result::Result<Vec<usize>, AnalysisError> {
        let mut successors = Vec::with_capacity(2);
        if let Some(label) = instruction.branch_target() {
            successors.push(resolve(label).ok_or(AnalysisError::UnknownLabel(label))?);
        }
        if !instruction.is_terminator() {
            if index + 1 >= count {
                return Err(AnalysisError::FallsOffEnd);
            }
            successors.push(index + 1);
        }
        Ok(successors)
    }
}
