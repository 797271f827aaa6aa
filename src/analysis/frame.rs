//! Per-instruction abstract machine state.

use std::fmt;

use crate::analysis::{AnalysisError, Interpreter};

/// Abstract state before one instruction: the local slots and the operand stack.
///
/// The number of locals is fixed by the method's `max_locals`; the stack grows and
/// shrinks with execution. Index 0 of [`Frame::stack`] is the bottom of the stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<V> {
    locals: Vec<V>,
    stack: Vec<V>,
}

impl<V: Clone + PartialEq> Frame<V> {
    /// Creates a frame with the given locals and an empty stack.
    #[must_use]
    pub fn new(locals: Vec<V>) -> Self {
        Frame {
            locals,
            stack: Vec::new(),
        }
    }

    /// Returns all local slots.
    #[must_use]
    pub fn locals(&self) -> &[V] {
        &self.locals
    }

    /// Returns the operand stack, bottom first.
    #[must_use]
    pub fn stack(&self) -> &[V] {
        &self.stack
    }

    /// Returns the value in local `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::LocalOutOfRange`] if the slot does not exist.
    pub fn local(&self, slot: u16) -> Result<&V, AnalysisError> {
        self.locals
            .get(usize::from(slot))
            .ok_or(AnalysisError::LocalOutOfRange {
                slot,
                max_locals: self.locals.len(),
            })
    }

    /// Overwrites local `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::LocalOutOfRange`] if the slot does not exist.
    pub fn set_local(&mut self, slot: u16, value: V) -> Result<(), AnalysisError> {
        let max_locals = self.locals.len();
        let target = self
            .locals
            .get_mut(usize::from(slot))
            .ok_or(AnalysisError::LocalOutOfRange { slot, max_locals })?;
        *target = value;
        Ok(())
    }

    /// Returns the stack top without popping it.
    #[must_use]
    pub fn top(&self) -> Option<&V> {
        self.stack.last()
    }

    /// Pushes a value.
    pub fn push(&mut self, value: V) {
        self.stack.push(value);
    }

    /// Pops the stack top.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StackUnderflow`] on an empty stack.
    pub fn pop(&mut self) -> Result<V, AnalysisError> {
        self.stack.pop().ok_or(AnalysisError::StackUnderflow)
    }

    /// Pops `count` values, returned in push order (deepest first).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StackUnderflow`] if fewer than `count` values are
    /// on the stack; the frame is left unchanged in that case.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<V>, AnalysisError> {
        if count > self.stack.len() {
            return Err(AnalysisError::StackUnderflow);
        }
        let split = self.stack.len() - count;
        Ok(self.stack.split_off(split))
    }

    /// Joins `other` into `self` slot by slot.
    ///
    /// Returns `true` if any slot changed.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::StackHeightMismatch`] if the operand stacks differ
    /// in height.
    pub fn merge<I>(&mut self, other: &Frame<V>, interpreter: &I) -> Result<bool, AnalysisError>
    where
        I: Interpreter<Value = V>,
    {
        if self.stack.len() != other.stack.len() {
            return Err(AnalysisError::StackHeightMismatch {
                expected: self.stack.len(),
                found: other.stack.len(),
            });
        }

        let mut changed = false;
        for (mine, theirs) in self
            .locals
            .iter_mut()
            .zip(&other.locals)
            .chain(self.stack.iter_mut().zip(&other.stack))
        {
            let joined = interpreter.merge(mine, theirs);
            if joined != *mine {
                *mine = joined;
                changed = true;
            }
        }
        Ok(changed)
    }
}

impl<V: fmt::Display> fmt::Display for Frame<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for local in &self.locals {
            write!(f, "{local} ")?;
        }
        f.write_str("|")?;
        for value in &self.stack {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}
