//! Method bodies: the mutable instruction stream of one method.
//!
//! A [`MethodBody`] owns the instruction stream together with the method's signature
//! information (name, descriptor, access flags, local slot count). Optimization passes
//! receive `&mut MethodBody` and edit the stream in place through [`MethodBody::insert`]
//! and [`MethodBody::remove`]; the container itself is never replaced.

use std::ops::Range;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::{
    assembly::{Instruction, Label, MethodDescriptor},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method access and property flags
    pub struct MethodAccessFlags: u16 {
        /// Visible everywhere
        const PUBLIC = 0x0001;
        /// Visible only inside the declaring type
        const PRIVATE = 0x0002;
        /// Visible to subclasses
        const PROTECTED = 0x0004;
        /// No receiver; parameters start at slot 0
        const STATIC = 0x0008;
        /// Cannot be overridden
        const FINAL = 0x0010;
        /// Compiler generated
        const SYNTHETIC = 0x1000;
    }
}

/// The instruction stream and signature of a single method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    name: String,
    descriptor: String,
    access: MethodAccessFlags,
    max_locals: u16,
    instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Creates a method body.
    ///
    /// # Arguments
    ///
    /// * `name` - Method name
    /// * `descriptor` - Method descriptor, e.g. `(I)V`
    /// * `access` - Access flags; [`MethodAccessFlags::STATIC`] controls whether slot 0 holds `this`
    /// * `max_locals` - Number of local slots, including parameters and `this`
    /// * `instructions` - The instruction stream
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor does not parse, if the
    /// parameters do not fit in `max_locals`, or if a label is defined twice.
    pub fn new(
        name: &str,
        descriptor: &str,
        access: MethodAccessFlags,
        max_locals: u16,
        instructions: Vec<Instruction>,
    ) -> Result<Self> {
        let parsed = MethodDescriptor::parse(descriptor)?;
        let receiver = usize::from(!access.contains(MethodAccessFlags::STATIC));
        if parsed.params.len() + receiver > usize::from(max_locals) {
            return Err(malformed_error!(
                "Method {}{} needs {} parameter slots but declares {} locals",
                name,
                descriptor,
                parsed.params.len() + receiver,
                max_locals
            ));
        }

        let body = MethodBody {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            max_locals,
            instructions,
        };
        body.label_table()?;
        Ok(body)
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the method descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Returns the access flags.
    #[must_use]
    pub fn access(&self) -> MethodAccessFlags {
        self.access
    }

    /// Returns `true` if the method has no receiver.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccessFlags::STATIC)
    }

    /// Returns the number of local slots.
    #[must_use]
    pub fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Returns the instruction stream.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Returns the number of instructions, labels included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the stream holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Inserts `instructions` so that the first of them ends up at position `at`.
    ///
    /// Every instruction previously at or after `at` shifts right by the number of
    /// inserted instructions.
    ///
    /// # Panics
    ///
    /// Panics if `at > len()`.
    pub fn insert<I>(&mut self, at: usize, instructions: I)
    where
        I: IntoIterator<Item = Instruction>,
    {
        self.instructions.splice(at..at, instructions);
    }

    /// Removes and returns the instructions in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn remove(&mut self, range: Range<usize>) -> Vec<Instruction> {
        self.instructions.drain(range).collect()
    }

    /// Replaces the whole instruction stream, keeping the container.
    ///
    /// Used to restore a previously saved stream when a transformation is rolled back.
    pub fn restore(&mut self, instructions: Vec<Instruction>) {
        self.instructions = instructions;
    }

    /// Maps every label to the position of its [`Instruction::Label`] marker.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a label is defined more than once.
    pub fn label_table(&self) -> Result<FxHashMap<Label, usize>> {
        let mut table = FxHashMap::default();
        for (index, instruction) in self.instructions.iter().enumerate() {
            if let Instruction::Label(label) = instruction {
                if table.insert(*label, index).is_some() {
                    return Err(malformed_error!(
                        "Label {} defined twice in {}",
                        label,
                        self.name
                    ));
                }
            }
        }
        Ok(table)
    }
}
