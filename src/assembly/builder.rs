//! Fluent assembler for method bodies.
//!
//! [`InstructionAssembler`] builds a [`MethodBody`] one instruction at a time. It
//! allocates labels, tracks the highest local slot used, and computes `max_locals`
//! when the body is finished. It is the main way tests and tools produce bytecode.
//!
//! # Examples
//!
//! ```rust
//! use rangeopt::assembly::{InstructionAssembler, Comparison};
//!
//! // static int countdown(int n) { while (n > 0) n--; return n; }
//! let mut asm = InstructionAssembler::new_static("countdown", "(I)I");
//! let head = asm.new_label();
//! let exit = asm.new_label();
//! asm.mark(head)
//!     .iload(0)
//!     .if_zero(Comparison::Le, exit)
//!     .iinc(0, -1)
//!     .goto(head)
//!     .mark(exit)
//!     .iload(0)
//!     .ireturn();
//! let body = asm.finish()?;
//! assert_eq!(body.max_locals(), 1);
//! # Ok::<(), rangeopt::Error>(())
//! ```

use crate::{
    assembly::{
        ArithOp, Comparison, Condition, Constant, Instruction, InvokeKind, Label, LocalKind,
        MethodAccessFlags, MethodBody, MethodDescriptor,
    },
    Result,
};

/// Builder for [`MethodBody`] instances.
#[derive(Debug, Clone)]
pub struct InstructionAssembler {
    name: String,
    descriptor: String,
    access: MethodAccessFlags,
    instructions: Vec<Instruction>,
    next_label: u32,
    highest_slot: Option<u16>,
}

impl InstructionAssembler {
    /// Starts an instance method (slot 0 holds `this`).
    #[must_use]
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self::with_access(name, descriptor, MethodAccessFlags::PUBLIC)
    }

    /// Starts a static method (parameters start at slot 0).
    #[must_use]
    pub fn new_static(name: &str, descriptor: &str) -> Self {
        Self::with_access(
            name,
            descriptor,
            MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        )
    }

    /// Starts a method with explicit access flags.
    #[must_use]
    pub fn with_access(name: &str, descriptor: &str, access: MethodAccessFlags) -> Self {
        InstructionAssembler {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            instructions: Vec::new(),
            next_label: 0,
            highest_slot: None,
        }
    }

    /// Allocates a fresh label. Place it with [`Self::mark`].
    pub fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Places `label` at the current position.
    pub fn mark(&mut self, label: Label) -> &mut Self {
        self.emit(Instruction::Label(label))
    }

    /// Appends an arbitrary instruction.
    pub fn emit(&mut self, instruction: Instruction) -> &mut Self {
        match &instruction {
            Instruction::Load { slot, .. }
            | Instruction::Store { slot, .. }
            | Instruction::Increment { slot, .. } => self.touch(*slot),
            _ => {}
        }
        self.instructions.push(instruction);
        self
    }

    /// Returns the number of instructions emitted so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.instructions.len()
    }

    fn touch(&mut self, slot: u16) {
        self.highest_slot = Some(self.highest_slot.map_or(slot, |high| high.max(slot)));
    }

    // Constants

    /// `aconst_null`
    pub fn aconst_null(&mut self) -> &mut Self {
        self.emit(Instruction::Const(Constant::Null))
    }

    /// Pushes an int constant.
    pub fn iconst(&mut self, value: i32) -> &mut Self {
        self.emit(Instruction::Const(Constant::Int(value)))
    }

    /// Pushes a long constant.
    pub fn lconst(&mut self, value: i64) -> &mut Self {
        self.emit(Instruction::Const(Constant::Long(value)))
    }

    /// Pushes a double constant.
    pub fn dconst(&mut self, value: f64) -> &mut Self {
        self.emit(Instruction::Const(Constant::Double(value)))
    }

    /// Pushes a string constant.
    pub fn sconst(&mut self, value: &str) -> &mut Self {
        self.emit(Instruction::Const(Constant::String(value.to_string())))
    }

    // Locals

    /// Loads a local of the given kind.
    pub fn load(&mut self, kind: LocalKind, slot: u16) -> &mut Self {
        self.emit(Instruction::Load { kind, slot })
    }

    /// Stores into a local of the given kind.
    pub fn store(&mut self, kind: LocalKind, slot: u16) -> &mut Self {
        self.emit(Instruction::Store { kind, slot })
    }

    /// `iload`
    pub fn iload(&mut self, slot: u16) -> &mut Self {
        self.load(LocalKind::Int, slot)
    }

    /// `istore`
    pub fn istore(&mut self, slot: u16) -> &mut Self {
        self.store(LocalKind::Int, slot)
    }

    /// `lload`
    pub fn lload(&mut self, slot: u16) -> &mut Self {
        self.load(LocalKind::Long, slot)
    }

    /// `lstore`
    pub fn lstore(&mut self, slot: u16) -> &mut Self {
        self.store(LocalKind::Long, slot)
    }

    /// `aload`
    pub fn aload(&mut self, slot: u16) -> &mut Self {
        self.load(LocalKind::Reference, slot)
    }

    /// `astore`
    pub fn astore(&mut self, slot: u16) -> &mut Self {
        self.store(LocalKind::Reference, slot)
    }

    /// `iinc`
    pub fn iinc(&mut self, slot: u16, delta: i32) -> &mut Self {
        self.emit(Instruction::Increment { slot, delta })
    }

    // Arithmetic and stack

    /// `iadd`
    pub fn iadd(&mut self) -> &mut Self {
        self.emit(Instruction::Arith {
            op: ArithOp::Add,
            kind: LocalKind::Int,
        })
    }

    /// `isub`
    pub fn isub(&mut self) -> &mut Self {
        self.emit(Instruction::Arith {
            op: ArithOp::Sub,
            kind: LocalKind::Int,
        })
    }

    /// `imul`
    pub fn imul(&mut self) -> &mut Self {
        self.emit(Instruction::Arith {
            op: ArithOp::Mul,
            kind: LocalKind::Int,
        })
    }

    /// `ladd`
    pub fn ladd(&mut self) -> &mut Self {
        self.emit(Instruction::Arith {
            op: ArithOp::Add,
            kind: LocalKind::Long,
        })
    }

    /// `pop`
    pub fn pop(&mut self) -> &mut Self {
        self.emit(Instruction::Pop)
    }

    /// `dup`
    pub fn dup(&mut self) -> &mut Self {
        self.emit(Instruction::Dup)
    }

    // Calls and casts

    /// `invokestatic owner.name descriptor`
    pub fn invokestatic(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.emit(Instruction::invoke(InvokeKind::Static, owner, name, descriptor))
    }

    /// `invokevirtual owner.name descriptor`
    pub fn invokevirtual(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.emit(Instruction::invoke(InvokeKind::Virtual, owner, name, descriptor))
    }

    /// `invokeinterface owner.name descriptor`
    pub fn invokeinterface(&mut self, owner: &str, name: &str, descriptor: &str) -> &mut Self {
        self.emit(Instruction::invoke(
            InvokeKind::Interface,
            owner,
            name,
            descriptor,
        ))
    }

    /// `checkcast type_name`
    pub fn checkcast(&mut self, type_name: &str) -> &mut Self {
        self.emit(Instruction::CheckCast(type_name.to_string()))
    }

    // Control flow

    /// `goto label`
    pub fn goto(&mut self, target: Label) -> &mut Self {
        self.jump(Condition::Always, target)
    }

    /// Branches on a comparison of the int stack top against zero.
    pub fn if_zero(&mut self, cmp: Comparison, target: Label) -> &mut Self {
        self.jump(Condition::Zero(cmp), target)
    }

    /// `ifeq label` (branch if the int is zero / the boolean is false)
    pub fn ifeq(&mut self, target: Label) -> &mut Self {
        self.if_zero(Comparison::Eq, target)
    }

    /// `ifne label` (branch if the int is non-zero / the boolean is true)
    pub fn ifne(&mut self, target: Label) -> &mut Self {
        self.if_zero(Comparison::Ne, target)
    }

    /// Branches on a comparison of two ints.
    pub fn if_icmp(&mut self, cmp: Comparison, target: Label) -> &mut Self {
        self.jump(Condition::IntCompare(cmp), target)
    }

    /// `ifnull label`
    pub fn ifnull(&mut self, target: Label) -> &mut Self {
        self.jump(Condition::Null, target)
    }

    /// Emits a jump with an arbitrary condition.
    pub fn jump(&mut self, condition: Condition, target: Label) -> &mut Self {
        self.emit(Instruction::Jump { condition, target })
    }

    /// `ireturn`
    pub fn ireturn(&mut self) -> &mut Self {
        self.emit(Instruction::Return(Some(LocalKind::Int)))
    }

    /// `lreturn`
    pub fn lreturn(&mut self) -> &mut Self {
        self.emit(Instruction::Return(Some(LocalKind::Long)))
    }

    /// `areturn`
    pub fn areturn(&mut self) -> &mut Self {
        self.emit(Instruction::Return(Some(LocalKind::Reference)))
    }

    /// `return`
    pub fn return_void(&mut self) -> &mut Self {
        self.emit(Instruction::Return(None))
    }

    /// Finishes the body.
    ///
    /// `max_locals` covers both the parameter slots and every slot touched by an
    /// emitted load, store or increment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the descriptor is malformed or a label
    /// is placed twice.
    pub fn finish(self) -> Result<MethodBody> {
        let descriptor = MethodDescriptor::parse(&self.descriptor)?;
        let receiver = usize::from(!self.access.contains(MethodAccessFlags::STATIC));
        let parameter_slots = descriptor.params.len() + receiver;
        let touched = self.highest_slot.map_or(0, |slot| usize::from(slot) + 1);

        let Ok(max_locals) = u16::try_from(parameter_slots.max(touched)) else {
            return Err(malformed_error!("Too many locals in {}", self.name));
        };

        MethodBody::new(
            &self.name,
            &self.descriptor,
            self.access,
            max_locals,
            self.instructions,
        )
    }
}
