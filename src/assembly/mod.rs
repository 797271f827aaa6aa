//! Instruction model, descriptors and method bodies.
//!
//! This module provides the bytecode representation every other module operates on:
//!
//! - `instruction` - The [`Instruction`] enum and its operand types
//! - `descriptor` - Parsing of type and method descriptors into [`Type`] and [`MethodDescriptor`]
//! - `body` - The mutable [`MethodBody`] container and [`MethodAccessFlags`]
//! - `builder` - The fluent [`InstructionAssembler`]
//!
//! # Usage
//!
//! ```rust
//! use rangeopt::assembly::{InstructionAssembler, Instruction};
//!
//! let mut asm = InstructionAssembler::new_static("answer", "()I");
//! asm.iconst(42).ireturn();
//! let body = asm.finish()?;
//!
//! for instruction in body.instructions() {
//!     println!("{instruction}");
//! }
//! assert!(matches!(body.get(1), Some(Instruction::Return(_))));
//! # Ok::<(), rangeopt::Error>(())
//! ```

mod body;
mod builder;
mod descriptor;
mod instruction;

pub use body::{MethodAccessFlags, MethodBody};
pub use builder::InstructionAssembler;
pub use descriptor::{MethodDescriptor, Type};
pub use instruction::{
    ArithOp, Comparison, Condition, Constant, Instruction, InvokeKind, Label, LocalKind,
};
