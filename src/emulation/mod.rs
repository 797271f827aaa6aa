//! Reference execution of method bodies.
//!
//! This module runs a [`MethodBody`](crate::assembly::MethodBody) on concrete values so
//! the behavior of a method can be compared before and after optimization. It models
//! the range runtime library closely enough to execute compiled range loops through
//! both the generic, boxing iterator protocol and the primitive-specialized one.
//!
//! # Key Components
//!
//! - [`Executor`] - Runs a method body with an [`EmulationLimits`] budget
//! - [`EmValue`] - Runtime value on the stack or in a local
//! - [`ManagedHeap`] - Object store; its allocation count exposes boxing
//! - [`RangeRuntime`] - Intrinsics for range factories, iterators and unboxing
//! - [`ExecutionResult`] - Return value, sink [`Effect`]s and the final heap
//!
//! # Usage
//!
//! ```rust
//! use rangeopt::{
//!     assembly::InstructionAssembler,
//!     emulation::{EmValue, Executor},
//! };
//!
//! let mut asm = InstructionAssembler::new_static("twice", "(I)I");
//! asm.iload(0).iload(0).iadd().ireturn();
//! let body = asm.finish()?;
//!
//! let result = Executor::new().execute(&body, &[EmValue::Int(21)])?;
//! assert_eq!(result.return_value, Some(EmValue::Int(42)));
//! # Ok::<(), rangeopt::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! An [`Executor`] is immutable and can be shared; every call to
//! [`Executor::execute`] owns its own heap and frame.

mod error;
mod executor;
mod heap;
mod runtime;
mod value;

pub use error::EmulationError;
pub use executor::{Effect, EmulationLimits, ExecutionResult, Executor};
pub use heap::{box_class, HeapObject, ManagedHeap};
pub use runtime::{RangeRuntime, RANGES_FACADE};
pub use value::{EmValue, HeapRef};
