// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # rangeopt
//!
//! Boxing elimination for `for` loops over numeric ranges in stack bytecode.
//!
//! A loop such as `for (i in 0 until n)` that is compiled through the generic
//! `java.util.Iterator` protocol allocates a box for every element and immediately
//! unwraps it again. `rangeopt` proves, per method, which iterators were obtained from
//! a range or progression and rewrites their element fetches to the primitive
//! `IntIterator.nextInt()` family, so no box is ever created.
//!
//! ## Features
//!
//! - **Provenance analysis** - an abstract interpreter that tags iterators with the
//!   element kind of the range they came from, sound across casts and merges
//! - **In-place rewriting** - a single left-to-right scan, then a shrinking rewrite
//!   with explicit index correction
//! - **Never breaks a method** - bodies the analyzer cannot handle are left untouched,
//!   and rewrites can be re-verified and rolled back
//! - **Pipelines** - a [`compiler::MethodPass`] and a parallel [`compiler::PassScheduler`]
//! - **Reference execution** - [`emulation::Executor`] runs bodies before and after to
//!   check they behave the same
//!
//! ## Quick Start
//!
//! ```rust
//! use rangeopt::{assembly::InstructionAssembler, optimize};
//!
//! // for (i in 0 until n) sink(i)
//! let mut asm = InstructionAssembler::new_static("loop", "(I)V");
//! let head = asm.new_label();
//! let exit = asm.new_label();
//! asm.iconst(0)
//!     .iload(0)
//!     .invokestatic("kotlin/ranges/RangesKt", "until", "(II)Lkotlin/ranges/IntRange;")
//!     .invokevirtual("kotlin/ranges/IntRange", "iterator", "()Ljava/util/Iterator;")
//!     .astore(1)
//!     .mark(head)
//!     .aload(1)
//!     .invokeinterface("java/util/Iterator", "hasNext", "()Z")
//!     .ifeq(exit)
//!     .aload(1)
//!     .invokeinterface("java/util/Iterator", "next", "()Ljava/lang/Object;")
//!     .astore(2)
//!     .aload(2)
//!     .checkcast("java/lang/Number")
//!     .invokevirtual("java/lang/Number", "intValue", "()I")
//!     .istore(3)
//!     .iload(3)
//!     .invokestatic("demo/Sink", "accept", "(I)V")
//!     .goto(head)
//!     .mark(exit)
//!     .return_void();
//! let mut body = asm.finish()?;
//!
//! optimize("demo/Loops", &mut body);
//! assert!(body.instructions().iter().any(|i| i.to_string().contains("nextInt")));
//! # Ok::<(), rangeopt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - instruction model, descriptors, method bodies and the assembler
//! - [`analysis`] - frames, interpreters and the worklist analyzer
//! - [`compiler`] - the range unboxing pass and the pass infrastructure around it
//! - [`config`] - range naming convention and optimizer settings
//! - [`emulation`] - reference executor for behavioral comparison
//!
//! ## Error Handling
//!
//! Fallible operations return [`Result<T, Error>`](Result). Analysis failures are not
//! fatal to [`optimize`]; they only leave the affected method unchanged:
//!
//! ```rust
//! use rangeopt::{assembly::InstructionAssembler, Error, analysis::{Analyzer, BasicInterpreter}};
//!
//! let mut asm = InstructionAssembler::new_static("f", "()V");
//! asm.pop().return_void();
//! let body = asm.finish()?;
//!
//! match Analyzer::new(BasicInterpreter::new()).analyze("demo/Owner", &body) {
//!     Err(e) if e.is_analysis_failure() => println!("not analyzable: {e}"),
//!     Err(e) => return Err(e),
//!     Ok(_) => unreachable!(),
//! }
//! # Ok::<(), rangeopt::Error>(())
//! ```
#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use rangeopt::prelude::*;
///
/// let config = OptimizerConfig::verifying();
/// let ctx = CompilerContext::new(config);
/// assert!(ctx.bodies.is_empty());
/// ```
pub mod prelude;

pub mod analysis;
pub mod assembly;
pub mod compiler;
pub mod config;
pub mod emulation;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `rangeopt` Error type
///
/// The main error type for all operations in this crate. See [`Error`] for the
/// categories it covers.
pub use error::Error;

/// Optimizes one method body in place.
///
/// See [`compiler::optimize`].
pub use compiler::optimize;
