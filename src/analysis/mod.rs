//! Abstract interpretation over method bodies.
//!
//! This module computes, for each instruction of a [`MethodBody`](crate::assembly::MethodBody),
//! an abstract [`Frame`] describing the locals and operand stack before it executes.
//!
//! # Architecture
//!
//! - `lattice` - The [`JoinSemiLattice`] trait
//! - `value` - [`BasicValue`], the baseline value domain (type category and nullability)
//! - `frame` - [`Frame`], locals plus operand stack
//! - `interpreter` - The [`Interpreter`] trait and the verifying [`BasicInterpreter`]
//! - `analyzer` - The worklist [`Analyzer`] and [`AnalysisError`]
//! - `provenance` - [`ProvenanceInterpreter`], which tags iterators obtained from range types
//!
//! # Usage
//!
//! ```rust
//! use rangeopt::analysis::{Analyzer, ProvenanceInterpreter, ProvenanceValue};
//! use rangeopt::assembly::InstructionAssembler;
//! use rangeopt::config::{ElementKind, RangeConvention};
//!
//! let mut asm = InstructionAssembler::new_static("f", "(Lkotlin/ranges/LongRange;)V");
//! asm.aload(0)
//!     .invokevirtual("kotlin/ranges/LongRange", "iterator", "()Ljava/util/Iterator;")
//!     .pop()
//!     .return_void();
//! let body = asm.finish()?;
//!
//! let convention = RangeConvention::default();
//! let results = Analyzer::new(ProvenanceInterpreter::new(&convention)).analyze("Demo", &body)?;
//! assert_eq!(
//!     results.frame(2).and_then(|frame| frame.top()),
//!     Some(&ProvenanceValue::RangeIterator(ElementKind::Long))
//! );
//! # Ok::<(), rangeopt::Error>(())
//! ```

mod analyzer;
mod frame;
mod interpreter;
mod lattice;
mod provenance;
mod value;

pub use analyzer::{AnalysisError, AnalysisResults, Analyzer, DEFAULT_ITERATION_LIMIT};
pub use frame::Frame;
pub use interpreter::{BasicInterpreter, InterpretResult, Interpreter};
pub use lattice::JoinSemiLattice;
pub use provenance::{ProvenanceInterpreter, ProvenanceValue};
pub use value::{BasicValue, ITERATOR_TYPE, OBJECT_TYPE};
