//! Pass infrastructure and the range unboxing transformation.
//!
//! This module sits on top of [`crate::analysis`]:
//!
//! - [`crate::analysis`] - frames and the provenance interpreter
//! - [`compiler`](self) - passes that rewrite method bodies using those frames
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Compiler Pipeline                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  CompilerContext              Shared state of one run            │
//! │    ├─ Method bodies           (DashMap keyed by MethodKey)       │
//! │    ├─ Method statistics                                          │
//! │    └─ EventLog                                                   │
//! │                                                                  │
//! │  PassScheduler               Fixpoint execution                  │
//! │    Each iteration: every pass over every method, in parallel     │
//! │    Repeats until no pass reports a change                        │
//! │                                                                  │
//! │  MethodPass trait            Interface for all passes            │
//! │    ├─ run_on_method()         Per-method transformation          │
//! │    ├─ initialize()            One-time setup before a run        │
//! │    └─ finalize()              Cleanup after a run                │
//! │                                                                  │
//! │  RangeUnboxingPass           Boxed range loops → primitive       │
//! │    ├─ find_occurrences()      One left-to-right scan             │
//! │    └─ rewrite_occurrences()   Shrinking rewrite, Δ = -1          │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use rangeopt::{
//!     assembly::InstructionAssembler,
//!     compiler::{CompilerContext, PassScheduler, RangeUnboxingPass},
//!     config::OptimizerConfig,
//! };
//!
//! let ctx = CompilerContext::new(OptimizerConfig::default());
//! let mut asm = InstructionAssembler::new_static("noop", "()V");
//! asm.return_void();
//! ctx.add_method("demo/Loops", asm.finish()?);
//!
//! let mut scheduler = PassScheduler::default();
//! scheduler.add_pass(Box::new(RangeUnboxingPass::new()));
//! scheduler.run_pipeline(&ctx)?;
//! println!("{}", ctx.events.summary());
//! # Ok::<(), rangeopt::Error>(())
//! ```

mod context;
mod events;
mod pass;
mod passes;
mod scheduler;

pub use context::{CompilerContext, MethodKey, MethodStats};
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::MethodPass;
pub use passes::{
    find_occurrences, live_position, optimize, optimize_with, original_position,
    rewrite_occurrences, Occurrence, RangeUnboxingPass, RewriteOutcome, INSERTED, PATTERN_LEN,
    REMOVED,
};
pub use scheduler::PassScheduler;
