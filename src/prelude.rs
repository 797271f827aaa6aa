//! # rangeopt Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the rangeopt library. Import this module to get quick access to the essential
//! types for building, analyzing and optimizing method bodies.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all rangeopt operations
pub use crate::Error;

/// The result type used throughout rangeopt
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Optimize a single method body in place
pub use crate::compiler::{optimize, optimize_with};

/// Optimizer settings and the range naming convention
pub use crate::config::{ElementKind, OptimizerConfig, RangeConvention};

// ================================================================================================
// Instruction Model
// ================================================================================================

/// Instructions, bodies and the fluent assembler
pub use crate::assembly::{
    Instruction, InstructionAssembler, InvokeKind, Label, LocalKind, MethodBody, Type,
};

// ================================================================================================
// Analysis
// ================================================================================================

/// Frame computation and the provenance-tracking interpreter
pub use crate::analysis::{
    AnalysisResults, Analyzer, BasicInterpreter, BasicValue, Frame, Interpreter,
    ProvenanceInterpreter, ProvenanceValue,
};

// ================================================================================================
// Pipelines
// ================================================================================================

/// Pass infrastructure and the range unboxing pass
pub use crate::compiler::{
    CompilerContext, EventKind, EventLog, MethodKey, MethodPass, MethodStats, PassScheduler,
    RangeUnboxingPass,
};

// ================================================================================================
// Reference Execution
// ================================================================================================

/// Concrete execution for before/after comparison
pub use crate::emulation::{EmValue, Executor, ExecutionResult};
