//! Shared state for a pipeline run.
//!
//! The [`CompilerContext`] owns the method bodies being optimized, the
//! configuration, the event log and per-method statistics. All collections are
//! thread-safe so passes can process different methods in parallel.

use std::{
    fmt,
    time::{Duration, Instant},
};

use dashmap::{DashMap, DashSet};

use crate::{
    assembly::MethodBody,
    compiler::events::{DerivedStats, EventLog},
    config::OptimizerConfig,
};

/// Identity of a method: declaring type, name and descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    /// Internal name of the declaring type
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
}

impl MethodKey {
    /// Builds the key of `body` declared in `owner`.
    #[must_use]
    pub fn of(owner: &str, body: &MethodBody) -> Self {
        MethodKey {
            owner: owner.to_string(),
            name: body.name().to_string(),
            descriptor: body.descriptor().to_string(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// What the range unboxing pass did to one method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodStats {
    /// Frames were computed; `false` means the method was left untouched
    pub analyzed: bool,
    /// Occurrences of the boxing loop shape found
    pub matched: usize,
    /// Occurrences replaced by a specialized iterator call
    pub rewritten: usize,
    /// Occurrences left alone
    pub skipped: usize,
    /// The rewrite failed re-verification and the original stream was restored
    pub reverted: bool,
    /// Instruction count before the pass
    pub instructions_before: usize,
    /// Instruction count after the pass
    pub instructions_after: usize,
}

impl MethodStats {
    /// Returns `true` if the body was modified.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.rewritten > 0 && !self.reverted
    }
}

/// Shared state of one optimization run.
pub struct CompilerContext {
    /// Optimizer settings.
    pub config: OptimizerConfig,

    /// Method bodies being optimized.
    pub bodies: DashMap<MethodKey, MethodBody>,

    /// Accumulated events from all passes.
    pub events: EventLog,

    /// Methods that at least one pass changed.
    pub processed_methods: DashSet<MethodKey>,

    /// Statistics per method, from the latest pass run.
    method_stats: DashMap<MethodKey, MethodStats>,

    /// When the context was created.
    start_time: Instant,
}

impl CompilerContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            bodies: DashMap::new(),
            events: EventLog::new(),
            processed_methods: DashSet::new(),
            method_stats: DashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Registers a method body and returns its key.
    ///
    /// A body with the same key replaces the previous one.
    pub fn add_method(&self, owner: &str, body: MethodBody) -> MethodKey {
        let key = MethodKey::of(owner, &body);
        self.bodies.insert(key.clone(), body);
        key
    }

    /// Returns all method keys in a stable order.
    #[must_use]
    pub fn method_keys(&self) -> Vec<MethodKey> {
        let mut keys: Vec<_> = self.bodies.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Returns a copy of the body registered under `key`.
    #[must_use]
    pub fn body(&self, key: &MethodKey) -> Option<MethodBody> {
        self.bodies.get(key).map(|entry| entry.value().clone())
    }

    /// Removes and returns every body, sorted by key.
    #[must_use]
    pub fn take_bodies(&self) -> Vec<(MethodKey, MethodBody)> {
        self.method_keys()
            .into_iter()
            .filter_map(|key| self.bodies.remove(&key))
            .collect()
    }

    /// Stores the statistics of one method.
    pub fn record_stats(&self, key: &MethodKey, stats: MethodStats) {
        self.method_stats.insert(key.clone(), stats);
    }

    /// Returns the statistics of one method.
    #[must_use]
    pub fn stats(&self, key: &MethodKey) -> Option<MethodStats> {
        self.method_stats.get(key).map(|entry| *entry.value())
    }

    /// Sums the statistics of all methods.
    #[must_use]
    pub fn total_stats(&self) -> MethodStats {
        self.method_stats
            .iter()
            .fold(MethodStats::default(), |mut total, entry| {
                let stats = entry.value();
                total.analyzed |= stats.analyzed;
                total.matched += stats.matched;
                total.rewritten += stats.rewritten;
                total.skipped += stats.skipped;
                total.reverted |= stats.reverted;
                total.instructions_before += stats.instructions_before;
                total.instructions_after += stats.instructions_after;
                total
            })
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Computes event-derived statistics, stamped with the elapsed time.
    #[must_use]
    pub fn derived_stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events).with_time(self.elapsed())
    }
}
