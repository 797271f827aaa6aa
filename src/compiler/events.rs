//! Append-only record of what the passes did to each method.
//!
//! Every rewrite, skip, rollback and analysis failure lands in an [`EventLog`] shared
//! by all worker threads of a [`PassScheduler`](super::PassScheduler) run. Rewrite
//! events carry the occurrence position in the coordinates of the analyzed body, so
//! they can be matched against [`find_occurrences`](super::find_occurrences).
//!
//! ```rust
//! use rangeopt::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::OccurrenceRewritten)
//!     .at("demo/Loops.sum(I)I", 7)
//!     .message("IntRange loop unboxed");
//! log.record(EventKind::OccurrenceSkipped).at("demo/Loops.sum(I)I", 30);
//!
//! assert_eq!(log.count_kind(EventKind::OccurrenceRewritten), 1);
//! assert_eq!(log.summary(), "1 rewritten, 1 skipped");
//! ```

use std::{collections::HashSet, fmt, time::Duration};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// An element fetch was replaced by a primitive `next*` call.
    OccurrenceRewritten,
    /// An element fetch matched but its kind has no primitive iterator.
    OccurrenceSkipped,
    /// The rewritten body failed verification and the original was put back.
    RewriteReverted,
    /// Frame analysis rejected the method, which was left as is.
    AnalysisFailed,
    /// A pass began an iteration.
    PassStarted,
    /// A pass finished an iteration.
    PassCompleted,
    /// A pass returned an error for a method.
    Error,
}

impl EventKind {
    /// Short lowercase label, also the default event message.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::OccurrenceRewritten => "occurrence rewritten",
            Self::OccurrenceSkipped => "occurrence skipped",
            Self::RewriteReverted => "rewrite reverted",
            Self::AnalysisFailed => "analysis failed",
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One entry of an [`EventLog`].
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened
    pub kind: EventKind,
    /// `owner.name(descriptor)` of the method, when the event concerns one
    pub method: Option<String>,
    /// Instruction position in the analyzed (pre-rewrite) body
    pub location: Option<usize>,
    /// Free text, defaults to the kind description
    pub message: String,
    /// Name of the pass that produced the event
    pub pass: Option<String>,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        match (&self.method, self.location) {
            (Some(method), Some(location)) => write!(f, " {method}@{location}")?,
            (Some(method), None) => write!(f, " {method}")?,
            _ => {}
        }
        write!(f, " {}", self.message)
    }
}

/// Pending event returned by [`EventLog::record`]; appended when dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Event,
    message: Option<String>,
}

impl EventBuilder<'_> {
    /// Attaches the method and the instruction position.
    pub fn at(mut self, method: impl Into<String>, location: usize) -> Self {
        self.event.method = Some(method.into());
        self.event.location = Some(location);
        self
    }

    /// Attaches the method only.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.event.method = Some(method.into());
        self
    }

    /// Replaces the default message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Names the pass that produced the event.
    pub fn pass(mut self, name: impl Into<String>) -> Self {
        self.event.pass = Some(name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let kind = self.event.kind;
        let message = self
            .message
            .take()
            .unwrap_or_else(|| kind.description().to_string());
        self.log.events.push(Event {
            kind,
            method: self.event.method.take(),
            location: self.event.location.take(),
            message,
            pass: self.event.pass.take(),
        });
    }
}

/// Events of one optimization run.
///
/// Appending takes `&self`, so scheduler workers share one log without locking.
#[derive(Debug, Default)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts an event of `kind`.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Event {
                kind,
                method: None,
                location: None,
                message: String::new(),
                pass: None,
            },
            message: None,
        }
    }

    /// True if any event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.iter().any(|event| event.kind == kind)
    }

    /// Number of events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Events in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Events of `kind` in append order.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |event| event.kind == kind)
    }

    /// Number of distinct methods with at least one rewritten occurrence.
    #[must_use]
    pub fn methods_affected(&self) -> usize {
        self.filter_kind(EventKind::OccurrenceRewritten)
            .filter_map(|event| event.method.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Rewrite and skip counts, e.g. `"3 rewritten, 1 skipped"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let rewritten = self.count_kind(EventKind::OccurrenceRewritten);
        let skipped = self.count_kind(EventKind::OccurrenceSkipped);
        match (rewritten, skipped) {
            (0, 0) => "nothing rewritten".to_string(),
            (r, 0) => format!("{r} rewritten"),
            (r, s) => format!("{r} rewritten, {s} skipped"),
        }
    }
}

/// Counters over an [`EventLog`], as reported after a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct DerivedStats {
    /// Methods with at least one rewrite
    pub methods_transformed: usize,
    /// Rewritten occurrences
    pub occurrences_rewritten: usize,
    /// Matched occurrences without a primitive iterator
    pub occurrences_skipped: usize,
    /// Rolled back rewrites
    pub rewrites_reverted: usize,
    /// Methods the analyzer rejected
    pub analysis_failures: usize,
    /// Pass errors
    pub errors: usize,
    /// Wall time of the run
    pub total_time: Duration,
}

impl DerivedStats {
    /// Counts the events of `log`.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        Self {
            methods_transformed: log.methods_affected(),
            occurrences_rewritten: log.count_kind(EventKind::OccurrenceRewritten),
            occurrences_skipped: log.count_kind(EventKind::OccurrenceSkipped),
            rewrites_reverted: log.count_kind(EventKind::RewriteReverted),
            analysis_failures: log.count_kind(EventKind::AnalysisFailed),
            errors: log.count_kind(EventKind::Error),
            total_time: Duration::ZERO,
        }
    }

    /// Stamps the run time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// One line, e.g. `"2 methods, 3 loops unboxed, 1 skipped in 4ms"`.
    #[must_use]
    pub fn summary(&self) -> String {
        let counters = [
            (self.methods_transformed, "methods"),
            (self.occurrences_rewritten, "loops unboxed"),
            (self.occurrences_skipped, "skipped"),
            (self.rewrites_reverted, "reverted"),
            (self.analysis_failures, "not analyzable"),
            (self.errors, "errors"),
        ];
        let parts: Vec<String> = counters
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, label)| format!("{count} {label}"))
            .collect();

        let line = if parts.is_empty() {
            "no transformations".to_string()
        } else {
            parts.join(", ")
        };
        if self.total_time.as_millis() > 0 {
            format!("{line} in {:?}", self.total_time)
        } else {
            line
        }
    }
}

impl fmt::Display for DerivedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
