//! Change tracking for the optimization pipeline.
//!
//! Passes describe each rewrite they perform as an [`Event`] tagged with the
//! function, the block and the pass responsible. The [`Compiler`] keeps one
//! [`EventLog`] per compilation; the CLI prints its tallies with `--stats`.
//!
//! The log is backed by `boxcar::Vec`, so functions optimized in parallel
//! append through a shared reference without locking.
//!
//! # Example
//!
//! ```rust
//! use mila::compiler::{EventKind, EventLog};
//!
//! let log = EventLog::new();
//! log.record(EventKind::ConstantFolded)
//!     .function("main")
//!     .location(0)
//!     .pass("constant-propagation")
//!     .message("%3 = 14");
//! log.info("pipeline converged");
//!
//! assert_eq!(log.count_kind(EventKind::ConstantFolded), 1);
//! assert_eq!(log.count_by_pass().get("constant-propagation"), Some(&1));
//! assert_eq!(log.summary(), "1 constant folded");
//! ```
//!
//! [`Compiler`]: crate::Compiler

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
};

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::ast::Symbol;

/// What a recorded event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum EventKind {
    /// Uses of a value were replaced by an immediate.
    #[strum(to_string = "constant folded")]
    ConstantFolded,
    /// A conditional branch became a jump.
    #[strum(to_string = "branch simplified")]
    BranchSimplified,
    /// An unused instruction was erased.
    #[strum(to_string = "instruction removed")]
    InstructionRemoved,
    /// An unreachable block was erased.
    #[strum(to_string = "block removed")]
    BlockRemoved,
    /// A phi lost entries or was replaced by its single incoming operand.
    #[strum(to_string = "phi simplified")]
    PhiSimplified,
    /// A never-loaded stack slot was erased along with its stores.
    #[strum(to_string = "store eliminated")]
    StoreEliminated,
    /// Free-form note.
    #[strum(to_string = "info")]
    Info,
    /// The pipeline hit a limit, e.g. the round bound.
    #[strum(to_string = "warning")]
    Warning,
}

impl EventKind {
    /// Returns true if events of this kind rewrite the IR.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        !matches!(self, Self::Info | Self::Warning)
    }
}

/// One recorded change or note.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Function the event belongs to, if any.
    pub function: Option<Symbol>,
    /// Block index within the function.
    pub location: Option<usize>,
    /// Human-readable detail, usually the rewritten instruction.
    pub message: String,
    /// Name of the pass that recorded the event.
    pub pass: Option<&'static str>,
}

impl Event {
    fn note(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            function: None,
            location: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(function) = &self.function {
            write!(f, " @{function}")?;
        }
        if let Some(location) = self.location {
            write!(f, " bb{location}")?;
        }
        write!(f, " {}", self.message)
    }
}

/// Fluent recorder returned by [`EventLog::record`].
///
/// The event is appended when the builder is dropped; without a message the
/// kind's name is used.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Event,
    has_message: bool,
}

impl EventBuilder<'_> {
    /// Sets the function and block.
    pub fn at(mut self, function: &Symbol, location: usize) -> Self {
        self.event.function = Some(function.clone());
        self.event.location = Some(location);
        self
    }

    /// Sets the function only.
    pub fn function(mut self, function: impl Into<Symbol>) -> Self {
        self.event.function = Some(function.into());
        self
    }

    /// Sets the block index.
    pub fn location(mut self, location: usize) -> Self {
        self.event.location = Some(location);
        self
    }

    /// Sets the detail text.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = message.into();
        self.has_message = true;
        self
    }

    /// Names the pass responsible.
    pub fn pass(mut self, pass: &'static str) -> Self {
        self.event.pass = Some(pass);
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let mut event = Event::note(self.event.kind, String::new());
        std::mem::swap(&mut event, &mut self.event);
        if !self.has_message {
            event.message = event.kind.to_string();
        }
        self.log.events.push(event);
    }
}

/// Append-only record of one compilation's changes.
///
/// Thread-safe: events are appended through shared references (`&self`).
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

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts recording an event of `kind`.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder {
            log: self,
            event: Event::note(kind, String::new()),
            has_message: false,
        }
    }

    /// Records an informational note.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::note(EventKind::Info, message));
    }

    /// Records a warning.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::note(EventKind::Warning, message));
    }

    /// Appends copies of every event of `other`.
    pub fn merge(&self, other: &EventLog) {
        for event in other.iter() {
            self.events.push(event.clone());
        }
    }

    /// Iterates over the events in recording order per thread.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Iterates over the events of one kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |event| event.kind == kind)
    }

    /// Returns true if an event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.filter_kind(kind).next().is_some()
    }

    /// Counts the events of one kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.filter_kind(kind).count()
    }

    /// Counts events per kind, in declaration order of [`EventKind`].
    #[must_use]
    pub fn count_by_kind(&self) -> BTreeMap<EventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in self.iter() {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Counts IR rewrites per pass name.
    #[must_use]
    pub fn count_by_pass(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for event in self.iter().filter(|event| event.kind.is_transformation()) {
            if let Some(pass) = event.pass {
                *counts.entry(pass).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of distinct functions with at least one IR rewrite.
    #[must_use]
    pub fn functions_affected(&self) -> usize {
        self.iter()
            .filter(|event| event.kind.is_transformation())
            .filter_map(|event| event.function.as_ref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// One-line tally of the IR rewrites, e.g. `"2 constant folded, 1 block removed"`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();
        let parts: Vec<String> = EventKind::iter()
            .filter(EventKind::is_transformation)
            .filter_map(|kind| counts.get(&kind).map(|count| format!("{count} {kind}")))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }
        parts.join(", ")
    }
}
