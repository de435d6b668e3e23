//! Event system for record lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe a run. The pipeline
//! emits events when a record starts, when it finishes, and when an input
//! line is skipped. Implement [`EventHandler`] to receive them for progress
//! reporting or metrics.

use serde_json::Value;
use std::sync::Arc;

/// Events emitted while a job runs.
#[derive(Debug, Clone)]
pub enum Event {
    /// A record was parsed and its transformation is starting.
    RecordStart {
        /// 1-based input line number.
        line: usize,
        /// The record's opaque id.
        id: Value,
    },
    /// A record finished.
    RecordEnd {
        /// 1-based input line number.
        line: usize,
        /// The record's opaque id.
        id: Value,
        /// Whether an output record was emitted.
        ok: bool,
    },
    /// An input line could not be parsed and was skipped.
    LineSkipped {
        /// 1-based input line number.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },
}

/// Handler for run lifecycle events.
///
/// This is entirely optional -- jobs run the same without one.
///
/// # Example
///
/// ```
/// use llm_job::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         if let Event::RecordEnd { line, ok, .. } = event {
///             eprintln!("line {line}: ok={ok}");
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called for every emitted event.
    fn on_event(&self, event: Event);
}

/// Emit an event if a handler is present. No-op otherwise.
pub(crate) fn emit(handler: &Option<Arc<dyn EventHandler>>, event: Event) {
    if let Some(ref h) = handler {
        h.on_event(event);
    }
}

/// An [`EventHandler`] backed by a closure.
///
/// # Example
///
/// ```
/// use llm_job::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::LineSkipped { line, reason } = event {
///         eprintln!("skipped line {line}: {reason}");
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
