//! Event system for stage lifecycle hooks.
//!
//! Provides an optional, non-intrusive way to observe a generation run.
//! Orchestrators emit events when stages start, retry and finish. Implement
//! [`EventHandler`] to drive progress bars or collect metrics.

use crate::types::StageStatus;
use std::sync::Arc;

/// Events emitted during a generation run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A stage has started.
    StageStart {
        /// Stage name, e.g. `"information"`, `"quiz"`.
        stage: String,
    },
    /// Independent stages were launched concurrently.
    FanOut {
        /// Names of the stages running side by side.
        stages: Vec<String>,
    },
    /// A stage attempt failed with a retryable error and will run again.
    StageRetry {
        /// Stage name.
        stage: String,
        /// The retry attempt number (1-indexed).
        attempt: u32,
        /// Delay before this retry attempt in milliseconds.
        delay_ms: u64,
        /// Reason for the retry (error description).
        reason: String,
    },
    /// A stage has settled.
    StageEnd {
        /// Stage name.
        stage: String,
        /// How it settled.
        status: StageStatus,
    },
}

/// Handler for stage lifecycle events.
///
/// This is entirely optional -- pipelines work without an event handler.
///
/// # Example
///
/// ```
/// use quizgen::events::{Event, EventHandler};
///
/// struct PrintHandler;
///
/// impl EventHandler for PrintHandler {
///     fn on_event(&self, event: Event) {
///         match event {
///             Event::StageStart { stage } => println!("[start] {}", stage),
///             Event::StageEnd { stage, status } => println!("[end] {} {}", stage, status.label()),
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + Sync {
    /// Called when an orchestrator emits an event.
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
/// use quizgen::events::{Event, FnEventHandler};
/// use std::sync::Arc;
///
/// let handler = Arc::new(FnEventHandler(|event: Event| {
///     if let Event::StageRetry { stage, attempt, .. } = event {
///         eprintln!("{} retry #{}", stage, attempt);
///     }
/// }));
/// ```
pub struct FnEventHandler<F: Fn(Event) + Send + Sync>(pub F);

impl<F: Fn(Event) + Send + Sync> EventHandler for FnEventHandler<F> {
    fn on_event(&self, event: Event) {
        (self.0)(event);
    }
}
