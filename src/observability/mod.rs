//! Observability for the WAL and recovery subsystems
//!
//! - Structured JSON logging, one line per event
//! - Typed lifecycle events
//! - Per-store counters
//!
//! Observability never changes the outcome of the operation it observes:
//! a logger write that fails is ignored.
//!
//! ```ignore
//! use aerolog::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::WalFlush, &[("records", "4")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, WalMetrics};
pub use scope::ObservationScope;

/// Log a lifecycle event at its natural severity
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else if event == Event::WalLineSkipped || event == Event::RollbackNoTargets {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
