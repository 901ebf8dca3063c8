//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Monotonic resolver counters
//!
//! Observability is read-only: nothing here changes how a query resolves.
//!
//! ```ignore
//! use aerosearch::observability::{log_event, Event};
//!
//! log_event(Event::QueryRejected, &[("reason", "Unknown function foo")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, ResolverMetrics};

/// Log an event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
