pub mod console;
pub mod metrics;

use anyhow::Result;

use crate::event::Event;

pub use console::ConsoleSink;
pub use metrics::MetricsSink;

/// A destination for accepted events. Each sink owns its compiled filter
/// rules and decides internally whether to act on a given event, so the
/// controller can treat all sinks uniformly.
pub trait Sink: Send + Sync {
    /// Returns the sink's name, used for filter lookup and log context.
    fn name(&self) -> &str;

    /// Process one event. Filter rejection is not an error; only a real
    /// delivery failure (for example a failed write) returns `Err`.
    fn deliver(&self, event: &Event) -> Result<()>;
}
