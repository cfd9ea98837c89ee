//! Reference sinks
//!
//! Ready-made [`crate::Sink`] implementations. None of them is required by
//! the engine; register any of them with [`crate::Tracker::add_sink`].

mod collector;
mod filtered;
mod jsonl;
mod queue;
mod tracing_sink;

pub use collector::ChangeCollector;
pub use filtered::FilteredSink;
pub use jsonl::JsonlFileSink;
pub use queue::QueueSink;
pub use tracing_sink::TracingSink;
