//! Metrics feed on top of the reserved metric events.

mod feed;

pub use feed::{FeedConfig, MetricsFeed, MetricsReading, SnapshotSource};
