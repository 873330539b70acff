pub mod metrics;
pub mod registry;

pub use metrics::{MetricHandle, MetricKind, MetricSummary, MetricValues, TrendValues};
pub use registry::MetricsRegistry;
