use std::sync::Arc;
use std::time::Duration;

use stampede_metrics::{MetricHandle, MetricKind, MetricSummary, MetricsRegistry};

/// Aggregated run statistics. Engine-level series are cached handles;
/// per-operation series (`<op>_duration`, `<op>_errors`) are created on
/// first use, mirroring how custom metrics accrue during a run.
#[derive(Debug)]
pub struct RunStats {
    registry: Arc<MetricsRegistry>,
    requests: MetricHandle,
    request_duration: MetricHandle,
    request_failed: MetricHandle,
    iterations: MetricHandle,
    iteration_duration: MetricHandle,
}

impl Default for RunStats {
    fn default() -> Self {
        let registry: Arc<MetricsRegistry> = Arc::new(MetricsRegistry::default());
        let requests = registry.handle(MetricKind::Counter, "requests");
        let request_duration = registry.handle(MetricKind::Trend, "request_duration");
        let request_failed = registry.handle(MetricKind::Rate, "request_failed");
        let iterations = registry.handle(MetricKind::Counter, "iterations");
        let iteration_duration = registry.handle(MetricKind::Trend, "iteration_duration");

        Self {
            registry,
            requests,
            request_duration,
            request_failed,
            iterations,
            iteration_duration,
        }
    }
}

impl RunStats {
    /// Access for workload actions that keep their own custom series.
    pub fn handle(&self, kind: MetricKind, name: &str) -> MetricHandle {
        self.registry.handle(kind, name)
    }

    pub fn snapshot(&self) -> Vec<MetricSummary> {
        self.registry.snapshot()
    }

    pub(crate) fn record_call(&self, operation: &str, elapsed: Duration, failed: bool) {
        let ms = elapsed.as_secs_f64() * 1000.0;

        self.requests.add(1.0);
        self.request_duration.add(ms);
        self.request_failed.observe(failed);

        self.registry
            .handle(MetricKind::Trend, &format!("{operation}_duration"))
            .add(ms);
        self.registry
            .handle(MetricKind::Rate, &format!("{operation}_errors"))
            .observe(failed);
    }

    pub(crate) fn record_call_skipped(&self, operation: &str) {
        self.registry
            .handle(MetricKind::Rate, &format!("{operation}_errors"))
            .skip();
    }

    pub(crate) fn record_iteration(&self, elapsed: Duration) {
        self.iterations.add(1.0);
        self.iteration_duration
            .add(elapsed.as_secs_f64() * 1000.0);
    }
}
