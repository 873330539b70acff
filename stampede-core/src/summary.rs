use std::collections::BTreeMap;
use std::time::Duration;

use stampede_metrics::MetricSummary;

use crate::thresholds::ThresholdReport;

/// Final outcome of a run: the wall-clock duration, a snapshot of every
/// metric series, the threshold verdicts, and run-level counters.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_duration: Duration,
    pub metrics: Vec<MetricSummary>,
    pub thresholds: ThresholdReport,
    pub counters: BTreeMap<String, f64>,
}

impl RunSummary {
    /// Overall verdict. A run with no thresholds configured passes.
    pub fn passed(&self) -> bool {
        self.thresholds.results.is_empty() || self.thresholds.passed
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn counter(&self, name: &str) -> Option<f64> {
        self.counters.get(name).copied()
    }
}
