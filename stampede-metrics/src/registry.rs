use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::metrics::{Metric, MetricHandle, MetricKind, MetricSummary};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MetricKey {
    kind: MetricKind,
    name: Arc<str>,
}

/// Concurrency-safe set of named metric series. Writers go through cloned
/// [`MetricHandle`]s and never block each other beyond a per-metric
/// histogram lock; the registry lock only guards handle creation and
/// snapshotting.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    series: Mutex<AHashMap<MetricKey, Arc<Metric>>>,
}

impl MetricsRegistry {
    pub fn handle(&self, kind: MetricKind, name: &str) -> MetricHandle {
        let name: Arc<str> = Arc::from(name);
        let key = MetricKey {
            kind,
            name: name.clone(),
        };

        let mut map = self.series.lock();
        if let Some(existing) = map.get(&key) {
            return MetricHandle::new(existing.clone());
        }

        let metric = Arc::new(Metric::new(kind, name));
        map.insert(key, metric.clone());
        MetricHandle::new(metric)
    }

    /// Consistent point-in-time view of every registered series, sorted by
    /// name for stable reporting.
    pub fn snapshot(&self) -> Vec<MetricSummary> {
        let map = self.series.lock();
        let mut out: Vec<MetricSummary> = map.values().map(|m| m.summarize()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValues;

    #[test]
    fn handles_for_same_name_share_storage() {
        let registry = MetricsRegistry::default();
        let a = registry.handle(MetricKind::Counter, "c");
        let b = registry.handle(MetricKind::Counter, "c");

        a.add(1.0);
        b.add(2.0);

        let snapshot = registry.snapshot();
        let s = snapshot
            .iter()
            .find(|s| s.name == "c")
            .unwrap_or_else(|| panic!("missing counter summary"));
        let MetricValues::Counter { value } = s.values else {
            panic!("expected counter values");
        };
        assert_eq!(value, 3.0);
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let registry = MetricsRegistry::default();
        registry.handle(MetricKind::Counter, "zeta");
        registry.handle(MetricKind::Counter, "alpha");
        registry.handle(MetricKind::Trend, "mid");

        let snapshot = registry.snapshot();
        let names: Vec<&str> = snapshot.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn concurrent_recording_loses_no_updates() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 5_000;

        let registry = Arc::new(MetricsRegistry::default());
        let trend = registry.handle(MetricKind::Trend, "latency");
        let rate = registry.handle(MetricKind::Rate, "errors");

        let mut joins = Vec::with_capacity(THREADS);
        for t in 0..THREADS {
            let trend = trend.clone();
            let rate = rate.clone();
            joins.push(std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    trend.add((1 + (t * PER_THREAD + i) % 100) as f64);
                    rate.observe(i % 10 == 0);
                }
            }));
        }
        for j in joins {
            if j.join().is_err() {
                panic!("recorder thread panicked");
            }
        }

        let snapshot = registry.snapshot();
        let latency = snapshot
            .iter()
            .find(|s| s.name == "latency")
            .unwrap_or_else(|| panic!("missing latency summary"));
        let MetricValues::Trend(ref t) = latency.values else {
            panic!("expected trend values");
        };
        assert_eq!(t.count, (THREADS * PER_THREAD) as u64);

        let errors = snapshot
            .iter()
            .find(|s| s.name == "errors")
            .unwrap_or_else(|| panic!("missing errors summary"));
        let MetricValues::Rate {
            total, failures, ..
        } = errors.values
        else {
            panic!("expected rate values");
        };
        assert_eq!(total, (THREADS * PER_THREAD) as u64);
        assert_eq!(failures, (THREADS * (PER_THREAD / 10)) as u64);
    }
}
