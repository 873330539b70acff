use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Values are recorded in milliseconds and stored scaled by 1000, so the
/// histogram resolves down to a microsecond while staying integer-valued.
const SCALE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Rate,
    Trend,
}

#[derive(Debug, Clone)]
pub struct MetricSummary {
    pub name: String,
    pub kind: MetricKind,
    pub values: MetricValues,
}

#[derive(Debug, Clone)]
pub enum MetricValues {
    Counter {
        value: f64,
    },
    /// Failure ratio. `skipped` counts observations that never reached the
    /// target (no candidate available) and is excluded from `total`/`rate`.
    Rate {
        total: u64,
        failures: u64,
        skipped: u64,
        rate: Option<f64>,
    },
    Trend(TrendValues),
}

#[derive(Debug, Clone, Default)]
pub struct TrendValues {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

fn new_trend_histogram() -> Histogram<u64> {
    // Up to 60s of scaled milliseconds at 3 significant figures.
    Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
        .unwrap_or_else(|err| panic!("failed to init histogram: {err}"))
}

#[derive(Debug)]
struct TrendAgg {
    count: AtomicU64,
    sum_scaled: AtomicU64,
    min_scaled: AtomicU64,
    max_scaled: AtomicU64,
    hist: Mutex<Histogram<u64>>,
}

impl TrendAgg {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_scaled: AtomicU64::new(0),
            min_scaled: AtomicU64::new(u64::MAX),
            max_scaled: AtomicU64::new(0),
            hist: Mutex::new(new_trend_histogram()),
        }
    }

    fn record(&self, value: f64) {
        if !value.is_finite() || value < 0.0 {
            tracing::warn!(value, "discarding out-of-range distribution sample");
            return;
        }

        let scaled = (value * SCALE).round();
        if scaled <= 0.0 {
            // Below resolution.
            return;
        }
        let scaled = scaled as u64;

        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_scaled.fetch_add(scaled, Ordering::Relaxed);

        let mut cur = self.min_scaled.load(Ordering::Relaxed);
        while scaled < cur {
            match self.min_scaled.compare_exchange_weak(
                cur,
                scaled,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(v) => cur = v,
            }
        }

        let mut cur = self.max_scaled.load(Ordering::Relaxed);
        while scaled > cur {
            match self.max_scaled.compare_exchange_weak(
                cur,
                scaled,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(v) => cur = v,
            }
        }

        let mut h = self.hist.lock();
        h.saturating_record(scaled);
    }

    fn summarize(&self) -> TrendValues {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return TrendValues::default();
        }

        let sum = self.sum_scaled.load(Ordering::Relaxed) as f64;
        let min = self.min_scaled.load(Ordering::Relaxed) as f64 / SCALE;
        let max = self.max_scaled.load(Ordering::Relaxed) as f64 / SCALE;

        // The histogram is a 3-sigfig estimate; clamping keeps every
        // percentile inside the exactly-tracked [min, max] envelope.
        let h = self.hist.lock();
        let quantile = |q: f64| (h.value_at_quantile(q) as f64 / SCALE).clamp(min, max);

        TrendValues {
            count,
            min: Some(min),
            max: Some(max),
            mean: Some(sum / (count as f64) / SCALE),
            p50: Some(quantile(0.50)),
            p90: Some(quantile(0.90)),
            p95: Some(quantile(0.95)),
            p99: Some(quantile(0.99)),
        }
    }
}

#[derive(Debug, Default)]
struct CounterAgg {
    value: Mutex<f64>,
}

impl CounterAgg {
    fn add(&self, v: f64) {
        if !v.is_finite() {
            return;
        }
        let mut guard = self.value.lock();
        *guard += v;
    }

    fn get(&self) -> f64 {
        *self.value.lock()
    }
}

#[derive(Debug, Default)]
struct RateAgg {
    total: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

impl RateAgg {
    fn observe(&self, failed: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn summarize(&self) -> MetricValues {
        let total = self.total.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let skipped = self.skipped.load(Ordering::Relaxed);
        let rate = if total == 0 {
            None
        } else {
            Some(failures as f64 / total as f64)
        };
        MetricValues::Rate {
            total,
            failures,
            skipped,
            rate,
        }
    }
}

#[derive(Debug)]
enum Storage {
    Counter(CounterAgg),
    Rate(RateAgg),
    Trend(TrendAgg),
}

#[derive(Debug)]
pub(crate) struct Metric {
    name: Arc<str>,
    kind: MetricKind,
    storage: Storage,
}

impl Metric {
    pub(crate) fn new(kind: MetricKind, name: Arc<str>) -> Self {
        let storage = match kind {
            MetricKind::Counter => Storage::Counter(CounterAgg::default()),
            MetricKind::Rate => Storage::Rate(RateAgg::default()),
            MetricKind::Trend => Storage::Trend(TrendAgg::new()),
        };
        Self {
            name,
            kind,
            storage,
        }
    }

    fn add(&self, value: f64) {
        match &self.storage {
            Storage::Counter(c) => c.add(value),
            Storage::Trend(t) => t.record(value),
            // Rates take booleans; see `observe`.
            Storage::Rate(_) => {}
        }
    }

    fn observe(&self, failed: bool) {
        if let Storage::Rate(r) = &self.storage {
            r.observe(failed);
        }
    }

    fn skip(&self) {
        if let Storage::Rate(r) = &self.storage {
            r.skip();
        }
    }

    pub(crate) fn summarize(&self) -> MetricSummary {
        let values = match &self.storage {
            Storage::Counter(c) => MetricValues::Counter { value: c.get() },
            Storage::Rate(r) => r.summarize(),
            Storage::Trend(t) => MetricValues::Trend(t.summarize()),
        };
        MetricSummary {
            name: self.name.to_string(),
            kind: self.kind,
            values,
        }
    }
}

/// Cheaply cloneable writer for one named metric.
#[derive(Debug, Clone)]
pub struct MetricHandle {
    metric: Arc<Metric>,
}

impl MetricHandle {
    pub(crate) fn new(metric: Arc<Metric>) -> Self {
        Self { metric }
    }

    #[inline]
    pub fn add(&self, value: f64) {
        self.metric.add(value);
    }

    #[inline]
    pub fn observe(&self, failed: bool) {
        self.metric.observe(failed);
    }

    #[inline]
    pub fn skip(&self) {
        self.metric.skip();
    }

    pub fn kind(&self) -> MetricKind {
        self.metric.kind
    }

    pub fn name(&self) -> &str {
        &self.metric.name
    }
}
