use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use stampede_metrics::{MetricSummary, MetricValues, TrendValues};

use crate::summary::RunSummary;
use crate::thresholds::ThresholdResult;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to encode summary: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write summary: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    run_duration_ms: u128,
    passed: bool,
    metrics: BTreeMap<&'a str, JsonMetric>,
    thresholds: Vec<JsonThreshold<'a>>,
    counters: &'a BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct JsonMetric {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    values: JsonMetricValues,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JsonMetricValues {
    Counter {
        value: f64,
    },
    Rate {
        total: u64,
        failures: u64,
        skipped: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate: Option<f64>,
    },
    Trend {
        count: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mean: Option<f64>,
        #[serde(rename = "p(50)", skip_serializing_if = "Option::is_none")]
        p50: Option<f64>,
        #[serde(rename = "p(90)", skip_serializing_if = "Option::is_none")]
        p90: Option<f64>,
        #[serde(rename = "p(95)", skip_serializing_if = "Option::is_none")]
        p95: Option<f64>,
        #[serde(rename = "p(99)", skip_serializing_if = "Option::is_none")]
        p99: Option<f64>,
    },
}

#[derive(Debug, Serialize)]
struct JsonThreshold<'a> {
    metric: &'a str,
    expression: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed: Option<f64>,
    passed: bool,
}

fn json_metric(summary: &MetricSummary) -> JsonMetric {
    let values = match &summary.values {
        MetricValues::Counter { value } => JsonMetricValues::Counter { value: *value },
        MetricValues::Rate {
            total,
            failures,
            skipped,
            rate,
        } => JsonMetricValues::Rate {
            total: *total,
            failures: *failures,
            skipped: *skipped,
            rate: *rate,
        },
        MetricValues::Trend(TrendValues {
            count,
            min,
            max,
            mean,
            p50,
            p90,
            p95,
            p99,
        }) => JsonMetricValues::Trend {
            count: *count,
            min: *min,
            max: *max,
            mean: *mean,
            p50: *p50,
            p90: *p90,
            p95: *p95,
            p99: *p99,
        },
    };
    JsonMetric {
        kind: summary.kind.to_string(),
        values,
    }
}

fn json_threshold(result: &ThresholdResult) -> JsonThreshold<'_> {
    JsonThreshold {
        metric: &result.metric,
        expression: &result.expression,
        observed: result.observed,
        passed: result.passed,
    }
}

/// Render the machine-readable summary artifact as pretty-printed JSON.
pub fn render_summary(summary: &RunSummary) -> Result<String, ReportError> {
    let doc = JsonSummary {
        run_duration_ms: summary.run_duration.as_millis(),
        passed: summary.passed(),
        metrics: summary
            .metrics
            .iter()
            .map(|m| (m.name.as_str(), json_metric(m)))
            .collect(),
        thresholds: summary.thresholds.results.iter().map(json_threshold).collect(),
        counters: &summary.counters,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Write the summary artifact to `path`. The document is encoded in full
/// before any bytes hit the file, so a serialization failure never leaves
/// a truncated artifact behind.
pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let rendered = render_summary(summary)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(rendered.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
