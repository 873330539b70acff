use stampede_metrics::{MetricSummary, MetricValues};

use crate::error::{Error, Result};

/// Pass/fail objectives for one metric, as textual expressions, e.g.
/// `rate<0.1` or `p(95)<2000`.
#[derive(Debug, Clone)]
pub struct ThresholdSpec {
    pub metric: String,
    pub expressions: Vec<String>,
}

impl ThresholdSpec {
    pub fn new(metric: impl Into<String>, expressions: &[&str]) -> Self {
        Self {
            metric: metric.into(),
            expressions: expressions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThresholdOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

#[derive(Debug, Clone)]
enum ThresholdAgg {
    Avg,
    Min,
    Max,
    Count,
    Rate,
    P(u32),
}

#[derive(Debug, Clone)]
struct ThresholdExpr {
    agg: ThresholdAgg,
    op: ThresholdOp,
    value: f64,
}

/// A threshold whose expression parsed successfully at configuration time.
#[derive(Debug, Clone)]
pub struct CompiledThreshold {
    pub metric: String,
    pub expression: String,
    expr: ThresholdExpr,
}

#[derive(Debug, Clone)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
    /// Conjunction of all individual results.
    pub passed: bool,
}

pub(crate) fn compile_thresholds(specs: &[ThresholdSpec]) -> Result<Vec<CompiledThreshold>> {
    let mut out = Vec::new();
    for spec in specs {
        for raw in &spec.expressions {
            let expr = parse_threshold_expr(raw).map_err(|reason| Error::InvalidThreshold {
                metric: spec.metric.clone(),
                reason,
            })?;
            out.push(CompiledThreshold {
                metric: spec.metric.clone(),
                expression: raw.clone(),
                expr,
            });
        }
    }
    Ok(out)
}

fn parse_threshold_expr(raw: &str) -> std::result::Result<ThresholdExpr, String> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return Err("empty threshold".to_string());
    }

    // Two-character operators first so `<=` doesn't parse as `<`.
    let ops = [
        ("<=", ThresholdOp::Lte),
        (">=", ThresholdOp::Gte),
        ("==", ThresholdOp::Eq),
        ("<", ThresholdOp::Lt),
        (">", ThresholdOp::Gt),
    ];
    let (op_pos, op_len, op) = ops
        .iter()
        .find_map(|(tok, op)| s.find(tok).map(|pos| (pos, tok.len(), *op)))
        .ok_or_else(|| format!("missing operator: {raw}"))?;

    let (left, right_with_op) = s.split_at(op_pos);
    let right = &right_with_op[op_len..];
    if left.is_empty() || right.is_empty() {
        return Err(format!("malformed expression: {raw}"));
    }

    let agg = if left.eq_ignore_ascii_case("avg") {
        ThresholdAgg::Avg
    } else if left.eq_ignore_ascii_case("min") {
        ThresholdAgg::Min
    } else if left.eq_ignore_ascii_case("max") {
        ThresholdAgg::Max
    } else if left.eq_ignore_ascii_case("count") {
        ThresholdAgg::Count
    } else if left.eq_ignore_ascii_case("rate") {
        ThresholdAgg::Rate
    } else if let Some(inner) = left.strip_prefix("p(").and_then(|v| v.strip_suffix(')')) {
        let p: u32 = inner
            .parse()
            .map_err(|_| format!("invalid percentile: {raw}"))?;
        if !(1..=100).contains(&p) {
            return Err(format!("percentile out of range: {raw}"));
        }
        ThresholdAgg::P(p)
    } else {
        return Err(format!("unknown aggregation `{left}`: {raw}"));
    };

    let value: f64 = right
        .parse()
        .map_err(|_| format!("invalid numeric value: {raw}"))?;

    Ok(ThresholdExpr { agg, op, value })
}

/// Evaluate all compiled thresholds against a metrics snapshot. A
/// threshold whose metric is absent (or whose aggregation has no observed
/// value, e.g. a rate with zero samples) fails closed.
pub fn evaluate_thresholds(
    thresholds: &[CompiledThreshold],
    metrics: &[MetricSummary],
) -> ThresholdReport {
    let mut results = Vec::with_capacity(thresholds.len());
    let mut passed = true;

    for t in thresholds {
        let series = metrics.iter().find(|m| m.name == t.metric);
        let observed = series.and_then(|s| observed_value(s, &t.expr.agg));
        let ok = observed
            .map(|v| compare(v, t.expr.op, t.expr.value))
            .unwrap_or(false);
        passed &= ok;
        results.push(ThresholdResult {
            metric: t.metric.clone(),
            expression: t.expression.clone(),
            observed,
            passed: ok,
        });
    }

    ThresholdReport { results, passed }
}

fn compare(left: f64, op: ThresholdOp, right: f64) -> bool {
    match op {
        ThresholdOp::Lt => left < right,
        ThresholdOp::Lte => left <= right,
        ThresholdOp::Gt => left > right,
        ThresholdOp::Gte => left >= right,
        ThresholdOp::Eq => left == right,
    }
}

fn observed_value(series: &MetricSummary, agg: &ThresholdAgg) -> Option<f64> {
    match (&series.values, agg) {
        (MetricValues::Trend(t), ThresholdAgg::Avg) => t.mean,
        (MetricValues::Trend(t), ThresholdAgg::Min) => t.min,
        (MetricValues::Trend(t), ThresholdAgg::Max) => t.max,
        (MetricValues::Trend(t), ThresholdAgg::Count) => Some(t.count as f64),
        (MetricValues::Trend(t), ThresholdAgg::P(p)) => match *p {
            50 => t.p50,
            90 => t.p90,
            95 => t.p95,
            99 => t.p99,
            // Only the common percentiles are tracked.
            _ => None,
        },

        (MetricValues::Counter { value }, ThresholdAgg::Count) => Some(*value),
        (MetricValues::Counter { value }, ThresholdAgg::Avg) => Some(*value),

        (MetricValues::Rate { rate, .. }, ThresholdAgg::Rate) => *rate,
        (MetricValues::Rate { total, .. }, ThresholdAgg::Count) => Some(*total as f64),

        // Non-sensical combinations.
        (_, _) => None,
    }
}
