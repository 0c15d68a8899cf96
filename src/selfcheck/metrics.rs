//! Metric values and recognized-key lookup for self-assessment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single observed metric.
///
/// Maps of these are the input to every self-assessment operation. The
/// untagged serde form means JSON metric bundles deserialize naturally:
/// numbers, strings, booleans, and nulls all land in the right variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Flag(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Null,
}

impl MetricValue {
    /// Numeric view of this value, if it has one.
    ///
    /// Integers and finite floats convert directly; text converts when it
    /// parses as a finite number. Flags and nulls are not magnitudes and
    /// return `None`, as do NaN and infinities.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(v) if v.is_finite() => Some(*v),
            MetricValue::Float(_) => None,
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            MetricValue::Flag(_) | MetricValue::Null => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}

impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Flag(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}

/// Numeric value for the first present key among `keys`.
///
/// Multi-word metrics are recognized under both snake_case and camelCase
/// names, so bundles produced by foreign telemetry pipelines work unchanged.
pub(crate) fn lookup_f64(metrics: &HashMap<String, MetricValue>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| metrics.get(*k))
        .and_then(MetricValue::as_f64)
}

/// All numeric-convertible entries, sorted by key for deterministic analysis.
pub(crate) fn numeric_entries(metrics: &HashMap<String, MetricValue>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = metrics
        .iter()
        .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}
