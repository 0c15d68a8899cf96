//! Statistical insight generation over arbitrary metric bundles.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::metrics::{numeric_entries, MetricValue};
use super::{check_cancelled, require_identifier, SelfEvalError};

/// Outliers sit at or beyond this many standard deviations from the mean.
const OUTLIER_SIGMA: f64 = 2.0;

/// Kind of anomaly detected across a metric bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    HighVariance,
    Outlier,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::HighVariance => "high_variance",
            PatternKind::Outlier => "outlier",
        }
    }
}

/// One detected anomaly and the metrics involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPattern {
    pub kind: PatternKind,
    pub description: String,
    pub affected_metrics: Vec<String>,
}

/// Descriptive statistics and anomalies for a metric bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub key_insights: Vec<String>,
    pub patterns: Vec<MetricPattern>,
    pub recommendations: Vec<String>,
}

/// Summarize a metric bundle: central tendency, extremes, spread, and
/// outliers.
///
/// Only numeric-convertible values are analyzed; the rest are counted. The
/// depth of analysis scales with how many numeric values are present: one
/// gives mean and extremes, two adds spread, three or more adds the
/// standard-deviation outlier scan. An empty bundle degrades to an
/// "insufficient data" report rather than an error.
pub fn generate_insights(
    topic: &str,
    data: &HashMap<String, MetricValue>,
    cancel: Option<&AtomicBool>,
) -> Result<InsightReport, SelfEvalError> {
    check_cancelled(cancel)?;
    require_identifier("topic", topic)?;

    let numeric = numeric_entries(data);
    let non_numeric_count = data.len() - numeric.len();

    let mut key_insights: Vec<String> = Vec::new();
    let mut patterns: Vec<MetricPattern> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    if data.is_empty() {
        debug!(topic, "empty metric bundle, no insights to generate");
        return Ok(InsightReport {
            key_insights: vec!["Insufficient data to generate insights".to_string()],
            patterns,
            recommendations: vec!["Collect more metric data for analysis".to_string()],
        });
    }

    if let Some(stats) = Stats::over(&numeric) {
        key_insights.push(format!(
            "Average across {} numeric metrics: {:.2}",
            numeric.len(),
            stats.mean
        ));
        key_insights.push(format!(
            "Highest metric: {} ({:.2})",
            stats.max_key, stats.max
        ));
        key_insights.push(format!(
            "Lowest metric: {} ({:.2})",
            stats.min_key, stats.min
        ));

        if numeric.len() >= 2 {
            let spread = stats.max - stats.min;
            key_insights.push(format!("Spread between extremes: {spread:.2}"));

            if stats.mean > 0.0 && spread > 0.5 * stats.mean {
                patterns.push(MetricPattern {
                    kind: PatternKind::HighVariance,
                    description: format!(
                        "Metric values span {:.2}, more than half the mean of {:.2}",
                        spread, stats.mean
                    ),
                    affected_metrics: vec![stats.min_key.clone(), stats.max_key.clone()],
                });
                recommendations.push(format!(
                    "Investigate the gap between {} and {}",
                    stats.min_key, stats.max_key
                ));
            }
        }

        if numeric.len() >= 3 && stats.stddev > 0.0 {
            // Boundary values count as outliers; the tolerance absorbs float
            // rounding in the variance accumulation.
            let threshold = OUTLIER_SIGMA * stats.stddev * (1.0 - 1e-12);
            let outliers: Vec<String> = numeric
                .iter()
                .filter(|(_, v)| (v - stats.mean).abs() >= threshold)
                .map(|(k, _)| k.clone())
                .collect();

            if !outliers.is_empty() {
                patterns.push(MetricPattern {
                    kind: PatternKind::Outlier,
                    description: format!(
                        "{} of {} metrics deviate at least two standard deviations from the mean",
                        outliers.len(),
                        numeric.len()
                    ),
                    affected_metrics: outliers.clone(),
                });
                recommendations.push(format!(
                    "Investigate outlier metrics: {}",
                    outliers.join(", ")
                ));
            }
        }
    }

    if non_numeric_count > 0 {
        key_insights.push(format!("{non_numeric_count} non-numeric metrics recorded"));
    }

    if key_insights.is_empty() {
        key_insights.push("Insufficient data to generate insights".to_string());
    }

    Ok(InsightReport {
        key_insights,
        patterns,
        recommendations,
    })
}

struct Stats {
    mean: f64,
    min: f64,
    min_key: String,
    max: f64,
    max_key: String,
    /// Population standard deviation.
    stddev: f64,
}

impl Stats {
    /// Entries must be sorted by key; ties on value resolve to the first key.
    fn over(entries: &[(String, f64)]) -> Option<Stats> {
        let (first_key, first) = entries.first()?;
        let mean = entries.iter().map(|(_, v)| v).sum::<f64>() / entries.len() as f64;

        let mut min = *first;
        let mut min_key = first_key.clone();
        let mut max = *first;
        let mut max_key = first_key.clone();
        for (k, v) in &entries[1..] {
            if *v < min {
                min = *v;
                min_key = k.clone();
            }
            if *v > max {
                max = *v;
                max_key = k.clone();
            }
        }

        let variance =
            entries.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / entries.len() as f64;

        Some(Stats {
            mean,
            min,
            min_key,
            max,
            max_key,
            stddev: variance.sqrt(),
        })
    }
}
