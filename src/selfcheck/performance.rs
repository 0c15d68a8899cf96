//! Operational performance assessment from a metric bundle.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::metrics::{lookup_f64, MetricValue};
use super::{check_cancelled, require_identifier, SelfEvalError};

/// Recommendation attached when no recognized metric is present.
pub const NO_DATA_RECOMMENDATION: &str =
    "No recognized performance metrics provided; instrument the component and re-evaluate";

/// Recommendation attached when the band is optimal and no metric was weak.
pub const ALL_HEALTHY_RECOMMENDATION: &str =
    "All tracked metrics are healthy; maintain current operating parameters";

/// Qualitative band for a composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentBand {
    Optimal,
    Good,
    Acceptable,
    Degraded,
    Critical,
}

impl AssessmentBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            AssessmentBand::Optimal
        } else if score >= 0.75 {
            AssessmentBand::Good
        } else if score >= 0.5 {
            AssessmentBand::Acceptable
        } else if score >= 0.25 {
            AssessmentBand::Degraded
        } else {
            AssessmentBand::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentBand::Optimal => "optimal",
            AssessmentBand::Good => "good",
            AssessmentBand::Acceptable => "acceptable",
            AssessmentBand::Degraded => "degraded",
            AssessmentBand::Critical => "critical",
        }
    }
}

impl std::fmt::Display for AssessmentBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict over a component's operational metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAssessment {
    /// Mean of the recognized sub-scores; 0.5 when none were present.
    pub composite_score: f64,
    pub band: AssessmentBand,
    pub recommendations: Vec<String>,
    /// How many recognized metrics contributed. Zero means the composite is
    /// the neutral baseline, not a measurement.
    pub evaluated_metric_count: usize,
}

/// Score a component's operational health from whichever recognized metrics
/// are present.
///
/// Recognized metrics and their sub-score formulas:
/// - `latency` (ms): `1 - latency/1000`, clamped
/// - `error_rate`: `1 - error_rate`, clamped
/// - `success_rate`: clamped as-is
/// - `throughput` (per second): `throughput/100`, capped at 1
/// - `memory_usage` (fraction): `1 - memory_usage`, clamped
/// - `cpu_usage` (fraction): `1 - cpu_usage`, clamped
/// - `accuracy`: clamped as-is
///
/// The composite is the plain mean over present sub-scores. Weak metrics each
/// contribute one recommendation; an optimal band with no weak metrics gets a
/// single affirming one instead. An empty or unrecognized bundle yields the
/// neutral 0.5 baseline with `evaluated_metric_count == 0`.
pub fn evaluate_performance(
    component: &str,
    metrics: &HashMap<String, MetricValue>,
    cancel: Option<&AtomicBool>,
) -> Result<PerformanceAssessment, SelfEvalError> {
    check_cancelled(cancel)?;
    require_identifier("component", component)?;

    let mut sub_scores: Vec<f64> = Vec::new();
    let mut recommendations: Vec<String> = Vec::new();

    if let Some(ms) = lookup_f64(metrics, &["latency"]) {
        let score = (1.0 - ms / 1000.0).clamp(0.0, 1.0);
        sub_scores.push(score);
        if score < 0.5 {
            recommendations.push(format!(
                "Reduce latency: {ms:.0} ms average exceeds the 500 ms threshold"
            ));
        }
    }

    if let Some(er) = lookup_f64(metrics, &["error_rate", "errorRate"]) {
        sub_scores.push((1.0 - er).clamp(0.0, 1.0));
        if er > 0.05 {
            recommendations.push(format!(
                "Reduce error rate: {:.1}% of operations fail",
                er * 100.0
            ));
        }
    }

    if let Some(sr) = lookup_f64(metrics, &["success_rate", "successRate"]) {
        sub_scores.push(sr.clamp(0.0, 1.0));
        if sr < 0.95 {
            recommendations.push(format!(
                "Raise success rate: {:.1}% is below the 95% target",
                sr * 100.0
            ));
        }
    }

    if let Some(t) = lookup_f64(metrics, &["throughput"]) {
        let score = (t / 100.0).clamp(0.0, 1.0);
        sub_scores.push(score);
        if score < 0.5 {
            recommendations.push(format!(
                "Increase throughput: {t:.0}/s is below the 50/s target"
            ));
        }
    }

    if let Some(mu) = lookup_f64(metrics, &["memory_usage", "memoryUsage"]) {
        sub_scores.push((1.0 - mu).clamp(0.0, 1.0));
        if mu > 0.8 {
            recommendations.push(format!(
                "Reduce memory usage: {:.0}% utilization exceeds 80%",
                mu * 100.0
            ));
        }
    }

    if let Some(cu) = lookup_f64(metrics, &["cpu_usage", "cpuUsage"]) {
        sub_scores.push((1.0 - cu).clamp(0.0, 1.0));
        if cu > 0.85 {
            recommendations.push(format!(
                "Reduce CPU usage: {:.0}% utilization exceeds 85%",
                cu * 100.0
            ));
        }
    }

    if let Some(a) = lookup_f64(metrics, &["accuracy"]) {
        sub_scores.push(a.clamp(0.0, 1.0));
        if a < 0.9 {
            recommendations.push(format!("Improve accuracy: {a:.2} is below the 0.90 target"));
        }
    }

    let evaluated_metric_count = sub_scores.len();
    let composite_score = if sub_scores.is_empty() {
        debug!(component, "no recognized performance metrics, using neutral baseline");
        recommendations.push(NO_DATA_RECOMMENDATION.to_string());
        0.5
    } else {
        sub_scores.iter().sum::<f64>() / sub_scores.len() as f64
    };

    let band = AssessmentBand::from_score(composite_score);
    if band == AssessmentBand::Optimal && recommendations.is_empty() {
        recommendations.push(ALL_HEALTHY_RECOMMENDATION.to_string());
    }

    Ok(PerformanceAssessment {
        composite_score,
        band,
        recommendations,
        evaluated_metric_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(entries: &[(&str, MetricValue)]) -> HashMap<String, MetricValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn healthy_bundle_is_optimal() {
        let m = metrics(&[
            ("latency", MetricValue::Int(50)),
            ("error_rate", MetricValue::Float(0.01)),
            ("success_rate", MetricValue::Float(0.99)),
        ]);
        let a = evaluate_performance("api", &m, None).unwrap();
        // sub-scores: 0.95, 0.99, 0.99
        assert!((a.composite_score - (0.95 + 0.99 + 0.99) / 3.0).abs() < 1e-9);
        assert_eq!(a.band, AssessmentBand::Optimal);
        assert_eq!(a.evaluated_metric_count, 3);
        assert_eq!(a.recommendations, vec![ALL_HEALTHY_RECOMMENDATION]);
    }

    #[test]
    fn slow_and_failing_bundle_is_degraded() {
        let m = metrics(&[
            ("latency", MetricValue::Int(1200)),
            ("error_rate", MetricValue::Float(0.2)),
        ]);
        let a = evaluate_performance("worker", &m, None).unwrap();
        // sub-scores: 0.0 (clamped), 0.8
        assert!((a.composite_score - 0.4).abs() < 1e-9);
        assert_eq!(a.band, AssessmentBand::Degraded);
        assert_eq!(a.recommendations.len(), 2);
        assert!(a.recommendations[0].contains("latency"));
        assert!(a.recommendations[1].contains("error rate"));
    }

    #[test]
    fn empty_bundle_is_neutral_baseline() {
        let a = evaluate_performance("api", &HashMap::new(), None).unwrap();
        assert_eq!(a.composite_score, 0.5);
        assert_eq!(a.band, AssessmentBand::Acceptable);
        assert_eq!(a.evaluated_metric_count, 0);
        assert_eq!(a.recommendations, vec![NO_DATA_RECOMMENDATION.to_string()]);
    }

    #[test]
    fn unrecognized_keys_count_as_no_data() {
        let m = metrics(&[("queue_depth", MetricValue::Int(3))]);
        let a = evaluate_performance("api", &m, None).unwrap();
        assert_eq!(a.evaluated_metric_count, 0);
        assert_eq!(a.composite_score, 0.5);
    }

    #[test]
    fn camel_case_aliases_recognized() {
        let m = metrics(&[
            ("errorRate", MetricValue::Float(0.01)),
            ("successRate", MetricValue::Float(0.99)),
            ("memoryUsage", MetricValue::Float(0.5)),
            ("cpuUsage", MetricValue::Float(0.5)),
        ]);
        let a = evaluate_performance("api", &m, None).unwrap();
        assert_eq!(a.evaluated_metric_count, 4);
    }

    #[test]
    fn text_metrics_coerce() {
        let m = metrics(&[("latency", MetricValue::Text("250".into()))]);
        let a = evaluate_performance("api", &m, None).unwrap();
        assert_eq!(a.evaluated_metric_count, 1);
        assert!((a.composite_score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn throughput_and_resource_recommendations() {
        let m = metrics(&[
            ("throughput", MetricValue::Int(20)),
            ("memory_usage", MetricValue::Float(0.9)),
            ("cpu_usage", MetricValue::Float(0.95)),
            ("accuracy", MetricValue::Float(0.8)),
        ]);
        let a = evaluate_performance("pipeline", &m, None).unwrap();
        assert_eq!(a.evaluated_metric_count, 4);
        assert_eq!(a.recommendations.len(), 4);
        assert!(a.recommendations.iter().any(|r| r.contains("throughput")));
        assert!(a.recommendations.iter().any(|r| r.contains("memory")));
        assert!(a.recommendations.iter().any(|r| r.contains("CPU")));
        assert!(a.recommendations.iter().any(|r| r.contains("accuracy")));
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(AssessmentBand::from_score(0.9), AssessmentBand::Optimal);
        assert_eq!(AssessmentBand::from_score(0.75), AssessmentBand::Good);
        assert_eq!(AssessmentBand::from_score(0.5), AssessmentBand::Acceptable);
        assert_eq!(AssessmentBand::from_score(0.25), AssessmentBand::Degraded);
        assert_eq!(AssessmentBand::from_score(0.249), AssessmentBand::Critical);
        assert_eq!(AssessmentBand::from_score(0.0), AssessmentBand::Critical);
    }

    #[test]
    fn empty_component_rejected() {
        let err = evaluate_performance("  ", &HashMap::new(), None).unwrap_err();
        assert!(matches!(err, SelfEvalError::InvalidArgument(_)));
    }
}
