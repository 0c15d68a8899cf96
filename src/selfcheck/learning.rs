//! Learning-progress assessment from iteration and accuracy metrics.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use super::metrics::{lookup_f64, MetricValue};
use super::{check_cancelled, require_identifier, SelfEvalError};

/// Where a learning activity stands and what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningAssessment {
    /// Completion fraction in `0.0..=1.0`.
    pub progress: f64,
    /// Confidence in the learned behavior, `0.0..=1.0`.
    pub confidence: f64,
    pub next_steps: Vec<String>,
}

/// Assess progress on a learning activity.
///
/// Progress comes from `completion_rate` when present, falling back to
/// `iteration_count / total_iterations`, then to zero. Confidence is the mean
/// of whichever of `accuracy`, `success_rate`, and `confidence_score` are
/// present; with none of them, it defaults to half the progress, reflecting
/// that unvalidated progress deserves limited trust.
pub fn assess_learning_progress(
    activity: &str,
    metrics: &HashMap<String, MetricValue>,
    cancel: Option<&AtomicBool>,
) -> Result<LearningAssessment, SelfEvalError> {
    check_cancelled(cancel)?;
    require_identifier("activity", activity)?;

    let progress = if let Some(rate) = lookup_f64(metrics, &["completion_rate", "completionRate"]) {
        rate.clamp(0.0, 1.0)
    } else {
        let iterations = lookup_f64(metrics, &["iteration_count", "iterationCount"]);
        let total = lookup_f64(metrics, &["total_iterations", "totalIterations"]);
        match (iterations, total) {
            (Some(done), Some(total)) if total > 0.0 => (done / total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    };

    let mut confidence_inputs: Vec<f64> = Vec::new();
    for keys in [
        &["accuracy"][..],
        &["success_rate", "successRate"][..],
        &["confidence_score", "confidenceScore"][..],
    ] {
        if let Some(v) = lookup_f64(metrics, keys) {
            confidence_inputs.push(v.clamp(0.0, 1.0));
        }
    }
    let confidence = if confidence_inputs.is_empty() {
        progress * 0.5
    } else {
        confidence_inputs.iter().sum::<f64>() / confidence_inputs.len() as f64
    };

    let mut next_steps = vec![next_step_for_progress(progress).to_string()];
    if confidence < 0.5 {
        next_steps.push(
            "Confidence is low; gather more validation data before advancing".to_string(),
        );
    }
    if let Some(er) = lookup_f64(metrics, &["error_rate", "errorRate"]) {
        if er > 0.1 {
            next_steps
                .push("Error rate above 10%; review recent failures before continuing".to_string());
        }
    }

    Ok(LearningAssessment {
        progress,
        confidence,
        next_steps,
    })
}

fn next_step_for_progress(progress: f64) -> &'static str {
    if progress < 0.25 {
        "Early stage: diversify the training examples to broaden coverage"
    } else if progress < 0.5 {
        "Begin validating learned behavior against held-out cases"
    } else if progress < 0.75 {
        "Focus practice on the edge cases current examples miss"
    } else if progress < 1.0 {
        "Run a comprehensive evaluation before closing the objective"
    } else {
        "Objective complete; monitor deployed performance for regressions"
    }
}
