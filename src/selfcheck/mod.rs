//! Oracle-free self-assessment: pure, synchronous heuristics over metric
//! bundles.
//!
//! Nothing here talks to a model. Every operation is deterministic over its
//! inputs, checks its cancellation flag before doing any work, and degrades
//! to a documented baseline on thin input instead of erroring. Only a missing
//! identifier or a tripped cancel flag is an error.

pub mod behavior;
pub mod insights;
pub mod learning;
pub mod metrics;
pub mod performance;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

pub use behavior::validate_behavior;
pub use insights::{generate_insights, InsightReport, MetricPattern, PatternKind};
pub use learning::{assess_learning_progress, LearningAssessment};
pub use metrics::MetricValue;
pub use performance::{
    evaluate_performance, AssessmentBand, PerformanceAssessment, ALL_HEALTHY_RECOMMENDATION,
    NO_DATA_RECOMMENDATION,
};

/// Errors from the self-assessment path.
#[derive(Debug, Error)]
pub enum SelfEvalError {
    /// A required identifier argument was empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's cancel flag was set before work started.
    #[error("cancelled")]
    Cancelled,
}

pub(crate) fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<(), SelfEvalError> {
    if let Some(flag) = cancel {
        if flag.load(Ordering::Relaxed) {
            return Err(SelfEvalError::Cancelled);
        }
    }
    Ok(())
}

pub(crate) fn require_identifier(name: &'static str, value: &str) -> Result<(), SelfEvalError> {
    if value.trim().is_empty() {
        return Err(SelfEvalError::InvalidArgument(format!(
            "{name} must not be empty"
        )));
    }
    Ok(())
}

/// The self-assessment strategy.
///
/// One trait carries all four operations so deployments swap the whole
/// strategy at once; [`HeuristicSelfAssessor`] is the shipped implementation
/// and the `Judge` facade takes any implementation at construction.
pub trait SelfAssessor: Send + Sync {
    fn evaluate_performance(
        &self,
        component: &str,
        metrics: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<PerformanceAssessment, SelfEvalError>;

    fn assess_learning_progress(
        &self,
        activity: &str,
        metrics: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<LearningAssessment, SelfEvalError>;

    fn generate_insights(
        &self,
        topic: &str,
        data: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<InsightReport, SelfEvalError>;

    fn validate_behavior(
        &self,
        component: &str,
        observed: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<bool, SelfEvalError>;
}

/// The shipped strategy: formula-driven, no external calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSelfAssessor;

impl SelfAssessor for HeuristicSelfAssessor {
    fn evaluate_performance(
        &self,
        component: &str,
        metrics: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<PerformanceAssessment, SelfEvalError> {
        performance::evaluate_performance(component, metrics, cancel)
    }

    fn assess_learning_progress(
        &self,
        activity: &str,
        metrics: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<LearningAssessment, SelfEvalError> {
        learning::assess_learning_progress(activity, metrics, cancel)
    }

    fn generate_insights(
        &self,
        topic: &str,
        data: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<InsightReport, SelfEvalError> {
        insights::generate_insights(topic, data, cancel)
    }

    fn validate_behavior(
        &self,
        component: &str,
        observed: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<bool, SelfEvalError> {
        behavior::validate_behavior(component, observed, cancel)
    }
}
