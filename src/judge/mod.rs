//! Oracle-backed evaluation: per-dimension judging, composite verdicts, and
//! feedback-driven refinement.
//!
//! The pipeline runs leaves-first: each [`Dimension`] gets one oracle call
//! ([`dimension::evaluate_dimension`]), the scored subset aggregates into a
//! [`CompositeEvaluation`] ([`composite`]), and the verdict can condition a
//! rewrite ([`refine`]). Per-dimension failures shrink the composite instead
//! of aborting it; only a total wipeout is an error.

pub mod composite;
pub mod dimension;
pub mod extract;
pub mod refine;
pub mod types;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::oracle::{Oracle, OracleError, TelemetrySink};
use crate::selfcheck::{
    HeuristicSelfAssessor, InsightReport, LearningAssessment, MetricValue, PerformanceAssessment,
    SelfAssessor, SelfEvalError,
};

pub use composite::{aggregate, parse_recommendations};
pub use dimension::evaluate_dimension;
pub use extract::extract_score;
pub use refine::{improve, refine_loop};
pub use types::{
    CompositeEvaluation, Dimension, DimensionFailure, DimensionScore, DimensionWeights,
    EvalOptions, EvaluationRequest, EvidenceDoc, Perspective, RefineIteration, RefineReport,
    RefinedResponse,
};

// =============================================================================
// Errors
// =============================================================================

/// Errors from the oracle-backed evaluation path.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// An oracle call failed where no fallback applies.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Every dimension call failed; there is no score to aggregate.
    #[error("all {} dimension evaluations failed", .failures.len())]
    AllDimensionsFailed { failures: Vec<DimensionFailure> },

    /// The request violates the evaluation contract.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// =============================================================================
// Evaluation orchestration
// =============================================================================

/// Judge the candidate response along every dimension and aggregate.
///
/// Dimension calls fan out concurrently (bounded by `options.concurrency`).
/// A failed dimension is recorded in `failed_dimensions` and excluded from
/// the aggregate; the call errors only when no dimension scored at all. The
/// recommendation call is best-effort: if it fails, the verdict ships with an
/// empty list.
pub async fn evaluate(
    oracle: &dyn Oracle,
    telemetry: &dyn TelemetrySink,
    request: &EvaluationRequest,
    options: &EvalOptions,
) -> Result<CompositeEvaluation, EvalError> {
    if request.query.trim().is_empty() {
        return Err(EvalError::InvalidRequest("query must not be empty".into()));
    }
    if request.candidate_response.trim().is_empty() {
        return Err(EvalError::InvalidRequest(
            "candidate_response must not be empty".into(),
        ));
    }

    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let mut results: Vec<(Dimension, Result<DimensionScore, OracleError>)> =
        stream::iter(Dimension::ALL.map(|dim| async move {
            let result =
                evaluate_dimension(oracle, telemetry, dim, request, options, request_id).await;
            (dim, result)
        }))
        .buffer_unordered(options.concurrency.max(1))
        .collect()
        .await;

    // Restore scoring order; buffer_unordered yields completion order.
    let mut scores: Vec<DimensionScore> = Vec::new();
    let mut failures: Vec<DimensionFailure> = Vec::new();
    for dim in Dimension::ALL {
        if let Some(pos) = results.iter().position(|(d, _)| *d == dim) {
            match results.swap_remove(pos).1 {
                Ok(score) => scores.push(score),
                Err(err) => {
                    warn!(dimension = %dim, error = %err, "dimension evaluation failed");
                    failures.push(DimensionFailure {
                        dimension: dim,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    if scores.is_empty() {
        return Err(EvalError::AllDimensionsFailed { failures });
    }

    let aggregate_score = aggregate(&scores, &options.weights);
    if let Some(agg) = aggregate_score {
        telemetry.emit_score("judge.aggregate.score", agg);
    }

    let recommendations =
        match composite::generate_recommendations(oracle, request, &scores, options, request_id)
            .await
        {
            Ok(recs) => recs,
            Err(err) => {
                warn!(error = %err, "recommendation call failed, shipping without suggestions");
                Vec::new()
            }
        };

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        aggregate = aggregate_score.unwrap_or(0.0),
        scored = scores.len(),
        failed = failures.len(),
        duration_ms = duration.as_millis() as u64,
        "evaluation complete"
    );

    Ok(CompositeEvaluation {
        request_id,
        dimension_scores: scores,
        aggregate_score,
        recommendations,
        attempted_dimensions: Dimension::ALL.len(),
        failed_dimensions: failures,
        duration,
    })
}

// =============================================================================
// Facade
// =============================================================================

/// One handle over both evaluation paths: the oracle-backed judge and the
/// oracle-free self-assessment strategy.
///
/// The self-assessment strategy is injected at construction, so deployments
/// can swap the heuristic implementation without touching the judge.
pub struct Judge {
    oracle: Arc<dyn Oracle>,
    telemetry: Arc<dyn TelemetrySink>,
    self_assessor: Arc<dyn SelfAssessor>,
    options: EvalOptions,
}

impl Judge {
    pub fn new(oracle: Arc<dyn Oracle>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            oracle,
            telemetry,
            self_assessor: Arc::new(HeuristicSelfAssessor::default()),
            options: EvalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_self_assessor(mut self, assessor: Arc<dyn SelfAssessor>) -> Self {
        self.self_assessor = assessor;
        self
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub async fn evaluate(
        &self,
        request: &EvaluationRequest,
    ) -> Result<CompositeEvaluation, EvalError> {
        evaluate(
            self.oracle.as_ref(),
            self.telemetry.as_ref(),
            request,
            &self.options,
        )
        .await
    }

    pub async fn improve(
        &self,
        request: &EvaluationRequest,
        evaluation: &CompositeEvaluation,
    ) -> Result<RefinedResponse, EvalError> {
        improve(self.oracle.as_ref(), request, evaluation, &self.options).await
    }

    pub async fn refine_loop(
        &self,
        request: &EvaluationRequest,
    ) -> Result<RefineReport, EvalError> {
        refine_loop(
            self.oracle.as_ref(),
            self.telemetry.as_ref(),
            request,
            &self.options,
        )
        .await
    }

    pub fn evaluate_performance(
        &self,
        component: &str,
        metrics: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<PerformanceAssessment, SelfEvalError> {
        self.self_assessor
            .evaluate_performance(component, metrics, cancel)
    }

    pub fn assess_learning_progress(
        &self,
        activity: &str,
        metrics: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<LearningAssessment, SelfEvalError> {
        self.self_assessor
            .assess_learning_progress(activity, metrics, cancel)
    }

    pub fn generate_insights(
        &self,
        topic: &str,
        data: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<InsightReport, SelfEvalError> {
        self.self_assessor.generate_insights(topic, data, cancel)
    }

    pub fn validate_behavior(
        &self,
        component: &str,
        observed: &HashMap<String, MetricValue>,
        cancel: Option<&AtomicBool>,
    ) -> Result<bool, SelfEvalError> {
        self.self_assessor
            .validate_behavior(component, observed, cancel)
    }
}
