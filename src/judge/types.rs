//! Core types for oracle-backed response evaluation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Dimensions
// =============================================================================

/// A quality dimension the judge scores independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    FactualAccuracy,
    ReasoningQuality,
    Relevance,
    Completeness,
}

impl Dimension {
    /// All dimensions, in scoring order.
    pub const ALL: [Dimension; 4] = [
        Dimension::FactualAccuracy,
        Dimension::ReasoningQuality,
        Dimension::Relevance,
        Dimension::Completeness,
    ];

    /// Snake-case name, used for telemetry keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::FactualAccuracy => "factual_accuracy",
            Dimension::ReasoningQuality => "reasoning_quality",
            Dimension::Relevance => "relevance",
            Dimension::Completeness => "completeness",
        }
    }

    /// Human-readable name, used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::FactualAccuracy => "factual accuracy",
            Dimension::ReasoningQuality => "reasoning quality",
            Dimension::Relevance => "relevance",
            Dimension::Completeness => "completeness",
        }
    }

    /// What the judge should look for when scoring this dimension.
    pub fn criteria(&self) -> &'static str {
        match self {
            Dimension::FactualAccuracy => {
                "Are the factual claims in the response correct? Check names, dates, \
                 quantities, and causal claims against the prompt and any supporting \
                 context. Name each claim that is incorrect or unsupported in the \
                 justification. Penalize fabricated specifics."
            }
            Dimension::ReasoningQuality => {
                "Is the reasoning logically sound? Check that conclusions follow from \
                 stated premises, that steps are coherent and ordered, that competing \
                 perspectives offered in the prompt are weighed rather than ignored, \
                 and that no step contradicts another."
            }
            Dimension::Relevance => {
                "Does the response address what the prompt actually asks? Penalize \
                 tangents, filler, and answers to a different question."
            }
            Dimension::Completeness => {
                "Does the response cover every part of the prompt? Check multi-part \
                 questions for unanswered parts and penalize missing coverage."
            }
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative weight of each dimension in the aggregate score.
///
/// Defaults to equal weights. A dimension that failed to score never
/// contributes, whatever its weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionWeights {
    pub factual_accuracy: f64,
    pub reasoning_quality: f64,
    pub relevance: f64,
    pub completeness: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            factual_accuracy: 1.0,
            reasoning_quality: 1.0,
            relevance: 1.0,
            completeness: 1.0,
        }
    }
}

impl DimensionWeights {
    pub fn weight(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::FactualAccuracy => self.factual_accuracy,
            Dimension::ReasoningQuality => self.reasoning_quality,
            Dimension::Relevance => self.relevance,
            Dimension::Completeness => self.completeness,
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// A document supporting factual claims in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceDoc {
    pub title: String,
    pub source: String,
    pub content: String,
}

impl EvidenceDoc {
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            content: content.into(),
        }
    }
}

/// A labelled analysis of the query from one angle, fed to the
/// reasoning-quality judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perspective {
    pub label: String,
    pub analysis: String,
}

impl Perspective {
    pub fn new(label: impl Into<String>, analysis: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            analysis: analysis.into(),
        }
    }
}

/// One response to evaluate, with whatever context came with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// The prompt the response answers.
    pub query: String,
    /// The response under evaluation.
    pub candidate_response: String,
    /// Supporting documents, consulted by the factual-accuracy judge.
    pub evidence: Vec<EvidenceDoc>,
    /// Prior analyses, consulted by the reasoning-quality judge.
    pub perspectives: Vec<Perspective>,
}

impl EvaluationRequest {
    pub fn new(query: impl Into<String>, candidate_response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            candidate_response: candidate_response.into(),
            evidence: Vec::new(),
            perspectives: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceDoc>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_perspectives(mut self, perspectives: Vec<Perspective>) -> Self {
        self.perspectives = perspectives;
        self
    }
}

// =============================================================================
// Options
// =============================================================================

/// Tuning knobs for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Judge model, provider-prefixed (e.g. "openai/gpt-4o-mini").
    pub model: String,
    /// How many dimension calls run at once.
    pub concurrency: usize,
    pub weights: DimensionWeights,
    /// How many evidence docs the revision prompt includes.
    pub max_evidence_docs: usize,
    /// Per-document character cap for revision prompt context.
    pub evidence_char_cap: usize,
    /// Upper bound on refinement rounds.
    pub max_refine_iterations: u32,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".to_string(),
            concurrency: Dimension::ALL.len(),
            weights: DimensionWeights::default(),
            max_evidence_docs: 4,
            evidence_char_cap: 4_000,
            max_refine_iterations: 2,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// One dimension's verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: Dimension,
    /// Always within `0.0..=1.0`.
    pub score: f64,
    /// The judge's full free-text output.
    pub rationale: String,
}

impl DimensionScore {
    /// Construct with the score clamped into range.
    pub fn new(dimension: Dimension, score: f64, rationale: impl Into<String>) -> Self {
        Self {
            dimension,
            score: score.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }
}

/// A dimension whose oracle call failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionFailure {
    pub dimension: Dimension,
    pub error: String,
}

/// The composite verdict over all attempted dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeEvaluation {
    /// Correlates every oracle call made for this evaluation.
    pub request_id: Uuid,
    pub dimension_scores: Vec<DimensionScore>,
    /// Weighted mean over the dimensions that scored; `None` when none did.
    pub aggregate_score: Option<f64>,
    pub recommendations: Vec<String>,
    pub attempted_dimensions: usize,
    pub failed_dimensions: Vec<DimensionFailure>,
    pub duration: Duration,
}

impl CompositeEvaluation {
    /// True when at least one dimension failed to score.
    pub fn is_partial(&self) -> bool {
        !self.failed_dimensions.is_empty()
    }

    /// Score for one dimension, if it was scored.
    pub fn score_for(&self, dimension: Dimension) -> Option<f64> {
        self.dimension_scores
            .iter()
            .find(|s| s.dimension == dimension)
            .map(|s| s.score)
    }
}

/// A feedback-conditioned rewrite of the candidate response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedResponse {
    pub text: String,
    /// Oracle latency for the revision call.
    pub latency: Duration,
}

/// One round of the refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineIteration {
    /// 1-based round index.
    pub iteration: u32,
    /// Aggregate score of this round's revision.
    pub aggregate_score: f64,
    /// Change versus the best score before this round.
    pub delta: f64,
    /// Whether this revision became the new best text.
    pub accepted: bool,
}

/// Outcome of the bounded refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineReport {
    /// Best-scoring text seen, possibly the original response.
    pub best_text: String,
    pub best_score: f64,
    /// Aggregate score of the original response.
    pub baseline_score: f64,
    pub iterations: Vec<RefineIteration>,
}
