//! Single-dimension judging: one oracle call, one score.

use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use crate::oracle::{Attribution, CompletionRequest, Oracle, OracleError, TelemetrySink};
use crate::prompts::DIMENSION_PROMPT;

use super::extract::extract_score;
use super::types::{Dimension, DimensionScore, EvalOptions, EvaluationRequest};

// =============================================================================
// Constants
// =============================================================================

/// Judges run cold so repeated evaluations agree.
pub const JUDGE_TEMPERATURE: f32 = 0.0;

/// Hard cap on generation for a dimension judgement.
///
/// Keeps responses inside the small score-plus-justification schema.
pub const JUDGE_MAX_OUTPUT_TOKENS_DEFAULT: u32 = 256;
pub const JUDGE_MAX_OUTPUT_TOKENS_GPT5: u32 = 768;

pub fn judge_max_output_tokens(model: &str) -> u32 {
    // GPT-5 family tends to spend ~128 tokens on internal reasoning before emitting any
    // visible output; a tight cap can yield empty `content` on OpenRouter.
    if model.starts_with("openai/gpt-5") {
        JUDGE_MAX_OUTPUT_TOKENS_GPT5
    } else {
        JUDGE_MAX_OUTPUT_TOKENS_DEFAULT
    }
}

// =============================================================================
// Supporting context
// =============================================================================

/// Context the judge sees for one dimension.
///
/// Factual accuracy is judged against the evidence; reasoning quality against
/// the collected perspectives; relevance and completeness against the prompt
/// alone.
pub(crate) fn supporting_context(
    dimension: Dimension,
    request: &EvaluationRequest,
) -> Option<String> {
    match dimension {
        Dimension::FactualAccuracy => {
            if request.evidence.is_empty() {
                return None;
            }
            let docs: Vec<String> = request
                .evidence
                .iter()
                .map(|d| format!("{} ({}):\n{}", d.title, d.source, d.content))
                .collect();
            Some(docs.join("\n\n"))
        }
        Dimension::ReasoningQuality => {
            if request.perspectives.is_empty() {
                return None;
            }
            let lines: Vec<String> = request
                .perspectives
                .iter()
                .map(|p| format!("{}: {}", p.label, p.analysis))
                .collect();
            Some(lines.join("\n"))
        }
        Dimension::Relevance | Dimension::Completeness => None,
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Judge one dimension of the candidate response.
///
/// The oracle's whole free-text output becomes the rationale; the score is
/// scraped out of it. Oracle errors propagate to the caller, which decides
/// whether the composite can absorb the gap.
pub async fn evaluate_dimension(
    oracle: &dyn Oracle,
    telemetry: &dyn TelemetrySink,
    dimension: Dimension,
    request: &EvaluationRequest,
    options: &EvalOptions,
    request_id: Uuid,
) -> Result<DimensionScore, OracleError> {
    let context = supporting_context(dimension, request);

    let prompt = DIMENSION_PROMPT.render(
        &[
            ("dimension_name", dimension.label()),
            ("criteria", dimension.criteria()),
            ("prompt", &request.query),
            ("response", &request.candidate_response),
        ],
        context.as_deref(),
    );

    let mut completion = CompletionRequest::new(
        &options.model,
        prompt.to_messages(),
        Attribution::new(format!("judge.{dimension}"), request_id.to_string()),
    )
    .temperature(JUDGE_TEMPERATURE)
    .max_tokens(judge_max_output_tokens(&options.model));
    // Only OpenAI models reliably support response_format=json_object via OpenRouter.
    if options.model.starts_with("openai/") {
        completion = completion.json();
    }

    let start = Instant::now();
    let response = oracle.complete(&completion).await?;
    let elapsed = start.elapsed();

    let score = extract_score(&response.content);

    telemetry.emit_score(&format!("{dimension}.score"), score);
    telemetry.emit_score(
        &format!("{dimension}.duration_ms"),
        elapsed.as_millis() as f64,
    );
    debug!(
        dimension = %dimension,
        score,
        latency_ms = elapsed.as_millis() as u64,
        "dimension judged"
    );

    Ok(DimensionScore::new(dimension, score, response.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::types::{EvidenceDoc, Perspective};

    fn request_with_context() -> EvaluationRequest {
        EvaluationRequest::new("What year did Rust 1.0 ship?", "Rust 1.0 shipped in 2015.")
            .with_evidence(vec![EvidenceDoc::new(
                "Release history",
                "rust-lang.org",
                "Rust 1.0 was released on May 15, 2015.",
            )])
            .with_perspectives(vec![Perspective::new(
                "timeline",
                "The claim is consistent with the release archive.",
            )])
    }

    #[test]
    fn factual_accuracy_sees_evidence() {
        let req = request_with_context();
        let ctx = supporting_context(Dimension::FactualAccuracy, &req);
        let ctx = ctx.expect("evidence present");
        assert!(ctx.contains("Release history (rust-lang.org):"));
        assert!(ctx.contains("May 15, 2015"));
    }

    #[test]
    fn reasoning_quality_sees_perspectives() {
        let req = request_with_context();
        let ctx = supporting_context(Dimension::ReasoningQuality, &req);
        assert_eq!(
            ctx.as_deref(),
            Some("timeline: The claim is consistent with the release archive.")
        );
    }

    #[test]
    fn relevance_and_completeness_see_nothing() {
        let req = request_with_context();
        assert!(supporting_context(Dimension::Relevance, &req).is_none());
        assert!(supporting_context(Dimension::Completeness, &req).is_none());
    }

    #[test]
    fn empty_context_collapses_to_none() {
        let req = EvaluationRequest::new("q", "a");
        assert!(supporting_context(Dimension::FactualAccuracy, &req).is_none());
        assert!(supporting_context(Dimension::ReasoningQuality, &req).is_none());
    }

    #[test]
    fn output_token_cap_by_model_family() {
        assert_eq!(
            judge_max_output_tokens("openai/gpt-4o-mini"),
            JUDGE_MAX_OUTPUT_TOKENS_DEFAULT
        );
        assert_eq!(
            judge_max_output_tokens("openai/gpt-5-mini"),
            JUDGE_MAX_OUTPUT_TOKENS_GPT5
        );
        assert_eq!(
            judge_max_output_tokens("anthropic/claude-sonnet-4"),
            JUDGE_MAX_OUTPUT_TOKENS_DEFAULT
        );
    }
}
