//! Feedback-conditioned revision and the bounded refinement loop.

use std::time::Instant;

use tracing::{info, warn};

use crate::oracle::{Attribution, CompletionRequest, Oracle, TelemetrySink};
use crate::prompts::REVISION_PROMPT;

use super::composite::format_scores;
use super::types::{
    CompositeEvaluation, EvalOptions, EvaluationRequest, RefineIteration, RefineReport,
    RefinedResponse,
};
use super::EvalError;

// =============================================================================
// Constants
// =============================================================================

/// Revisions run warm so the rewrite can restructure, not just patch.
pub const REVISION_TEMPERATURE: f32 = 0.7;

/// Hard cap on generation for a revision.
pub const REVISION_MAX_OUTPUT_TOKENS: u32 = 2_048;

// =============================================================================
// Revision
// =============================================================================

fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.chars().take(max_chars).collect()
}

/// Evidence and perspectives the rewriter may draw on, bounded by the
/// configured doc count and per-doc character cap.
fn revision_context(request: &EvaluationRequest, options: &EvalOptions) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    for doc in request.evidence.iter().take(options.max_evidence_docs) {
        parts.push(format!(
            "{} ({}):\n{}",
            doc.title,
            doc.source,
            truncate_chars(&doc.content, options.evidence_char_cap)
        ));
    }

    for p in &request.perspectives {
        parts.push(format!("{}: {}", p.label, p.analysis));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

/// Collapse an evaluation into the feedback block the rewriter sees.
fn format_feedback(evaluation: &CompositeEvaluation) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(agg) = evaluation.aggregate_score {
        parts.push(format!("Aggregate score: {agg:.2}"));
    }

    if !evaluation.dimension_scores.is_empty() {
        parts.push(format_scores(&evaluation.dimension_scores));
    }

    if !evaluation.recommendations.is_empty() {
        let list: Vec<String> = evaluation
            .recommendations
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r))
            .collect();
        parts.push(format!("Recommendations:\n{}", list.join("\n")));
    }

    parts.join("\n\n")
}

/// Rewrite the candidate response so it addresses the evaluator feedback.
///
/// The oracle output is returned as-is; the caller decides whether to adopt
/// it. Uses the evaluation's request id so the revision call correlates with
/// the judging calls that produced the feedback.
pub async fn improve(
    oracle: &dyn Oracle,
    request: &EvaluationRequest,
    evaluation: &CompositeEvaluation,
    options: &EvalOptions,
) -> Result<RefinedResponse, EvalError> {
    let feedback = format_feedback(evaluation);
    let context = revision_context(request, options);

    let prompt = REVISION_PROMPT.render(
        &[
            ("prompt", &request.query),
            ("response", &request.candidate_response),
            ("feedback", &feedback),
        ],
        context.as_deref(),
    );

    let completion = CompletionRequest::new(
        &options.model,
        prompt.to_messages(),
        Attribution::new("judge.revise", evaluation.request_id.to_string()),
    )
    .temperature(REVISION_TEMPERATURE)
    .max_tokens(REVISION_MAX_OUTPUT_TOKENS);

    let start = Instant::now();
    let response = oracle.complete(&completion).await?;

    Ok(RefinedResponse {
        text: response.content,
        latency: start.elapsed(),
    })
}

// =============================================================================
// Refinement loop
// =============================================================================

/// Evaluate, revise, re-evaluate until the aggregate stops improving or the
/// iteration budget runs out.
///
/// Each revision is judged as a fresh request; only a revision that beats the
/// best score so far is kept, so the reported text never regresses below the
/// original. A blank revision cannot be judged and ends the loop the same way
/// a non-improving one does.
pub async fn refine_loop(
    oracle: &dyn Oracle,
    telemetry: &dyn TelemetrySink,
    request: &EvaluationRequest,
    options: &EvalOptions,
) -> Result<RefineReport, EvalError> {
    let baseline = super::evaluate(oracle, telemetry, request, options).await?;
    let baseline_score = baseline.aggregate_score.unwrap_or(0.0);

    let mut best_text = request.candidate_response.clone();
    let mut best_score = baseline_score;
    let mut last_eval = baseline;
    let mut iterations: Vec<RefineIteration> = Vec::new();

    for iteration in 1..=options.max_refine_iterations {
        let mut working = request.clone();
        working.candidate_response = best_text.clone();

        let revision = improve(oracle, &working, &last_eval, options).await?;

        if revision.text.trim().is_empty() {
            warn!(iteration, "revision came back blank, keeping the best text so far");
            break;
        }

        let mut revised = request.clone();
        revised.candidate_response = revision.text.clone();
        let eval = super::evaluate(oracle, telemetry, &revised, options).await?;
        let score = eval.aggregate_score.unwrap_or(0.0);

        let delta = score - best_score;
        let accepted = score > best_score;
        iterations.push(RefineIteration {
            iteration,
            aggregate_score: score,
            delta,
            accepted,
        });

        if accepted {
            best_score = score;
            best_text = revision.text;
            last_eval = eval;
        } else {
            break;
        }
    }

    info!(
        baseline = baseline_score,
        best = best_score,
        rounds = iterations.len(),
        "refinement finished"
    );

    Ok(RefineReport {
        best_text,
        best_score,
        baseline_score,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::types::{Dimension, DimensionScore, EvidenceDoc, Perspective};
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[test]
    fn revision_context_caps_docs_and_chars() {
        let request = EvaluationRequest::new("q", "a").with_evidence(vec![
            EvidenceDoc::new("one", "s1", "aaaaaaaaaa"),
            EvidenceDoc::new("two", "s2", "bbbbbbbbbb"),
            EvidenceDoc::new("three", "s3", "cccccccccc"),
        ]);
        let options = EvalOptions {
            max_evidence_docs: 2,
            evidence_char_cap: 4,
            ..EvalOptions::default()
        };
        let ctx = revision_context(&request, &options).expect("context present");
        assert!(ctx.contains("one (s1):\naaaa"));
        assert!(ctx.contains("two (s2):\nbbbb"));
        assert!(!ctx.contains("three"));
        assert!(!ctx.contains("aaaaa"));
    }

    #[test]
    fn revision_context_includes_perspectives() {
        let request = EvaluationRequest::new("q", "a")
            .with_perspectives(vec![Perspective::new("risk", "claim is unsourced")]);
        let ctx = revision_context(&request, &EvalOptions::default()).expect("context present");
        assert!(ctx.contains("risk: claim is unsourced"));
    }

    #[test]
    fn revision_context_empty_is_none() {
        let request = EvaluationRequest::new("q", "a");
        assert!(revision_context(&request, &EvalOptions::default()).is_none());
    }

    #[test]
    fn feedback_block_lists_scores_and_recommendations() {
        let evaluation = CompositeEvaluation {
            request_id: Uuid::new_v4(),
            dimension_scores: vec![DimensionScore::new(
                Dimension::Completeness,
                0.4,
                "Second question unanswered.",
            )],
            aggregate_score: Some(0.4),
            recommendations: vec!["Answer the second question.".to_string()],
            attempted_dimensions: 4,
            failed_dimensions: vec![],
            duration: Duration::from_millis(5),
        };
        let feedback = format_feedback(&evaluation);
        assert!(feedback.contains("Aggregate score: 0.40"));
        assert!(feedback.contains("completeness: 0.40"));
        assert!(feedback.contains("1. Answer the second question."));
    }
}
