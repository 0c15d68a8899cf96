//! Composite assessment: weighted aggregation and recommendation synthesis.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::oracle::{Attribution, CompletionRequest, Oracle, OracleError};
use crate::prompts::RECOMMENDATION_PROMPT;

use super::dimension::JUDGE_TEMPERATURE;
use super::types::{DimensionScore, DimensionWeights, EvalOptions, EvaluationRequest};

/// Hard cap on generation for the recommendation list.
pub const RECOMMENDATION_MAX_OUTPUT_TOKENS: u32 = 512;

/// Leading list marker: "1. ", "- ", "* ".
static LIST_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d+\.|-|\*)\s+").expect("Invalid list marker regex"));

// =============================================================================
// Aggregation
// =============================================================================

/// Weighted mean over the dimensions that scored.
///
/// Returns `None` for an empty slice. A weight configuration that zeroes out
/// every scored dimension falls back to the unweighted mean rather than
/// dividing by zero.
pub fn aggregate(scores: &[DimensionScore], weights: &DimensionWeights) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }

    let total_weight: f64 = scores.iter().map(|s| weights.weight(s.dimension)).sum();
    if total_weight <= 0.0 {
        let sum: f64 = scores.iter().map(|s| s.score).sum();
        return Some(sum / scores.len() as f64);
    }

    let weighted_sum: f64 = scores
        .iter()
        .map(|s| s.score * weights.weight(s.dimension))
        .sum();
    Some(weighted_sum / total_weight)
}

// =============================================================================
// Recommendations
// =============================================================================

/// Render (score, rationale) pairs for the recommendation prompt.
pub(crate) fn format_scores(scores: &[DimensionScore]) -> String {
    let blocks: Vec<String> = scores
        .iter()
        .map(|s| format!("{}: {:.2}\n{}", s.dimension.as_str(), s.score, s.rationale.trim()))
        .collect();
    blocks.join("\n\n")
}

/// Ask the oracle for concrete improvement suggestions, given the judged
/// scores, and parse them out of the list it returns.
pub async fn generate_recommendations(
    oracle: &dyn Oracle,
    request: &EvaluationRequest,
    scores: &[DimensionScore],
    options: &EvalOptions,
    request_id: Uuid,
) -> Result<Vec<String>, OracleError> {
    let scores_block = format_scores(scores);

    let prompt = RECOMMENDATION_PROMPT.render(
        &[
            ("prompt", &request.query),
            ("response", &request.candidate_response),
            ("scores", &scores_block),
        ],
        None,
    );

    let completion = CompletionRequest::new(
        &options.model,
        prompt.to_messages(),
        Attribution::new("judge.recommendations", request_id.to_string()),
    )
    .temperature(JUDGE_TEMPERATURE)
    .max_tokens(RECOMMENDATION_MAX_OUTPUT_TOKENS);

    let response = oracle.complete(&completion).await?;
    Ok(parse_recommendations(&response.content))
}

/// Split list-shaped oracle output into individual recommendations.
///
/// Items start at a leading `1.` / `-` / `*` marker; unmarked lines are
/// treated as wrapped continuations of the previous item; anything before the
/// first marker is preamble and dropped.
pub fn parse_recommendations(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(m) = LIST_MARKER_RE.find(trimmed) {
            let item = trimmed[m.end()..].trim();
            if !item.is_empty() {
                items.push(item.to_string());
            }
        } else if let Some(last) = items.last_mut() {
            last.push(' ');
            last.push_str(trimmed);
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::types::Dimension;

    fn score(d: Dimension, v: f64) -> DimensionScore {
        DimensionScore::new(d, v, "rationale")
    }

    #[test]
    fn aggregate_equal_weights_is_plain_mean() {
        let scores = vec![
            score(Dimension::FactualAccuracy, 0.8),
            score(Dimension::ReasoningQuality, 0.6),
            score(Dimension::Relevance, 1.0),
            score(Dimension::Completeness, 0.6),
        ];
        let agg = aggregate(&scores, &DimensionWeights::default()).unwrap();
        assert!((agg - 0.75).abs() < 1e-9);
    }

    #[test]
    fn aggregate_respects_weights() {
        let scores = vec![
            score(Dimension::FactualAccuracy, 1.0),
            score(Dimension::Relevance, 0.0),
        ];
        let weights = DimensionWeights {
            factual_accuracy: 3.0,
            relevance: 1.0,
            ..DimensionWeights::default()
        };
        let agg = aggregate(&scores, &weights).unwrap();
        assert!((agg - 0.75).abs() < 1e-9);
    }

    #[test]
    fn aggregate_over_partial_subset() {
        // Only the dimensions that scored contribute.
        let scores = vec![
            score(Dimension::FactualAccuracy, 0.9),
            score(Dimension::Relevance, 0.7),
        ];
        let agg = aggregate(&scores, &DimensionWeights::default()).unwrap();
        assert!((agg - 0.8).abs() < 1e-9);
    }

    #[test]
    fn aggregate_empty_is_none() {
        assert!(aggregate(&[], &DimensionWeights::default()).is_none());
    }

    #[test]
    fn aggregate_all_zero_weights_falls_back_to_mean() {
        let scores = vec![
            score(Dimension::FactualAccuracy, 0.8),
            score(Dimension::Relevance, 0.4),
        ];
        let weights = DimensionWeights {
            factual_accuracy: 0.0,
            reasoning_quality: 0.0,
            relevance: 0.0,
            completeness: 0.0,
        };
        let agg = aggregate(&scores, &weights).unwrap();
        assert!((agg - 0.6).abs() < 1e-9);
    }

    #[test]
    fn parse_numbered_list() {
        let text = "1. Cite the release announcement.\n2. Remove the speculation in paragraph two.\n3. Answer the second question.";
        let recs = parse_recommendations(text);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], "Cite the release announcement.");
        assert_eq!(recs[2], "Answer the second question.");
    }

    #[test]
    fn parse_dash_and_star_markers() {
        let recs = parse_recommendations("- first fix\n* second fix");
        assert_eq!(recs, vec!["first fix", "second fix"]);
    }

    #[test]
    fn parse_coalesces_wrapped_lines() {
        let text = "1. Replace the vague opening with a direct answer\nto the question asked.\n2. Add the missing date.";
        let recs = parse_recommendations(text);
        assert_eq!(recs.len(), 2);
        assert_eq!(
            recs[0],
            "Replace the vague opening with a direct answer to the question asked."
        );
    }

    #[test]
    fn parse_skips_preamble() {
        let text = "Here are my suggestions:\n\n1. Tighten the intro.\n2. Fix the date.";
        let recs = parse_recommendations(text);
        assert_eq!(recs, vec!["Tighten the intro.", "Fix the date."]);
    }

    #[test]
    fn parse_empty_and_markerless_text() {
        assert!(parse_recommendations("").is_empty());
        assert!(parse_recommendations("No list markers anywhere in this text.").is_empty());
    }

    #[test]
    fn marker_requires_trailing_space() {
        // "3.14" is a number, not a list marker.
        let recs = parse_recommendations("1. Use 3.14 for pi.");
        assert_eq!(recs, vec!["Use 3.14 for pi."]);
    }

    #[test]
    fn format_scores_includes_rationales() {
        let scores = vec![
            DimensionScore::new(Dimension::FactualAccuracy, 0.85, "One date is wrong."),
            DimensionScore::new(Dimension::Relevance, 0.5, "Half the answer is off-topic."),
        ];
        let block = format_scores(&scores);
        assert!(block.contains("factual_accuracy: 0.85"));
        assert!(block.contains("One date is wrong."));
        assert!(block.contains("relevance: 0.50"));
    }
}
