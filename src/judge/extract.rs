//! Score extraction from free-text judge output.
//!
//! Judges are asked for JSON but not trusted to produce it. Extraction tries
//! a JSON object first, then labelled score phrases, then bare decimals, and
//! finally falls back to a neutral prior. It never fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

/// Neutral prior when no score can be read from the text.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// "score of 0.8", "rating: 7", "rate is 0.55" and similar.
static LABELLED_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:score|rating|rate)\b\s*(?:of|as|is|:)?\s*(\d+(?:\.\d+)?)")
        .expect("Invalid labelled score regex")
});

/// Any standalone decimal, e.g. "0.8" in "I'd say 0.8 overall".
static STANDALONE_DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\.\d+\b").expect("Invalid standalone decimal regex"));

#[derive(Debug, Deserialize)]
struct ScoreJson {
    #[serde(default)]
    score: Option<f64>,
}

/// Extract a score in `0.0..=1.0` from judge output.
///
/// Resolution order:
/// 1. a JSON object containing a numeric `score` field (clamped);
/// 2. a labelled phrase like "score: 0.8" (clamped);
/// 3. the first standalone decimal already within range (not clamped);
/// 4. [`NEUTRAL_SCORE`].
pub fn extract_score(text: &str) -> f64 {
    if let Some(score) = json_score(text) {
        return score.clamp(0.0, 1.0);
    }

    if let Some(caps) = LABELLED_SCORE_RE.captures(text) {
        if let Some(m) = caps.get(1) {
            if let Ok(v) = m.as_str().parse::<f64>() {
                return v.clamp(0.0, 1.0);
            }
        }
    }

    for m in STANDALONE_DECIMAL_RE.find_iter(text) {
        if let Ok(v) = m.as_str().parse::<f64>() {
            if (0.0..=1.0).contains(&v) {
                return v;
            }
        }
    }

    debug!(
        text_len = text.len(),
        "no score found in judge output, using neutral prior"
    );
    NEUTRAL_SCORE
}

fn json_score(text: &str) -> Option<f64> {
    let json_str = extract_json(text);
    let parsed: ScoreJson = serde_json::from_str(json_str).ok()?;
    parsed.score
}

/// Extract a JSON object from a response (handles models that add surrounding text).
pub(crate) fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();

    // If it starts with {, assume it's already JSON
    if trimmed.starts_with('{') {
        // Find matching closing brace
        let mut depth = 0;
        let mut end_idx = 0;
        for (i, c) in trimmed.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end_idx = i + 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        if end_idx > 0 {
            return &trimmed[..end_idx];
        }
    }

    // Try to find JSON anywhere in the response
    if let Some(start) = trimmed.find('{') {
        let remainder = &trimmed[start..];
        let mut depth = 0;
        for (i, c) in remainder.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return &remainder[..=i];
                    }
                }
                _ => {}
            }
        }
    }

    trimmed
}
