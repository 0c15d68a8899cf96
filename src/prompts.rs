//! Prompt templates for dimension judging, recommendation, and revision.
//!
//! Domain logic for rendering evaluation prompts. Provider-agnostic.

use crate::oracle::Message;

// =============================================================================
// Rendered prompts
// =============================================================================

/// Rendered prompt ready for the oracle.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape XML special characters to prevent prompt injection via tag breaking.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with `{placeholder}` slots.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Substitute placeholders in both system and user text.
    ///
    /// Values are XML-escaped before substitution; an optional context is
    /// prepended to the user message inside a `<supporting_context>` block.
    pub fn render(&self, vars: &[(&str, &str)], context: Option<&str>) -> PromptInstance {
        let mut system = self.system.to_string();
        let mut user_core = self.user.to_string();

        for (name, value) in vars {
            let needle = format!("{{{name}}}");
            let safe = escape_xml_chars(value);
            system = system.replace(&needle, &safe);
            user_core = user_core.replace(&needle, &safe);
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(ctx) = context {
            parts.push(format!(
                "<supporting_context>\n{}\n</supporting_context>",
                escape_xml_chars(ctx.trim())
            ));
        }
        parts.push(user_core.trim().to_string());

        PromptInstance {
            template_slug: self.slug.to_string(),
            system: system.trim().to_string(),
            user: parts.join("\n\n"),
        }
    }
}

// =============================================================================
// Standard prompts
// =============================================================================

/// Judge one quality dimension of a response.
pub const DIMENSION_PROMPT: PromptTemplate = PromptTemplate {
    slug: "dimension_v1",
    system: r#"You are an expert evaluator. You judge a response to a prompt along exactly one quality dimension and express how strongly the response exhibits it as a score between 0.0 (entirely absent) and 1.0 (exemplary).

Dimension: {dimension_name}
{criteria}

Output only valid JSON with score (0.0-1.0) and justification (one or two sentences).
Example:
{"score": 0.8, "justification": "Claims match the prompt; one date is off by a year."}"#,
    user: r#"<prompt>
{prompt}
</prompt>

<response>
{response}
</response>

Evaluate the response for {dimension_name} only. Return a JSON object with your evaluation.
json:"#,
};

/// Turn dimension scores into concrete suggestions.
pub const RECOMMENDATION_PROMPT: PromptTemplate = PromptTemplate {
    slug: "recommendations_v1",
    system: r#"You are an expert writing coach. Given a prompt, a response, and per-dimension quality scores, you list the concrete changes that would most improve the response.

Output a numbered list of three to five distinct recommendations, one per line, most impactful first. Each item must name a specific change, not a general virtue. If the response needs no changes, output exactly: 1. No changes needed."#,
    user: r#"<prompt>
{prompt}
</prompt>

<response>
{response}
</response>

<scores>
{scores}
</scores>

List the most impactful improvements as a numbered list."#,
};

/// Rewrite a response according to evaluator feedback.
pub const REVISION_PROMPT: PromptTemplate = PromptTemplate {
    slug: "revision_v1",
    system: r#"You are an expert editor. You rewrite a response to a prompt so that it addresses every piece of evaluator feedback while preserving what the feedback did not criticize.

Output only the revised response. No preamble, no commentary, no score."#,
    user: r#"<prompt>
{prompt}
</prompt>

<response>
{response}
</response>

<feedback>
{feedback}
</feedback>

Rewrite the response to address the feedback."#,
};

pub const PROMPTS: &[PromptTemplate] = &[DIMENSION_PROMPT, RECOMMENDATION_PROMPT, REVISION_PROMPT];

pub fn prompt_by_slug(slug: &str) -> Option<PromptTemplate> {
    PROMPTS.iter().find(|t| t.slug == slug).copied()
}

// =============================================================================
// TESTS
// =============================================================================
