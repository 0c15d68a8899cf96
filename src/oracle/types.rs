//! Request and response types for the completion oracle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attribution for an oracle call: which component made it and why.
///
/// Flows through to telemetry so call records can be grouped per
/// dimension or per synthesis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    /// Component that initiated the call (e.g. "judge.factual_accuracy").
    pub caller: String,
    /// Correlates all calls belonging to one evaluation request.
    pub request_id: String,
}

impl Attribution {
    pub fn new(caller: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            request_id: request_id.into(),
        }
    }
}

/// Message role in a completion conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request to the oracle.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier, provider-specific (e.g. "openai/gpt-4o-mini").
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Request JSON object output where the provider supports it.
    pub json_mode: bool,
    pub attribution: Attribution,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, attribution: Attribution) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            json_mode: false,
            attribution,
        }
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Why the completion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl From<Option<String>> for FinishReason {
    fn from(s: Option<String>) -> Self {
        match s.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// A completion response from the oracle.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency: Duration,
    pub finish_reason: FinishReason,
}

impl CompletionResponse {
    /// Total tokens consumed by this call.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}
