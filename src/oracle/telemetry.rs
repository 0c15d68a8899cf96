//! Telemetry for oracle calls and evaluation scores.
//!
//! Recording is fire-and-forget: the gateway spawns record tasks and never
//! lets a sink failure propagate into the evaluation path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::FinishReason;

/// Outcome of an oracle call, for the call record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Ok,
    Error,
}

/// One oracle call, as recorded by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleCallRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    /// Component that initiated the call (e.g. "judge.relevance").
    pub caller: String,
    /// Correlates all calls belonging to one evaluation request.
    pub request_id: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
    pub status: CallStatus,
    /// Short error code when status is Error.
    pub error_code: Option<String>,
    pub finish_reason: Option<FinishReason>,
    /// How many attempts the gateway made, including the successful one.
    pub attempts: u32,
}

/// Sink for oracle call records and evaluation scores.
///
/// Implementations must not assume callers await durability; the gateway
/// records on a detached task and drops the handle.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Record one oracle call.
    async fn record_call(&self, record: OracleCallRecord);

    /// Emit a numeric score keyed by component or dimension name,
    /// e.g. "judge.factual_accuracy.score".
    fn emit_score(&self, key: &str, value: f64);
}

/// Telemetry sink that discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoopTelemetrySink;

#[async_trait]
impl TelemetrySink for NoopTelemetrySink {
    async fn record_call(&self, _record: OracleCallRecord) {}

    fn emit_score(&self, _key: &str, _value: f64) {}
}

/// Telemetry sink that writes single-line JSON records to stderr.
///
/// Useful for local runs and piping into jq; production deployments
/// substitute their own sink.
#[derive(Debug, Clone, Default)]
pub struct StderrTelemetrySink;

#[async_trait]
impl TelemetrySink for StderrTelemetrySink {
    async fn record_call(&self, record: OracleCallRecord) {
        match serde_json::to_string(&record) {
            Ok(line) => eprintln!("{line}"),
            Err(e) => debug!(error = %e, "failed to serialize call record"),
        }
    }

    fn emit_score(&self, key: &str, value: f64) {
        eprintln!("{{\"score\":\"{key}\",\"value\":{value}}}");
    }
}
