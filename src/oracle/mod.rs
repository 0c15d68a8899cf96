//! Completion oracle: the capability boundary between evaluation logic and
//! whatever language model backs it.
//!
//! Scoring and synthesis code depends only on the [`Oracle`] trait, so tests
//! substitute deterministic fakes and production wires in [`OracleGateway`]
//! over an [`OpenRouterAdapter`].

pub mod error;
pub mod openrouter;
pub mod telemetry;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::warn;

pub use error::{ErrorContext, OracleError};
pub use openrouter::OpenRouterAdapter;
pub use telemetry::{
    CallStatus, NoopTelemetrySink, OracleCallRecord, StderrTelemetrySink, TelemetrySink,
};
pub use types::*;

/// A text completion capability.
///
/// One call sends a system prompt and a user prompt and yields free text.
/// Everything above this trait treats the model as opaque.
#[async_trait::async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, OracleError>;
}

/// Retry policy for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

/// Wraps an inner oracle with retry, backoff, and call recording.
pub struct OracleGateway<P: Oracle, T: TelemetrySink> {
    provider: P,
    telemetry: Arc<T>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<P: Oracle, T: TelemetrySink + 'static> Oracle for OracleGateway<P, T> {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, OracleError> {
        OracleGateway::complete(self, req).await
    }
}

impl<T: TelemetrySink + 'static> OracleGateway<OpenRouterAdapter, T> {
    /// Build a gateway over an OpenRouter adapter configured from the
    /// environment.
    pub fn from_env(telemetry: Arc<T>) -> Result<Self, OracleError> {
        let provider = OpenRouterAdapter::from_env()?;
        Ok(Self {
            provider,
            telemetry,
            config: GatewayConfig::default(),
        })
    }
}

impl<P: Oracle, T: TelemetrySink + 'static> OracleGateway<P, T> {
    pub fn with_config(provider: P, telemetry: Arc<T>, config: GatewayConfig) -> Self {
        Self {
            provider,
            telemetry,
            config,
        }
    }

    pub async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse, OracleError> {
        let mut last_error: Option<OracleError> = None;

        for attempt in 0..=self.config.max_retries {
            let result = self.provider.complete(req).await;
            match result {
                Ok(resp) => {
                    self.record(req, Some(&resp), None, attempt + 1);
                    return Ok(resp);
                }
                Err(err) => {
                    self.record(req, None, Some(&err), attempt + 1);

                    if !err.is_retryable() || attempt == self.config.max_retries {
                        return Err(err);
                    }

                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        caller = %req.attribution.caller,
                        code = err.code(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "oracle call failed, retrying"
                    );
                    last_error = Some(err);
                    sleep(delay).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| OracleError::provider("oracle", "unknown error", false)))
    }

    /// Hand the call record to the sink on a detached task. The request path
    /// never waits on the sink and never sees it panic.
    fn record(
        &self,
        req: &CompletionRequest,
        resp: Option<&CompletionResponse>,
        error: Option<&OracleError>,
        attempts: u32,
    ) {
        let record = OracleCallRecord {
            timestamp: Utc::now(),
            model: req.model.clone(),
            caller: req.attribution.caller.clone(),
            request_id: req.attribution.request_id.clone(),
            input_tokens: resp.map(|r| r.input_tokens).unwrap_or(0),
            output_tokens: resp.map(|r| r.output_tokens).unwrap_or(0),
            latency_ms: resp.map(|r| r.latency.as_millis() as u64).unwrap_or(0),
            status: if error.is_some() {
                CallStatus::Error
            } else {
                CallStatus::Ok
            },
            error_code: error.map(|e| e.code().to_string()),
            finish_reason: resp.map(|r| r.finish_reason),
            attempts,
        };

        let sink = Arc::clone(&self.telemetry);
        tokio::spawn(async move {
            sink.record_call(record).await;
        });
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u64.pow(attempt.min(5));
    base * multiplier as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
        assert_eq!(backoff_delay(base, 9), Duration::from_millis(3_200));
    }
}
