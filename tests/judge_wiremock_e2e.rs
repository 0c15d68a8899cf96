use std::sync::{Arc, Mutex};
use std::time::Duration;

use metacog::judge::{evaluate, improve, Dimension, DimensionWeights, EvalError, EvalOptions};
use metacog::oracle::{
    NoopTelemetrySink, OpenRouterAdapter, OracleCallRecord, TelemetrySink,
};
use metacog::{EvaluationRequest, Judge};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn user_content(parsed: &serde_json::Value) -> &str {
    parsed
        .get("messages")
        .and_then(|m| m.as_array())
        .and_then(|msgs| {
            msgs.iter()
                .find(|m| m.get("role").and_then(|r| r.as_str()) == Some("user"))
        })
        .and_then(|m| m.get("content").and_then(|c| c.as_str()))
        .unwrap_or("")
}

fn dimension_of(user: &str) -> Option<&'static str> {
    [
        "factual accuracy",
        "reasoning quality",
        "relevance",
        "completeness",
    ]
    .into_iter()
    .find(|label| user.contains(&format!("Evaluate the response for {label} only")))
}

fn success_body(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": { "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 10 }
    }))
}

/// Scores each dimension with a fixed value and answers recommendation and
/// revision prompts with canned text.
#[derive(Clone, Copy)]
struct ScriptedOracle;

impl Respond for ScriptedOracle {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let parsed: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let user = user_content(&parsed);

        if user.contains("Rewrite the response to address the feedback") {
            return success_body("Rust 1.0 shipped on May 15, 2015, per the release archive.");
        }
        if user.contains("List the most impactful improvements") {
            return success_body("1. Name the exact release date.\n2. Cite the release archive.");
        }

        let score = match dimension_of(user) {
            Some("factual accuracy") => 0.9,
            Some("reasoning quality") => 0.7,
            Some("relevance") => 0.8,
            Some("completeness") => 0.6,
            _ => 0.0,
        };
        success_body(&format!(
            r#"{{"score": {score}, "justification": "scripted"}}"#
        ))
    }
}

async fn scripted_adapter(server: &MockServer) -> OpenRouterAdapter {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ScriptedOracle)
        .mount(server)
        .await;
    OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
        .unwrap()
}

fn release_request() -> EvaluationRequest {
    EvaluationRequest::new("What year did Rust 1.0 ship?", "Rust 1.0 shipped in 2015.")
}

#[tokio::test]
async fn evaluate_scores_every_dimension_and_parses_recommendations() {
    let server = MockServer::start().await;
    let adapter = scripted_adapter(&server).await;

    let evaluation = evaluate(
        &adapter,
        &NoopTelemetrySink,
        &release_request(),
        &EvalOptions::default(),
    )
    .await
    .unwrap();

    let order: Vec<Dimension> = evaluation
        .dimension_scores
        .iter()
        .map(|s| s.dimension)
        .collect();
    assert_eq!(order, Dimension::ALL.to_vec());

    assert_eq!(evaluation.score_for(Dimension::FactualAccuracy), Some(0.9));
    assert_eq!(evaluation.score_for(Dimension::Completeness), Some(0.6));
    assert!(!evaluation.is_partial());
    assert_eq!(evaluation.attempted_dimensions, 4);

    let aggregate = evaluation.aggregate_score.unwrap();
    assert!((aggregate - 0.75).abs() < 1e-9);

    assert_eq!(
        evaluation.recommendations,
        vec!["Name the exact release date.", "Cite the release archive."]
    );

    // Four dimension calls plus one recommendation call.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 5);
}

#[tokio::test]
async fn evaluate_applies_dimension_weights_to_the_aggregate() {
    let server = MockServer::start().await;
    let adapter = scripted_adapter(&server).await;

    let options = EvalOptions {
        weights: DimensionWeights {
            factual_accuracy: 2.0,
            ..DimensionWeights::default()
        },
        ..EvalOptions::default()
    };

    let evaluation = evaluate(&adapter, &NoopTelemetrySink, &release_request(), &options)
        .await
        .unwrap();

    // (2*0.9 + 0.7 + 0.8 + 0.6) / 5
    let aggregate = evaluation.aggregate_score.unwrap();
    assert!((aggregate - 0.78).abs() < 1e-9);
}

/// Fails exactly one dimension with a server error; the rest score normally.
#[derive(Clone, Copy)]
struct CompletenessDown;

impl Respond for CompletenessDown {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let parsed: serde_json::Value = serde_json::from_slice(&request.body).unwrap_or_default();
        let user = user_content(&parsed);

        if dimension_of(user) == Some("completeness") {
            return ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "upstream exploded", "code": "internal" }
            }));
        }
        ScriptedOracle.respond(request)
    }
}

#[tokio::test]
async fn evaluate_absorbs_a_single_failed_dimension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(CompletenessDown)
        .mount(&server)
        .await;
    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();

    let evaluation = evaluate(
        &adapter,
        &NoopTelemetrySink,
        &release_request(),
        &EvalOptions::default(),
    )
    .await
    .unwrap();

    assert!(evaluation.is_partial());
    assert_eq!(evaluation.attempted_dimensions, 4);
    assert_eq!(evaluation.dimension_scores.len(), 3);
    assert_eq!(evaluation.failed_dimensions.len(), 1);
    assert_eq!(
        evaluation.failed_dimensions[0].dimension,
        Dimension::Completeness
    );
    assert_eq!(evaluation.score_for(Dimension::Completeness), None);

    // Mean over the three dimensions that scored.
    let aggregate = evaluation.aggregate_score.unwrap();
    assert!((aggregate - 0.8).abs() < 1e-9);

    // The recommendation call still runs on a partial verdict.
    assert!(!evaluation.recommendations.is_empty());
}

#[tokio::test]
async fn evaluate_errors_only_when_every_dimension_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "down", "code": "internal" }
        })))
        .mount(&server)
        .await;
    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();

    let err = evaluate(
        &adapter,
        &NoopTelemetrySink,
        &release_request(),
        &EvalOptions::default(),
    )
    .await
    .unwrap_err();

    match err {
        EvalError::AllDimensionsFailed { failures } => assert_eq!(failures.len(), 4),
        other => panic!("expected AllDimensionsFailed, got {other:?}"),
    }

    // No recommendation call when there is nothing to recommend against.
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 4);
}

#[tokio::test]
async fn evaluate_rejects_blank_requests_before_any_oracle_call() {
    let adapter = OpenRouterAdapter::with_config(
        "sk-test",
        "http://127.0.0.1:9",
        Duration::from_secs(1),
        None,
        None,
    )
    .unwrap();

    let blank = EvaluationRequest::new("What year did Rust 1.0 ship?", "   ");
    let err = evaluate(
        &adapter,
        &NoopTelemetrySink,
        &blank,
        &EvalOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EvalError::InvalidRequest(_)));

    let blank_query = EvaluationRequest::new("", "Rust 1.0 shipped in 2015.");
    let err = evaluate(
        &adapter,
        &NoopTelemetrySink,
        &blank_query,
        &EvalOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EvalError::InvalidRequest(_)));
}

#[tokio::test]
async fn improve_returns_the_feedback_conditioned_rewrite() {
    let server = MockServer::start().await;
    let adapter = scripted_adapter(&server).await;

    let request = release_request();
    let options = EvalOptions::default();
    let evaluation = evaluate(&adapter, &NoopTelemetrySink, &request, &options)
        .await
        .unwrap();

    let refined = improve(&adapter, &request, &evaluation, &options)
        .await
        .unwrap();
    assert_eq!(
        refined.text,
        "Rust 1.0 shipped on May 15, 2015, per the release archive."
    );
}

#[derive(Default)]
struct ScoreSink {
    scores: Mutex<Vec<(String, f64)>>,
}

#[async_trait::async_trait]
impl TelemetrySink for ScoreSink {
    async fn record_call(&self, _record: OracleCallRecord) {}

    fn emit_score(&self, key: &str, value: f64) {
        self.scores.lock().unwrap().push((key.to_string(), value));
    }
}

#[tokio::test]
async fn evaluate_emits_per_dimension_and_aggregate_scores() {
    let server = MockServer::start().await;
    let adapter = scripted_adapter(&server).await;
    let sink = ScoreSink::default();

    evaluate(&adapter, &sink, &release_request(), &EvalOptions::default())
        .await
        .unwrap();

    let scores = sink.scores.lock().unwrap();
    let keys: Vec<&str> = scores.iter().map(|(k, _)| k.as_str()).collect();
    for dim in Dimension::ALL {
        assert!(keys.contains(&format!("{dim}.score").as_str()));
        assert!(keys.contains(&format!("{dim}.duration_ms").as_str()));
    }
    assert!(keys.contains(&"judge.aggregate.score"));

    let aggregate = scores
        .iter()
        .find(|(k, _)| k == "judge.aggregate.score")
        .map(|(_, v)| *v)
        .unwrap();
    assert!((aggregate - 0.75).abs() < 1e-9);
}

#[tokio::test]
async fn facade_runs_evaluate_and_improve_through_one_handle() {
    let server = MockServer::start().await;
    let adapter = scripted_adapter(&server).await;

    let judge = Judge::new(Arc::new(adapter), Arc::new(NoopTelemetrySink));
    let request = release_request();

    let evaluation = judge.evaluate(&request).await.unwrap();
    assert_eq!(evaluation.dimension_scores.len(), 4);

    let refined = judge.improve(&request, &evaluation).await.unwrap();
    assert!(refined.text.contains("May 15, 2015"));
}
