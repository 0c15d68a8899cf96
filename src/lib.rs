#![forbid(unsafe_code)]

//! # metacog
//!
//! A metacognitive evaluation and feedback engine for LLM output.
//!
//! Instead of trusting a generated response as-is, metacog judges it along
//! four independent quality dimensions (factual accuracy, reasoning quality,
//! relevance, completeness) using an LLM oracle as the judge, aggregates the
//! per-dimension verdicts into one composite evaluation, and can then ask the
//! oracle to synthesize an improved response conditioned on that verdict —
//! optionally iterating until the composite score stops improving.
//!
//! A second, oracle-free path scores *operational* telemetry: it bands raw
//! component metrics (latency, error rate, throughput, …) into a composite
//! assessment, tracks learning-task progress, mines simple statistical
//! patterns (variance spread, z-score outliers) from arbitrary numeric data,
//! and validates behavior parameter sets. Both paths share the same bounded
//! score / banded assessment vocabulary.
//!
//! The engine is stateless between invocations; the oracle is an abstract
//! capability (see [`oracle::Oracle`]) so tests substitute a deterministic
//! fake.

pub mod judge;
pub mod oracle;
pub mod prompts;
pub mod selfcheck;

pub use judge::{
    evaluate, improve, refine_loop, CompositeEvaluation, Dimension, DimensionFailure,
    DimensionScore, DimensionWeights, EvalError, EvalOptions, EvaluationRequest, EvidenceDoc,
    Judge, Perspective, RefineIteration, RefineReport, RefinedResponse,
};
pub use oracle::{
    CallStatus, CompletionRequest, CompletionResponse, GatewayConfig, NoopTelemetrySink,
    OpenRouterAdapter, Oracle, OracleCallRecord, OracleError, OracleGateway, StderrTelemetrySink,
    TelemetrySink,
};
pub use selfcheck::{
    AssessmentBand, HeuristicSelfAssessor, InsightReport, LearningAssessment, MetricPattern,
    MetricValue, PatternKind, PerformanceAssessment, SelfAssessor, SelfEvalError,
};
