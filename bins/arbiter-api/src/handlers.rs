// HTTP route handlers for the Arbiter API

use arbiter_common::languages::LanguageEntry;
use arbiter_common::types::{ExecutionLimits, ExecutionTarget, TestCase};
use arbiter_engine::{metrics, OutputPolicy};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub language: String,
    pub source_code: String,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub limits: ExecutionLimits,
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    pub language: String,
    pub source_code: String,
    #[serde(default)]
    pub stdin: String,
    pub expected_output: String,
    #[serde(default)]
    pub limits: ExecutionLimits,
}

#[derive(Debug, Deserialize)]
pub struct TestCaseInput {
    pub id: Option<u32>,
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    #[default]
    Scored,
    Legacy,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub language: String,
    pub source_code: String,
    pub test_cases: Vec<TestCaseInput>,
    #[serde(default)]
    pub limits: ExecutionLimits,
    #[serde(default = "default_stop_on_compile_error")]
    pub stop_on_compile_error: bool,
    #[serde(default)]
    pub mode: EvaluationMode,
    #[serde(default)]
    pub trust_output: bool,
}

fn default_weight() -> u32 {
    1
}

fn default_stop_on_compile_error() -> bool {
    true
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

fn resolve(state: &AppState, language: &str) -> Result<ExecutionTarget, Response> {
    state.executor.resolve_language(language).map_err(|e| {
        warn!(language = %language, "Rejected unknown language");
        bad_request(e.to_string())
    })
}

/// Assign positional ids where the caller gave none and reject weightless tests
fn to_test_cases(inputs: Vec<TestCaseInput>) -> Result<Vec<TestCase>, Response> {
    if inputs.is_empty() {
        return Err(bad_request("test_cases must not be empty"));
    }

    inputs
        .into_iter()
        .enumerate()
        .map(|(idx, tc)| {
            let id = tc.id.unwrap_or((idx + 1) as u32);
            if tc.weight == 0 {
                return Err(bad_request(format!("test case {} has weight 0", id)));
            }
            Ok(TestCase {
                id,
                input: tc.input,
                expected_output: tc.expected_output,
                hidden: tc.hidden,
                weight: tc.weight,
            })
        })
        .collect()
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /languages
pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<Vec<LanguageEntry>> {
    Json(state.executor.languages().entries().to_vec())
}

/// GET /metrics
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

/// POST /run - execute once and return what the program printed
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RunRequest>,
) -> Response {
    let target = match resolve(&state, &payload.language) {
        Ok(target) => target,
        Err(response) => return response,
    };
    let request_id = Uuid::new_v4();
    info!(request_id = %request_id, language_id = target.id(), "Run requested");

    let verdict = state
        .executor
        .run_code(&payload.source_code, target, &payload.stdin, payload.limits)
        .await;

    info!(request_id = %request_id, status_id = ?verdict.status_id(), "Run finished");
    (StatusCode::OK, Json(verdict)).into_response()
}

/// POST /test - run one input against an expected output
pub async fn run_test(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestRequest>,
) -> Response {
    let target = match resolve(&state, &payload.language) {
        Ok(target) => target,
        Err(response) => return response,
    };
    let request_id = Uuid::new_v4();
    info!(request_id = %request_id, language_id = target.id(), "Test run requested");

    let verdict = state
        .executor
        .run_single(
            &payload.source_code,
            target,
            &payload.stdin,
            &payload.expected_output,
            payload.limits,
        )
        .await;

    info!(request_id = %request_id, passed = verdict.passed, "Test run finished");
    (StatusCode::OK, Json(verdict)).into_response()
}

/// POST /evaluate - score a program against a test suite
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvaluateRequest>,
) -> Response {
    let target = match resolve(&state, &payload.language) {
        Ok(target) => target,
        Err(response) => return response,
    };
    let test_cases = match to_test_cases(payload.test_cases) {
        Ok(cases) => cases,
        Err(response) => return response,
    };

    let request_id = Uuid::new_v4();
    info!(
        request_id = %request_id,
        language_id = target.id(),
        test_cases = test_cases.len(),
        mode = ?payload.mode,
        "Evaluation requested"
    );

    let result = match payload.mode {
        EvaluationMode::Scored => {
            state
                .executor
                .run_batch(
                    &payload.source_code,
                    target,
                    &test_cases,
                    payload.limits,
                    payload.stop_on_compile_error,
                )
                .await
        }
        EvaluationMode::Legacy => {
            let policy = if payload.trust_output {
                OutputPolicy::TrustOutput
            } else {
                OutputPolicy::Strict
            };
            state
                .executor
                .evaluate_weighted(&payload.source_code, target, &test_cases, payload.limits, policy)
                .await
        }
    };

    info!(
        request_id = %request_id,
        score = result.score,
        max_score = result.max_score,
        "Evaluation finished"
    );
    (StatusCode::OK, Json(result)).into_response()
}
