// Test doubles for the judge: an in-process HTTP mock and a scripted
// in-memory SubmissionApi

use crate::client::SubmissionApi;
use crate::error::ExecutionError;
use arbiter_common::types::{JudgeStatus, RawResult, SubmissionRequest, SubmissionToken};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct MockJudgeState {
    responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn handle(
    State(state): State<MockJudgeState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.to_string(), v.to_string())
        })
        .collect();
    let headers = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body: serde_json::from_slice(&body).ok(),
    });

    match state.responses.lock().unwrap().pop_front() {
        Some((code, payload)) => {
            let code = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, Json(payload)).into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Judge0 stand-in answering every request with the next scripted response
pub struct MockJudge {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockJudge {
    pub async fn start(responses: Vec<(u16, Value)>) -> Self {
        let state = MockJudgeState {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let requests = state.requests.clone();

        let app = Router::new().fallback(handle).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock judge");
        let addr = listener.local_addr().expect("mock judge address");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
        });

        Self { addr, shutdown_tx, requests }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// An address nothing is listening on
    pub fn unused_address() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
        let addr = listener.local_addr().expect("probe address");
        drop(listener);
        format!("http://{}", addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Outcome scripted for one `create_submission` call
pub enum Script {
    /// Successive `fetch_result` answers; the last one repeats
    Results(Vec<RawResult>),
    CreateFails(ExecutionError),
}

/// In-memory judge that hands out tokens in order and replays scripted
/// results, counting every call
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<VecDeque<Script>>,
    pending: Mutex<HashMap<String, VecDeque<Result<RawResult, ExecutionError>>>>,
    fetch_errors: Mutex<VecDeque<ExecutionError>>,
    pub creates: AtomicUsize,
    pub fetches: AtomicUsize,
    pub waits: AtomicUsize,
    pub submitted: Mutex<Vec<SubmissionRequest>>,
}

impl ScriptedApi {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        }
    }

    /// Make the next fetches fail with these errors before replaying results
    pub fn with_fetch_errors(self, errors: Vec<ExecutionError>) -> Self {
        *self.fetch_errors.lock().unwrap() = errors.into();
        self
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionApi for ScriptedApi {
    async fn create_submission(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionToken, ExecutionError> {
        let n = self.creates.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request.clone());

        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Results(results)) => {
                let token = format!("tok-{}", n + 1);
                self.pending
                    .lock()
                    .unwrap()
                    .insert(token.clone(), results.into_iter().map(Ok).collect());
                Ok(SubmissionToken(token))
            }
            Some(Script::CreateFails(err)) => Err(err),
            None => Err(ExecutionError::Request("no script left".into())),
        }
    }

    async fn fetch_result(&self, token: &SubmissionToken) -> Result<RawResult, ExecutionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fetch_errors.lock().unwrap().pop_front() {
            return Err(err);
        }

        let mut pending = self.pending.lock().unwrap();
        let queue = pending
            .get_mut(token.as_str())
            .ok_or_else(|| ExecutionError::Rejected { status: 404, body: "unknown token".into() })?;
        let next = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        let mut raw = next.unwrap_or_else(|| Ok(RawResult::default()))?;
        raw.token = Some(token.to_string());
        Ok(raw)
    }

    async fn submit_and_wait(
        &self,
        request: &SubmissionRequest,
    ) -> Result<RawResult, ExecutionError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request.clone());

        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Results(results)) => Ok(results.last().cloned().unwrap_or_default()),
            Some(Script::CreateFails(err)) => Err(err),
            None => Err(ExecutionError::Request("no script left".into())),
        }
    }
}

pub fn raw(id: i32, description: &str, stdout: Option<&str>) -> RawResult {
    RawResult {
        token: None,
        status: Some(JudgeStatus::new(id, description)),
        stdout: stdout.map(str::to_string),
        stderr: None,
        compile_output: None,
        message: None,
        time: Some(0.01),
        memory: Some(1024),
    }
}

pub fn accepted(stdout: &str) -> RawResult {
    raw(3, "Accepted", Some(stdout))
}

pub fn wrong_answer(stdout: &str) -> RawResult {
    raw(4, "Wrong Answer", Some(stdout))
}

pub fn compilation_error(output: &str) -> RawResult {
    RawResult {
        compile_output: Some(output.to_string()),
        time: None,
        memory: None,
        ..raw(6, "Compilation Error", None)
    }
}

pub fn in_queue() -> RawResult {
    raw(1, "In Queue", None)
}

pub fn processing() -> RawResult {
    raw(2, "Processing", None)
}
