/// Execution Client - Judge Submission API
///
/// **Core Responsibility:**
/// Talk to a Judge0-compatible service: create submissions, read their
/// results, and decode transport-encoded text fields.
///
/// **Failure Handling:**
/// - Connect/read/timeout failures on create calls are retried a bounded
///   number of times with a fixed delay
/// - Non-2xx responses and missing tokens fail immediately
/// - Result reads are never retried here; the poll loop already re-reads
/// - Undecodable fields are kept as received, logged and counted

use crate::error::ExecutionError;
use crate::metrics;
use arbiter_common::config::JudgeConfig;
use arbiter_common::languages::JudgeLanguage;
use arbiter_common::types::{RawResult, SubmissionRequest, SubmissionToken};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// The judge operations the rest of the engine depends on
#[async_trait]
pub trait SubmissionApi: Send + Sync {
    /// Queue a submission and return its token without waiting
    async fn create_submission(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionToken, ExecutionError>;

    /// Read the current state of a submission
    async fn fetch_result(&self, token: &SubmissionToken) -> Result<RawResult, ExecutionError>;

    /// Create a submission and let the judge block until it finishes
    async fn submit_and_wait(&self, request: &SubmissionRequest)
        -> Result<RawResult, ExecutionError>;
}

#[derive(Debug, Serialize)]
struct SubmissionBody {
    source_code: String,
    language_id: u32,
    stdin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cpu_time_limit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wall_time_limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CreatedSubmission {
    #[serde(default)]
    token: Option<String>,
}

/// HTTP client for one judge deployment.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct JudgeClient {
    http: reqwest::Client,
    config: JudgeConfig,
}

impl JudgeClient {
    pub fn new(config: JudgeConfig) -> Result<Self, ExecutionError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .default_headers(auth_headers(&config)?)
            .build()
            .map_err(|e| ExecutionError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Languages advertised by the judge
    pub async fn list_languages(&self) -> Result<Vec<JudgeLanguage>, ExecutionError> {
        let url = format!("{}/languages", self.config.base_url);
        let response = self.http.get(&url).send().await?;
        read_json(response).await
    }

    fn encode_body(&self, request: &SubmissionRequest) -> SubmissionBody {
        let encode = |text: &str| {
            if self.config.base64_encoded {
                general_purpose::STANDARD.encode(text)
            } else {
                text.to_string()
            }
        };

        SubmissionBody {
            source_code: encode(&request.source_code),
            language_id: request.target.id(),
            stdin: encode(&request.stdin),
            expected_output: request.expected_output.as_deref().map(encode),
            cpu_time_limit: request.limits.cpu_time_limit,
            memory_limit: request.limits.memory_limit,
            wall_time_limit: request.limits.wall_time_limit,
        }
    }

    async fn post_submission<T: DeserializeOwned>(
        &self,
        body: &SubmissionBody,
        wait: bool,
    ) -> Result<T, ExecutionError> {
        let url = format!("{}/submissions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .query(&[
                ("base64_encoded", self.config.base64_encoded.to_string()),
                ("wait", wait.to_string()),
            ])
            .json(body)
            .send()
            .await?;

        read_json(response).await
    }

    fn decode_result(&self, mut raw: RawResult) -> RawResult {
        if self.config.base64_encoded {
            decode_field("stdout", &mut raw.stdout);
            decode_field("stderr", &mut raw.stderr);
            decode_field("compile_output", &mut raw.compile_output);
            decode_field("message", &mut raw.message);
        }
        raw
    }
}

#[async_trait]
impl SubmissionApi for JudgeClient {
    async fn create_submission(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionToken, ExecutionError> {
        let body = self.encode_body(request);
        let created: CreatedSubmission = with_retry(
            "create_submission",
            self.config.max_retries,
            self.config.retry_delay,
            || self.post_submission(&body, false),
        )
        .await?;

        let token = created
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ExecutionError::MissingToken)?;

        metrics::SUBMISSIONS_CREATED.inc();
        debug!(token = %token, language_id = request.target.id(), "Submission created");
        Ok(SubmissionToken(token))
    }

    async fn fetch_result(&self, token: &SubmissionToken) -> Result<RawResult, ExecutionError> {
        let url = format!("{}/submissions/{}", self.config.base_url, token);
        let response = self
            .http
            .get(&url)
            .query(&[("base64_encoded", self.config.base64_encoded.to_string())])
            .send()
            .await?;

        let raw: RawResult = read_json(response).await?;
        Ok(self.decode_result(raw))
    }

    async fn submit_and_wait(
        &self,
        request: &SubmissionRequest,
    ) -> Result<RawResult, ExecutionError> {
        let body = self.encode_body(request);
        let raw: RawResult = with_retry(
            "submit_and_wait",
            self.config.max_retries,
            self.config.retry_delay,
            || self.post_submission(&body, true),
        )
        .await?;

        metrics::SUBMISSIONS_CREATED.inc();
        Ok(self.decode_result(raw))
    }
}

fn auth_headers(config: &JudgeConfig) -> Result<HeaderMap, ExecutionError> {
    let mut headers = HeaderMap::new();
    let Some(key) = config.api_key.as_deref() else {
        return Ok(headers);
    };

    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|e| ExecutionError::Request(format!("Invalid header value: {}", e)))
    };

    if config.is_rapidapi() {
        headers.insert(HeaderName::from_static("x-rapidapi-key"), value(key)?);
        if let Some(host) = config.host() {
            headers.insert(HeaderName::from_static("x-rapidapi-host"), value(host)?);
        }
    } else {
        headers.insert(HeaderName::from_static("x-auth-token"), value(key)?);
    }
    Ok(headers)
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ExecutionError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ExecutionError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ExecutionError::Malformed(e.to_string()))
}

/// Run `call` until it succeeds, fails permanently, or `max_retries` extra
/// attempts have been spent on transient failures
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &str,
    max_retries: u32,
    delay: Duration,
    mut call: F,
) -> Result<T, ExecutionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExecutionError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if attempt > max_retries {
                    error!(operation, attempts = attempt, error = %e, "Giving up on judge request");
                    return Err(ExecutionError::RetriesExhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    });
                }
                warn!(
                    operation,
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient judge failure, retrying"
                );
                metrics::TRANSPORT_RETRIES.inc();
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decode a base64 field in place; on failure keep the original text
pub(crate) fn decode_field(name: &str, value: &mut Option<String>) {
    let Some(encoded) = value.as_deref() else {
        return;
    };

    // Judge0 wraps base64 output at 60 columns
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()));

    match decoded {
        Ok(text) => *value = Some(text),
        Err(e) => {
            metrics::DECODE_FAILURES.inc();
            warn!(field = name, error = %e, "Field is not valid base64, keeping it as received");
        }
    }
}
