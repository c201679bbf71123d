// Single test case orchestration
// Submit, poll to a terminal status, reduce to a Verdict. Never fails.

use crate::client::SubmissionApi;
use crate::error::ExecutionError;
use crate::metrics;
use crate::poller;
use arbiter_common::config::PollSettings;
use arbiter_common::types::{status, JudgeStatus, SubmissionRequest, SubmissionToken, Verdict};
use tracing::{debug, error};

pub const EXECUTION_ERROR: &str = "Execution Error";

pub struct TestRunner<'a> {
    api: &'a dyn SubmissionApi,
    poll: PollSettings,
}

impl<'a> TestRunner<'a> {
    pub fn new(api: &'a dyn SubmissionApi, poll: PollSettings) -> Self {
        Self { api, poll }
    }

    /// Run one (source, stdin, expected output) triple through the judge
    pub async fn run(&self, request: &SubmissionRequest) -> Verdict {
        let verdict = match self.api.create_submission(request).await {
            Ok(token) => self.wait_for(&token).await,
            Err(e) => {
                error!(language_id = request.target.id(), error = %e, "Submission failed");
                execution_error(e)
            }
        };

        debug!(
            token = ?verdict.token,
            passed = verdict.passed,
            status_id = ?verdict.status_id(),
            "Test case finished"
        );
        metrics::record_verdict(verdict.status_id());
        verdict
    }

    /// Single-shot run where the judge blocks until completion
    pub async fn run_blocking(&self, request: &SubmissionRequest) -> Verdict {
        let verdict = match self.api.submit_and_wait(request).await {
            Ok(raw) => Verdict::from(raw),
            Err(e) => {
                error!(language_id = request.target.id(), error = %e, "Run failed");
                execution_error(e)
            }
        };
        metrics::record_verdict(verdict.status_id());
        verdict
    }

    /// Poll an accepted submission; a failure keeps the token for tracing
    async fn wait_for(&self, token: &SubmissionToken) -> Verdict {
        match poller::poll(self.api, token, self.poll).await {
            Ok(raw) => Verdict::from(raw),
            Err(e) => {
                error!(token = %token, error = %e, "Polling failed");
                Verdict {
                    token: Some(token.to_string()),
                    ..execution_error(e)
                }
            }
        }
    }
}

/// Failing verdict standing in for a request the judge never answered
pub fn execution_error(err: ExecutionError) -> Verdict {
    let message = err.to_string();
    Verdict {
        token: None,
        passed: false,
        status: Some(JudgeStatus::new(status::INTERNAL_ERROR, EXECUTION_ERROR)),
        stdout: None,
        stderr: Some(message.clone()),
        compile_output: None,
        time: None,
        memory: None,
        message: Some(message),
    }
}
