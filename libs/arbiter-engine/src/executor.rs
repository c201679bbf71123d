/// Executor - Entry Points for Collaborators
///
/// **Responsibility:**
/// Tie the language registry, runner and evaluator together behind the
/// operations callers use: resolve a language, run one program, run a suite.
///
/// Callers hand in already-prepared source code. Nothing here raises for a
/// per-test problem; every call returns a Verdict or an EvaluationResult.

use crate::client::SubmissionApi;
use crate::evaluator::{self, OutputPolicy, Program};
use crate::runner::TestRunner;
use arbiter_common::config::PollSettings;
use arbiter_common::languages::{LanguageRegistry, UnknownLanguage};
use arbiter_common::types::{
    EvaluationResult, ExecutionLimits, ExecutionTarget, SubmissionRequest, TestCase, Verdict,
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct Executor {
    api: Arc<dyn SubmissionApi>,
    languages: LanguageRegistry,
    poll: PollSettings,
}

impl Executor {
    pub fn new(api: Arc<dyn SubmissionApi>, languages: LanguageRegistry, poll: PollSettings) -> Self {
        Self { api, languages, poll }
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn resolve_language(&self, name_or_id: &str) -> Result<ExecutionTarget, UnknownLanguage> {
        self.languages.resolve(name_or_id)
    }

    fn runner(&self) -> TestRunner<'_> {
        TestRunner::new(self.api.as_ref(), self.poll)
    }

    /// Run a program once, letting the judge block until it finishes
    pub async fn run_code(
        &self,
        source_code: &str,
        target: ExecutionTarget,
        stdin: &str,
        limits: ExecutionLimits,
    ) -> Verdict {
        let request = SubmissionRequest::new(source_code, target, stdin).with_limits(limits);
        self.runner().run_blocking(&request).await
    }

    /// Run one test case: submit, poll, reduce
    pub async fn run_single(
        &self,
        source_code: &str,
        target: ExecutionTarget,
        stdin: &str,
        expected_output: &str,
        limits: ExecutionLimits,
    ) -> Verdict {
        let request = SubmissionRequest::new(source_code, target, stdin)
            .with_expected_output(expected_output)
            .with_limits(limits);
        self.runner().run(&request).await
    }

    /// Scored batch run with hidden-test redaction
    pub async fn run_batch(
        &self,
        source_code: &str,
        target: ExecutionTarget,
        test_cases: &[TestCase],
        limits: ExecutionLimits,
        stop_on_compile_error: bool,
    ) -> EvaluationResult {
        info!(
            language_id = target.id(),
            language = self.languages.name_of(target).unwrap_or("unknown"),
            test_cases = test_cases.len(),
            source_size = source_code.len(),
            stop_on_compile_error,
            "Starting batch evaluation"
        );

        let program = Program { source_code, target, limits };
        evaluator::run_all(&self.runner(), &program, test_cases, stop_on_compile_error).await
    }

    /// Legacy weighted run without the compile-error short-circuit
    pub async fn evaluate_weighted(
        &self,
        source_code: &str,
        target: ExecutionTarget,
        test_cases: &[TestCase],
        limits: ExecutionLimits,
        policy: OutputPolicy,
    ) -> EvaluationResult {
        info!(
            language_id = target.id(),
            test_cases = test_cases.len(),
            policy = ?policy,
            "Starting legacy evaluation"
        );

        let program = Program { source_code, target, limits };
        evaluator::evaluate(&self.runner(), &program, test_cases, policy).await
    }
}
