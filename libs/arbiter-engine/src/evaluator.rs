/// Batch Evaluator - Weighted Scoring over a Test Suite
///
/// **Core Responsibility:**
/// Run an ordered list of test cases against one program and fold the
/// verdicts into an [`EvaluationResult`].
///
/// **Scoring Rules:**
/// - Each test case has a weight
/// - score = sum of weights for passed tests
/// - max_score = sum of all test case weights, whether or not they ran
///
/// **Policies:**
/// - Scored mode stops at the first compilation error (unless disabled) and
///   reports every remaining test as "Not Run" without submitting it
/// - Hidden test cases are reported without input or captured streams
/// - Test cases run one after another, in order
///
/// **Legacy Mode:**
/// No short-circuit. Pass requires `Accepted` unless the caller opts into
/// [`OutputPolicy::TrustOutput`], which also accepts a trimmed stdout that
/// matches the expected output.

use crate::runner::TestRunner;
use arbiter_common::types::{
    EvaluationResult, ExecutionLimits, ExecutionTarget, SubmissionRequest, TestCase, TestResult,
    Verdict,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// How legacy mode decides whether a test passed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPolicy {
    /// Only an `Accepted` status passes
    #[default]
    Strict,
    /// Matching output passes even when the status says otherwise.
    /// A program killed after flushing the right answer will pass; a test
    /// with no captured stdout never does.
    TrustOutput,
}

/// The program under evaluation: prepared source, target and limits
#[derive(Debug, Clone, Copy)]
pub struct Program<'a> {
    pub source_code: &'a str,
    pub target: ExecutionTarget,
    pub limits: ExecutionLimits,
}

impl Program<'_> {
    fn request_for(&self, test_case: &TestCase) -> SubmissionRequest {
        SubmissionRequest::new(self.source_code, self.target, test_case.input.as_str())
            .with_expected_output(test_case.expected_output.as_str())
            .with_limits(self.limits)
    }
}

/// Normalize output string for comparison
///
/// Trims leading and trailing whitespace (which also absorbs `\r\n` vs `\n`
/// at the end). Internal whitespace and case are preserved.
pub fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Legacy pass rule
pub fn legacy_passes(verdict: &Verdict, expected_output: &str, policy: OutputPolicy) -> bool {
    match policy {
        OutputPolicy::Strict => verdict.passed,
        // Only output the judge actually returned can stand in for the status
        OutputPolicy::TrustOutput => {
            verdict.passed
                || verdict
                    .stdout
                    .as_deref()
                    .is_some_and(|out| normalize_output(out) == normalize_output(expected_output))
        }
    }
}

fn max_score(test_cases: &[TestCase]) -> u64 {
    test_cases.iter().map(|tc| u64::from(tc.weight)).sum()
}

/// Scored mode: weighted score, compile-error short-circuit, hidden redaction
#[instrument(skip_all, fields(language_id = program.target.id(), test_count = test_cases.len()))]
pub async fn run_all(
    runner: &TestRunner<'_>,
    program: &Program<'_>,
    test_cases: &[TestCase],
    stop_on_compile_error: bool,
) -> EvaluationResult {
    let mut result = EvaluationResult {
        total: test_cases.len() as u32,
        max_score: max_score(test_cases),
        results: Vec::with_capacity(test_cases.len()),
        ..Default::default()
    };

    for (idx, test_case) in test_cases.iter().enumerate() {
        let verdict = runner.run(&program.request_for(test_case)).await;
        let compile_failed = verdict.is_compilation_error();

        if verdict.passed {
            result.passed += 1;
            result.score += u64::from(test_case.weight);
        }
        result.results.push(TestResult::from_verdict(test_case, verdict));

        if compile_failed {
            result.compilation_error = true;
            if stop_on_compile_error {
                let skipped = &test_cases[idx + 1..];
                warn!(
                    test_id = test_case.id,
                    skipped = skipped.len(),
                    "Compilation error, remaining test cases not run"
                );
                result.results.extend(skipped.iter().map(TestResult::not_run));
                break;
            }
        }
    }

    info!(
        passed = result.passed,
        total = result.total,
        score = result.score,
        max_score = result.max_score,
        compilation_error = result.compilation_error,
        "Evaluation complete"
    );
    result
}

/// Legacy weighted mode: runs every test case, pass rule set by `policy`
#[instrument(skip_all, fields(language_id = program.target.id(), test_count = test_cases.len(), policy = ?policy))]
pub async fn evaluate(
    runner: &TestRunner<'_>,
    program: &Program<'_>,
    test_cases: &[TestCase],
    policy: OutputPolicy,
) -> EvaluationResult {
    let mut result = EvaluationResult {
        total: test_cases.len() as u32,
        max_score: max_score(test_cases),
        results: Vec::with_capacity(test_cases.len()),
        ..Default::default()
    };

    for test_case in test_cases {
        let mut verdict = runner.run(&program.request_for(test_case)).await;
        let passed = legacy_passes(&verdict, &test_case.expected_output, policy);
        if passed && !verdict.passed {
            warn!(
                test_id = test_case.id,
                status_id = ?verdict.status_id(),
                "Output matched despite non-accepted status, counting as pass"
            );
        }
        verdict.passed = passed;

        if verdict.is_compilation_error() {
            result.compilation_error = true;
        }
        if passed {
            result.passed += 1;
            result.score += u64::from(test_case.weight);
        }
        result.results.push(TestResult::from_verdict(test_case, verdict));
    }

    info!(
        passed = result.passed,
        total = result.total,
        score = result.score,
        max_score = result.max_score,
        "Legacy evaluation complete"
    );
    result
}
