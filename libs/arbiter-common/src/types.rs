use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Judge status ids (Judge0 vocabulary)
pub mod status {
    pub const IN_QUEUE: i32 = 1;
    pub const PROCESSING: i32 = 2;
    pub const ACCEPTED: i32 = 3;
    pub const WRONG_ANSWER: i32 = 4;
    pub const TIME_LIMIT_EXCEEDED: i32 = 5;
    pub const COMPILATION_ERROR: i32 = 6;
    pub const RUNTIME_ERROR_SIGSEGV: i32 = 7;
    pub const RUNTIME_ERROR_OTHER: i32 = 12;
    pub const INTERNAL_ERROR: i32 = 13;
    pub const EXEC_FORMAT_ERROR: i32 = 14;

    /// Synthetic id for test cases skipped after a compilation error
    pub const NOT_RUN: i32 = -1;

    /// Queued or processing - the submission has not finished yet
    pub fn is_pending(id: i32) -> bool {
        id == IN_QUEUE || id == PROCESSING
    }

    pub fn is_runtime_error(id: i32) -> bool {
        (RUNTIME_ERROR_SIGSEGV..=RUNTIME_ERROR_OTHER).contains(&id)
    }
}

/// Numeric language/compiler identifier understood by the judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTarget(pub u32);

impl ExecutionTarget {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle for one in-flight or finished submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionToken(pub String);

impl SubmissionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resource limits forwarded to the judge; unset fields are left to the
/// judge's own defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Seconds of CPU time
    #[serde(default)]
    pub cpu_time_limit: Option<f64>,
    /// Kilobytes
    #[serde(default)]
    pub memory_limit: Option<u64>,
    /// Seconds of wall-clock time
    #[serde(default)]
    pub wall_time_limit: Option<f64>,
}

/// One execution request. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub target: ExecutionTarget,
    pub stdin: String,
    pub expected_output: Option<String>,
    pub limits: ExecutionLimits,
}

impl SubmissionRequest {
    pub fn new(source_code: impl Into<String>, target: ExecutionTarget, stdin: impl Into<String>) -> Self {
        Self {
            source_code: source_code.into(),
            target,
            stdin: stdin.into(),
            expected_output: None,
            limits: ExecutionLimits::default(),
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeStatus {
    pub id: i32,
    #[serde(default)]
    pub description: String,
}

impl JudgeStatus {
    pub fn new(id: i32, description: impl Into<String>) -> Self {
        Self { id, description: description.into() }
    }

    pub fn is_pending(&self) -> bool {
        status::is_pending(self.id)
    }

    pub fn is_accepted(&self) -> bool {
        self.id == status::ACCEPTED
    }

    pub fn is_compilation_error(&self) -> bool {
        self.id == status::COMPILATION_ERROR
    }
}

/// Result object as returned by the judge, after transport decoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub status: Option<JudgeStatus>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds
    #[serde(default, deserialize_with = "seconds")]
    pub time: Option<f64>,
    /// Kilobytes
    #[serde(default)]
    pub memory: Option<u64>,
}

impl RawResult {
    pub fn status_id(&self) -> Option<i32> {
        self.status.as_ref().map(|s| s.id)
    }

    /// Still queued or processing on the judge side
    pub fn is_pending(&self) -> bool {
        self.status.as_ref().is_some_and(JudgeStatus::is_pending)
    }
}

/// The judge reports `time` as a decimal string ("0.012"); accept numbers too.
fn seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(f64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(n)),
        Some(Seconds::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Normalized outcome of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub token: Option<String>,
    pub passed: bool,
    pub status: Option<JudgeStatus>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<f64>,
    pub memory: Option<u64>,
    pub message: Option<String>,
}

impl Verdict {
    pub fn status_id(&self) -> Option<i32> {
        self.status.as_ref().map(|s| s.id)
    }

    pub fn is_compilation_error(&self) -> bool {
        self.status.as_ref().is_some_and(JudgeStatus::is_compilation_error)
    }
}

impl From<RawResult> for Verdict {
    fn from(raw: RawResult) -> Self {
        let passed = raw.status.as_ref().is_some_and(JudgeStatus::is_accepted);
        Verdict {
            token: raw.token,
            passed,
            status: raw.status,
            stdout: raw.stdout,
            stderr: raw.stderr,
            compile_output: raw.compile_output,
            time: raw.time,
            memory: raw.memory,
            message: raw.message,
        }
    }
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: u32,
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

/// Per-test entry in an [`EvaluationResult`].
///
/// Hidden test cases are reported through [`HiddenTestResult`], which has no
/// fields for input or captured streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestResult {
    Public(PublicTestResult),
    Hidden(HiddenTestResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTestResult {
    pub id: u32,
    pub hidden: bool,
    pub passed: bool,
    pub status: Option<JudgeStatus>,
    pub time: Option<f64>,
    pub memory: Option<u64>,
    pub stdin: String,
    pub expected_output: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiddenTestResult {
    pub id: u32,
    pub hidden: bool,
    pub passed: bool,
    pub status: Option<JudgeStatus>,
    pub time: Option<f64>,
    pub memory: Option<u64>,
}

impl TestResult {
    /// Build the entry for `test_case`, redacting it if the test is hidden
    pub fn from_verdict(test_case: &TestCase, verdict: Verdict) -> Self {
        if test_case.hidden {
            TestResult::Hidden(HiddenTestResult {
                id: test_case.id,
                hidden: true,
                passed: verdict.passed,
                status: verdict.status,
                time: verdict.time,
                memory: verdict.memory,
            })
        } else {
            TestResult::Public(PublicTestResult {
                id: test_case.id,
                hidden: false,
                passed: verdict.passed,
                status: verdict.status,
                time: verdict.time,
                memory: verdict.memory,
                stdin: test_case.input.clone(),
                expected_output: test_case.expected_output.clone(),
                stdout: verdict.stdout,
                stderr: verdict.stderr,
                compile_output: verdict.compile_output,
            })
        }
    }

    /// Entry for a test case that was never submitted
    pub fn not_run(test_case: &TestCase) -> Self {
        let verdict = Verdict {
            token: None,
            passed: false,
            status: Some(JudgeStatus::new(status::NOT_RUN, "Not Run")),
            stdout: None,
            stderr: None,
            compile_output: None,
            time: None,
            memory: None,
            message: Some("Skipped after compilation error".to_string()),
        };
        Self::from_verdict(test_case, verdict)
    }

    pub fn id(&self) -> u32 {
        match self {
            TestResult::Public(r) => r.id,
            TestResult::Hidden(r) => r.id,
        }
    }

    pub fn passed(&self) -> bool {
        match self {
            TestResult::Public(r) => r.passed,
            TestResult::Hidden(r) => r.passed,
        }
    }

    pub fn status(&self) -> Option<&JudgeStatus> {
        match self {
            TestResult::Public(r) => r.status.as_ref(),
            TestResult::Hidden(r) => r.status.as_ref(),
        }
    }

    pub fn is_not_run(&self) -> bool {
        self.status().is_some_and(|s| s.id == status::NOT_RUN)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub passed: u32,
    pub total: u32,
    /// Sum of weights of passed tests, widened so no weight combination overflows
    pub score: u64,
    pub max_score: u64,
    pub compilation_error: bool,
    pub results: Vec<TestResult>,
}

impl EvaluationResult {
    pub fn all_passed(&self) -> bool {
        self.total > 0 && self.passed == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(id: u32, hidden: bool) -> TestCase {
        TestCase {
            id,
            input: "1 2".to_string(),
            expected_output: "3".to_string(),
            hidden,
            weight: 1,
        }
    }

    fn accepted() -> Verdict {
        Verdict::from(RawResult {
            token: Some("abc".to_string()),
            status: Some(JudgeStatus::new(status::ACCEPTED, "Accepted")),
            stdout: Some("3\n".to_string()),
            stderr: Some(String::new()),
            compile_output: None,
            message: None,
            time: Some(0.01),
            memory: Some(3000),
        })
    }

    #[test]
    fn test_status_helpers() {
        assert!(status::is_pending(status::IN_QUEUE));
        assert!(status::is_pending(status::PROCESSING));
        assert!(!status::is_pending(status::ACCEPTED));
        assert!(status::is_runtime_error(7));
        assert!(status::is_runtime_error(12));
        assert!(!status::is_runtime_error(13));
    }

    #[test]
    fn test_verdict_passed_only_when_accepted() {
        for id in 3..=14 {
            let verdict = Verdict::from(RawResult {
                status: Some(JudgeStatus::new(id, "")),
                ..Default::default()
            });
            assert_eq!(verdict.passed, id == status::ACCEPTED, "status {}", id);
        }

        let missing = Verdict::from(RawResult::default());
        assert!(!missing.passed);
    }

    #[test]
    fn test_raw_result_parses_judge_payload() {
        let raw: RawResult = serde_json::from_str(
            r#"{"stdout":"hi\n","time":"0.004","memory":3320,"stderr":null,
                "token":"t-1","compile_output":null,"message":null,
                "status":{"id":3,"description":"Accepted"}}"#,
        )
        .unwrap();

        assert_eq!(raw.status_id(), Some(3));
        assert_eq!(raw.time, Some(0.004));
        assert_eq!(raw.memory, Some(3320));
        assert_eq!(raw.stdout.as_deref(), Some("hi\n"));
        assert!(!raw.is_pending());
    }

    #[test]
    fn test_raw_result_numeric_time() {
        let raw: RawResult = serde_json::from_str(r#"{"time":0.5,"status":{"id":1}}"#).unwrap();
        assert_eq!(raw.time, Some(0.5));
        assert!(raw.is_pending());
    }

    #[test]
    fn test_hidden_entry_has_no_stream_keys() {
        let entry = TestResult::from_verdict(&case(7, true), accepted());
        let json = serde_json::to_value(&entry).unwrap();
        let obj = json.as_object().unwrap();

        for key in ["stdin", "stdout", "stderr", "compile_output", "expected_output"] {
            assert!(!obj.contains_key(key), "hidden entry leaked {}", key);
        }
        assert_eq!(obj["id"], 7);
        assert_eq!(obj["hidden"], true);
        assert_eq!(obj["passed"], true);
    }

    #[test]
    fn test_public_entry_keeps_stream_keys() {
        let entry = TestResult::from_verdict(&case(1, false), accepted());
        let json = serde_json::to_value(&entry).unwrap();
        let obj = json.as_object().unwrap();

        for key in ["stdin", "stdout", "stderr", "compile_output"] {
            assert!(obj.contains_key(key), "public entry missing {}", key);
        }
        assert_eq!(obj["stdin"], "1 2");
        assert!(obj["compile_output"].is_null());
    }

    #[test]
    fn test_not_run_entry() {
        let entry = TestResult::not_run(&case(2, false));
        assert!(!entry.passed());
        assert!(entry.is_not_run());
        assert_eq!(entry.status().map(|s| s.id), Some(status::NOT_RUN));
    }

    #[test]
    fn test_test_case_defaults() {
        let tc: TestCase = serde_json::from_str(r#"{"id":1,"expected_output":"x"}"#).unwrap();
        assert_eq!(tc.weight, 1);
        assert!(!tc.hidden);
        assert_eq!(tc.input, "");
    }
}
