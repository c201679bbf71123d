// CLI commands for talking to the judge
use anyhow::{bail, Context, Result};
use arbiter_common::languages::LanguageEntry;
use arbiter_common::types::{EvaluationResult, ExecutionLimits, ExecutionTarget, TestCase};
use arbiter_common::{JudgeConfig, LanguageRegistry};
use arbiter_engine::{Executor, JudgeClient, OutputPolicy};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

struct Session {
    client: Arc<JudgeClient>,
    executor: Executor,
}

fn connect() -> Result<Session> {
    let config = JudgeConfig::from_env().context("Invalid judge configuration")?;
    let registry = LanguageRegistry::builtin().context("Language table is inconsistent")?;
    let poll = config.poll_settings();
    let client = Arc::new(JudgeClient::new(config).context("Failed to build judge client")?);
    let executor = Executor::new(client.clone(), registry, poll);
    Ok(Session { client, executor })
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_optional(path: Option<&Path>) -> Result<String> {
    path.map(read_file).transpose().map(Option::unwrap_or_default)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve(session: &Session, language: &str) -> Result<ExecutionTarget> {
    Ok(session.executor.resolve_language(language)?)
}

/// Parse a test suite file: a JSON array of test cases with positive weights
pub fn parse_test_cases(content: &str) -> Result<Vec<TestCase>> {
    let cases: Vec<TestCase> =
        serde_json::from_str(content).context("Failed to parse test cases")?;

    if cases.is_empty() {
        bail!("Test suite is empty");
    }
    if let Some(case) = cases.iter().find(|c| c.weight == 0) {
        bail!("Test case {} has weight 0", case.id);
    }

    Ok(cases)
}

/// Number of tests left unrun, when the program did not compile
fn skipped_after_compile_error(result: &EvaluationResult) -> Option<usize> {
    result
        .compilation_error
        .then(|| result.results.iter().filter(|r| r.is_not_run()).count())
}

#[derive(Serialize)]
struct LanguageReport<'a> {
    languages: &'a [LanguageEntry],
    #[serde(skip_serializing_if = "Option::is_none")]
    missing: Option<Vec<&'a LanguageEntry>>,
}

/// Print the registry, optionally cross-checked against the judge
pub async fn list_languages(verify: bool) -> Result<()> {
    let session = connect()?;
    let registry = session.executor.languages();

    let missing = if verify {
        let available = session
            .client
            .list_languages()
            .await
            .context("Failed to list judge languages")?;
        let missing = registry.verify_against(&available);
        for entry in &missing {
            warn!(
                language = %entry.name,
                target = entry.target.id(),
                "Registered language is not offered by the judge"
            );
        }
        Some(missing)
    } else {
        None
    };

    print_json(&LanguageReport {
        languages: registry.entries(),
        missing,
    })
}

pub async fn run(language: &str, file: &Path, stdin_file: Option<&Path>) -> Result<()> {
    let session = connect()?;
    let target = resolve(&session, language)?;
    let source = read_file(file)?;
    let stdin = read_optional(stdin_file)?;

    let verdict = session
        .executor
        .run_code(&source, target, &stdin, ExecutionLimits::default())
        .await;
    print_json(&verdict)
}

pub async fn test(
    language: &str,
    file: &Path,
    stdin_file: Option<&Path>,
    expected_file: &Path,
) -> Result<()> {
    let session = connect()?;
    let target = resolve(&session, language)?;
    let source = read_file(file)?;
    let stdin = read_optional(stdin_file)?;
    let expected = read_file(expected_file)?;

    let verdict = session
        .executor
        .run_single(&source, target, &stdin, &expected, ExecutionLimits::default())
        .await;
    print_json(&verdict)
}

pub async fn evaluate(
    language: &str,
    file: &Path,
    tests: &Path,
    stop_on_compile_error: bool,
    legacy: bool,
    trust_output: bool,
) -> Result<()> {
    let session = connect()?;
    let target = resolve(&session, language)?;
    let source = read_file(file)?;
    let test_cases = parse_test_cases(&read_file(tests)?)?;

    let result = if legacy {
        let policy = if trust_output {
            OutputPolicy::TrustOutput
        } else {
            OutputPolicy::Strict
        };
        session
            .executor
            .evaluate_weighted(&source, target, &test_cases, ExecutionLimits::default(), policy)
            .await
    } else {
        session
            .executor
            .run_batch(
                &source,
                target,
                &test_cases,
                ExecutionLimits::default(),
                stop_on_compile_error,
            )
            .await
    };

    if let Some(not_run) = skipped_after_compile_error(&result) {
        warn!(not_run, "Program failed to compile");
    }
    info!(
        passed = result.passed,
        total = result.total,
        score = result.score,
        max_score = result.max_score,
        "Evaluation finished"
    );

    print_json(&result)
}
