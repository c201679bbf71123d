/// Polling Coordinator
///
/// Re-reads a submission until it leaves `In Queue`/`Processing` or the
/// attempt budget runs out. Exhaustion is not an error: a synthetic
/// `Internal Error` result ("Polling Timeout") is returned so the caller's
/// verdict path stays uniform.

use crate::client::SubmissionApi;
use crate::error::ExecutionError;
use crate::metrics;
use arbiter_common::config::PollSettings;
use arbiter_common::types::{status, JudgeStatus, RawResult, SubmissionToken};
use tracing::{debug, warn};

pub const POLLING_TIMEOUT: &str = "Polling Timeout";

/// Poll `token` until it reaches a terminal status.
///
/// Makes at most `settings.max_attempts` fetch calls and never returns a
/// pending status. Transient transport failures on a fetch use up one
/// attempt; any other fetch error is returned.
pub async fn poll(
    api: &dyn SubmissionApi,
    token: &SubmissionToken,
    settings: PollSettings,
) -> Result<RawResult, ExecutionError> {
    for attempt in 1..=settings.max_attempts {
        match api.fetch_result(token).await {
            Ok(raw) if !raw.is_pending() => {
                debug!(token = %token, attempt, status_id = ?raw.status_id(), "Submission finished");
                return Ok(raw);
            }
            Ok(raw) => {
                debug!(token = %token, attempt, status_id = ?raw.status_id(), "Submission pending");
            }
            Err(e) if e.is_transient() => {
                warn!(token = %token, attempt, error = %e, "Poll fetch failed, will retry");
            }
            Err(e) => return Err(e),
        }

        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.interval).await;
        }
    }

    warn!(
        token = %token,
        max_attempts = settings.max_attempts,
        interval_ms = settings.interval.as_millis() as u64,
        "Submission still pending after poll budget"
    );
    metrics::POLL_TIMEOUTS.inc();
    Ok(polling_timeout(token, settings))
}

fn polling_timeout(token: &SubmissionToken, settings: PollSettings) -> RawResult {
    RawResult {
        token: Some(token.to_string()),
        status: Some(JudgeStatus::new(status::INTERNAL_ERROR, POLLING_TIMEOUT)),
        stdout: None,
        stderr: Some(format!(
            "Submission {} did not finish after {} polls ({}ms apart)",
            token,
            settings.max_attempts,
            settings.interval.as_millis()
        )),
        compile_output: None,
        message: Some(POLLING_TIMEOUT.to_string()),
        time: None,
        memory: None,
    }
}
