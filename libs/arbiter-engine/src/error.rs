use thiserror::Error;

/// Failures talking to the judge.
///
/// Only [`ExecutionError::Transport`] is retried; everything else is a
/// permanent rejection of this particular request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Judge rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Judge response did not include a submission token")]
    MissingToken,
    #[error("Malformed judge response: {0}")]
    Malformed(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Judge unreachable after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ExecutionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ExecutionError::Transport(_))
    }
}

impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        // A connection closed or reset mid-exchange surfaces as a request error
        if err.is_connect() || err.is_timeout() || err.is_body() || err.is_request() {
            ExecutionError::Transport(err.to_string())
        } else if err.is_decode() {
            ExecutionError::Malformed(err.to_string())
        } else {
            ExecutionError::Request(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_transient() {
        assert!(ExecutionError::Transport("reset".into()).is_transient());
        assert!(!ExecutionError::MissingToken.is_transient());
        assert!(!ExecutionError::Rejected { status: 422, body: String::new() }.is_transient());
        assert!(!ExecutionError::RetriesExhausted { attempts: 3, last_error: "x".into() }.is_transient());
    }

    #[test]
    fn test_exhausted_message_carries_last_error() {
        let err = ExecutionError::RetriesExhausted {
            attempts: 4,
            last_error: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Judge unreachable after 4 attempts: connection refused"
        );
    }
}
