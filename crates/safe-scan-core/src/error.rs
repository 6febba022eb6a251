//! Error taxonomy shared by every Safe Scan component.
//!
//! Library code returns [`ScanError`]; binaries wrap it in `anyhow` and the
//! HTTP layer maps each variant onto a status code.

use thiserror::Error;

/// Classified failure of a scan, report, feedback, or counter operation.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Malformed URL, empty file, or otherwise unusable request.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Blank feedback text.
    #[error("input must not be empty")]
    EmptyInput,

    /// File larger than the upstream upload limit.
    #[error("file is {size} bytes, exceeding the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Non-success HTTP status from the scanning service.
    #[error("upstream returned {status}: {body}")]
    UpstreamError { status: u16, body: String },

    /// The scanning service answered, but without the fields we need.
    #[error("malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    /// Network-level failure talking to the scanning service.
    #[error("transport error: {0}")]
    Transport(String),

    /// The analysis did not reach a terminal state within the attempt budget.
    #[error("analysis timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The scanning service reported the analysis itself as failed.
    #[error("analysis failed")]
    AnalysisFailed,

    /// A completed analysis without usable stats.
    #[error("invalid report: {0}")]
    InvalidReport(String),

    /// Feedback or counter persistence failure.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl ScanError {
    /// Whether a poll attempt that failed this way may be retried.
    ///
    /// Network failures, rate limiting, and upstream 5xx responses are
    /// transient. Everything else ends the poll loop.
    pub fn is_transient(&self) -> bool {
        match self {
            ScanError::Transport(_) => true,
            ScanError::UpstreamError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ScanError::InvalidInput(_) => "invalid_input",
            ScanError::EmptyInput => "empty_input",
            ScanError::PayloadTooLarge { .. } => "payload_too_large",
            ScanError::UpstreamError { .. } => "upstream_error",
            ScanError::MalformedUpstreamResponse(_) => "malformed_upstream_response",
            ScanError::Transport(_) => "transport_error",
            ScanError::Timeout { .. } => "timeout",
            ScanError::AnalysisFailed => "analysis_failed",
            ScanError::InvalidReport(_) => "invalid_report",
            ScanError::StorageError(_) => "storage_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ScanError::Transport("reset".into()).is_transient());
        assert!(ScanError::UpstreamError {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(ScanError::UpstreamError {
            status: 429,
            body: String::new()
        }
        .is_transient());
        assert!(!ScanError::UpstreamError {
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!ScanError::AnalysisFailed.is_transient());
        assert!(!ScanError::MalformedUpstreamResponse("x".into()).is_transient());
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = ScanError::PayloadTooLarge {
            size: 10,
            limit: 5,
        };
        assert_eq!(err.to_string(), "file is 10 bytes, exceeding the 5 byte limit");
        assert_eq!(err.code(), "payload_too_large");
    }
}
