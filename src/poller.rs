//! Async poll loop for analysis results.
//!
//! Drives a [`PollTracker`] against an [`AnalysisSource`], sleeping between
//! attempts with `tokio::time::sleep`. The loop ends when the analysis
//! completes, fails, or exhausts its attempt budget. Dropping the returned
//! future cancels polling.

use async_trait::async_trait;
use safe_scan_core::poll::{BackoffPolicy, PollStep, PollTracker};
use safe_scan_core::report::AnalysisReport;
use safe_scan_core::request::AnalysisHandle;
use safe_scan_core::ScanError;
use tracing::{info, warn};

/// Anything that can report the current state of an analysis.
///
/// Implemented by [`ScannerClient`](crate::scanner::ScannerClient); tests
/// supply scripted sources.
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn fetch(&self, handle: &AnalysisHandle) -> Result<AnalysisReport, ScanError>;
}

/// Poll `source` until the analysis behind `handle` reaches a terminal state.
///
/// Issues at most `policy.max_attempts` fetches. Returns the completed
/// payload, or [`ScanError::AnalysisFailed`], [`ScanError::Timeout`], or the
/// last non-retryable fetch error.
pub async fn poll_analysis(
    source: &dyn AnalysisSource,
    handle: &AnalysisHandle,
    policy: &BackoffPolicy,
) -> Result<AnalysisReport, ScanError> {
    let mut tracker = PollTracker::new(policy.clone());

    loop {
        let outcome = source.fetch(handle).await;
        if let Err(e) = &outcome {
            warn!(analysis_id = %handle, attempt = tracker.attempts() + 1, error = %e, "poll attempt failed");
        }

        match tracker.record(outcome) {
            Ok(PollStep::Done(report)) => {
                info!(analysis_id = %handle, attempts = tracker.attempts(), "analysis completed");
                return Ok(report);
            }
            Ok(PollStep::Retry { after }) => {
                info!(
                    analysis_id = %handle,
                    attempt = tracker.attempts(),
                    state = ?tracker.state(),
                    remaining = tracker.remaining_attempts(),
                    next_in_ms = after.as_millis() as u64,
                    "analysis not finished"
                );
                tokio::time::sleep(after).await;
            }
            Err(e) => {
                warn!(analysis_id = %handle, attempts = tracker.attempts(), state = ?tracker.state(), error = %e, "polling stopped");
                return Err(e);
            }
        }
    }
}
