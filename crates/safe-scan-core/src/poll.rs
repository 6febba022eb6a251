//! Backoff policy and the analysis poll state machine.
//!
//! This module holds no timers: [`PollTracker::record`] consumes the outcome
//! of one status request and says whether to stop or how long to wait before
//! the next one. The async loop that actually sleeps lives in the binary
//! crate.
//!
//! # State machine
//!
//! ```text
//! Queued ──▶ InProgress ──▶ Completed
//!   │            │
//!   ├────────────┴────────▶ Failed     (upstream "failed" or hard error)
//!   └─────────────────────▶ TimedOut   (attempt budget spent)
//! ```
//!
//! Transient errors (see [`ScanError::is_transient`]) keep the current state
//! and are retried up to `transient_retries` times in a row. Every attempt,
//! successful or not, counts toward `max_attempts`.

use std::time::Duration;

use serde::Serialize;

use crate::error::{Result, ScanError};
use crate::report::{AnalysisReport, AnalysisStatus};

/// Increasing delay between status requests, bounded by a cap and an
/// attempt budget.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub max: Duration,
    pub max_attempts: u32,
    /// Consecutive transient failures tolerated before giving up.
    pub transient_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(2000),
            multiplier: 1.5,
            max: Duration::from_millis(8000),
            max_attempts: 20,
            transient_retries: 2,
        }
    }
}

impl BackoffPolicy {
    /// Fixed-interval variant: every wait is `interval`.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            initial: interval,
            multiplier: 1.0,
            max: interval,
            max_attempts,
            transient_retries: 0,
        }
    }

    /// Delay to wait after the `attempt`-th request (1-based).
    ///
    /// `initial * multiplier^(attempt - 1)`, capped at `max`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(64) as i32;
        let ms = self.initial.as_millis() as f64 * self.multiplier.powi(exp);
        let capped = ms.min(self.max.as_millis() as f64);
        Duration::from_millis(capped.round() as u64)
    }

    /// Upper bound on the total time spent sleeping across a full budget.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_after(a)).sum()
    }
}

/// Where an analysis is in its lifecycle, as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Queued,
    InProgress,
    Completed,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollState::Completed | PollState::Failed | PollState::TimedOut
        )
    }
}

impl From<AnalysisStatus> for PollState {
    fn from(status: AnalysisStatus) -> Self {
        match status {
            AnalysisStatus::Queued => PollState::Queued,
            AnalysisStatus::InProgress => PollState::InProgress,
            AnalysisStatus::Completed => PollState::Completed,
            AnalysisStatus::Failed => PollState::Failed,
        }
    }
}

/// What the caller should do after recording an attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// The analysis completed; here is the final payload.
    Done(AnalysisReport),
    /// Not finished yet; wait this long and ask again.
    Retry { after: Duration },
}

/// Tracks attempts and state for one analysis handle.
#[derive(Debug, Clone)]
pub struct PollTracker {
    policy: BackoffPolicy,
    state: PollState,
    attempts: u32,
    consecutive_errors: u32,
}

impl PollTracker {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: PollState::Queued,
            attempts: 0,
            consecutive_errors: 0,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(self.attempts)
    }

    /// Whether another status request may be issued.
    pub fn can_attempt(&self) -> bool {
        !self.state.is_terminal() && self.attempts < self.policy.max_attempts
    }

    /// Record the outcome of one status request.
    ///
    /// Returns `Ok(PollStep::Done)` on completion, `Ok(PollStep::Retry)` when
    /// another attempt should follow, and `Err` once the tracker reaches a
    /// terminal failure (`Failed` or `TimedOut`). Outcomes recorded after
    /// the tracker has finished are ignored and leave its state unchanged.
    pub fn record(&mut self, outcome: Result<AnalysisReport>) -> Result<PollStep> {
        match self.state {
            PollState::Completed => {
                return Err(ScanError::InvalidReport(
                    "analysis already completed".to_string(),
                ))
            }
            PollState::Failed => return Err(ScanError::AnalysisFailed),
            _ => {}
        }
        if self.attempts >= self.policy.max_attempts {
            self.state = PollState::TimedOut;
            return Err(ScanError::Timeout {
                attempts: self.attempts,
            });
        }
        self.attempts += 1;

        match outcome {
            Ok(report) => {
                self.consecutive_errors = 0;
                self.state = report.status.into();
                match report.status {
                    AnalysisStatus::Completed => Ok(PollStep::Done(report)),
                    AnalysisStatus::Failed => Err(ScanError::AnalysisFailed),
                    AnalysisStatus::Queued | AnalysisStatus::InProgress => self.next_step(),
                }
            }
            Err(e) if e.is_transient() && self.consecutive_errors < self.policy.transient_retries => {
                self.consecutive_errors += 1;
                self.next_step()
            }
            Err(e) => {
                self.state = PollState::Failed;
                Err(e)
            }
        }
    }

    fn next_step(&mut self) -> Result<PollStep> {
        if self.attempts >= self.policy.max_attempts {
            self.state = PollState::TimedOut;
            return Err(ScanError::Timeout {
                attempts: self.attempts,
            });
        }
        Ok(PollStep::Retry {
            after: self.policy.delay_after(self.attempts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Result<AnalysisReport> {
        Ok(AnalysisReport {
            status: AnalysisStatus::Queued,
            stats: None,
            results: None,
        })
    }

    fn with_status(status: AnalysisStatus) -> Result<AnalysisReport> {
        Ok(AnalysisReport {
            status,
            stats: None,
            results: None,
        })
    }

    #[test]
    fn test_backoff_sequence_caps() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (1..=7)
            .map(|a| policy.delay_after(a).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![2000, 3000, 4500, 6750, 8000, 8000, 8000]);
    }

    #[test]
    fn test_fixed_interval() {
        let policy = BackoffPolicy::fixed(Duration::from_millis(5000), 20);
        assert_eq!(policy.delay_after(1), Duration::from_millis(5000));
        assert_eq!(policy.delay_after(19), Duration::from_millis(5000));
        assert_eq!(policy.worst_case_wait(), Duration::from_millis(5000 * 19));
    }

    #[test]
    fn test_completes() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        assert_eq!(tracker.state(), PollState::Queued);

        let step = tracker.record(with_status(AnalysisStatus::InProgress)).unwrap();
        assert_eq!(
            step,
            PollStep::Retry {
                after: Duration::from_millis(2000)
            }
        );
        assert_eq!(tracker.state(), PollState::InProgress);

        let step = tracker.record(with_status(AnalysisStatus::Completed)).unwrap();
        assert!(matches!(step, PollStep::Done(_)));
        assert_eq!(tracker.state(), PollState::Completed);
        assert!(!tracker.can_attempt());
    }

    #[test]
    fn test_times_out_after_budget() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        for _ in 0..19 {
            assert!(matches!(tracker.record(pending()), Ok(PollStep::Retry { .. })));
        }
        assert!(tracker.can_attempt());
        let err = tracker.record(pending()).unwrap_err();
        assert!(matches!(err, ScanError::Timeout { attempts: 20 }));
        assert_eq!(tracker.state(), PollState::TimedOut);
        assert_eq!(tracker.attempts(), 20);
        assert!(!tracker.can_attempt());
    }

    #[test]
    fn test_upstream_failed_status_is_terminal() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        let err = tracker.record(with_status(AnalysisStatus::Failed)).unwrap_err();
        assert!(matches!(err, ScanError::AnalysisFailed));
        assert_eq!(tracker.state(), PollState::Failed);
    }

    #[test]
    fn test_finished_tracker_keeps_its_state() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        tracker.record(with_status(AnalysisStatus::Completed)).unwrap();
        assert!(tracker.record(pending()).is_err());
        assert_eq!(tracker.state(), PollState::Completed);
        assert_eq!(tracker.attempts(), 1);

        let mut tracker = PollTracker::new(BackoffPolicy::default());
        tracker.record(with_status(AnalysisStatus::Failed)).unwrap_err();
        let err = tracker.record(pending()).unwrap_err();
        assert!(matches!(err, ScanError::AnalysisFailed));
        assert_eq!(tracker.state(), PollState::Failed);
    }

    #[test]
    fn test_transient_errors_retried_then_fail() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        let transient = || Err(ScanError::Transport("connection reset".into()));

        assert!(matches!(tracker.record(transient()), Ok(PollStep::Retry { .. })));
        assert!(matches!(tracker.record(transient()), Ok(PollStep::Retry { .. })));
        let err = tracker.record(transient()).unwrap_err();
        assert!(matches!(err, ScanError::Transport(_)));
        assert_eq!(tracker.state(), PollState::Failed);
        assert_eq!(tracker.attempts(), 3);
    }

    #[test]
    fn test_success_resets_transient_count() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        let transient = || {
            Err(ScanError::UpstreamError {
                status: 503,
                body: "busy".into(),
            })
        };
        assert!(tracker.record(transient()).is_ok());
        assert!(tracker.record(transient()).is_ok());
        assert!(tracker.record(pending()).is_ok());
        assert!(tracker.record(transient()).is_ok());
        assert!(tracker.record(transient()).is_ok());
        assert_eq!(tracker.remaining_attempts(), 15);
    }

    #[test]
    fn test_no_transient_retries_means_any_error_is_terminal() {
        let policy = BackoffPolicy {
            transient_retries: 0,
            ..BackoffPolicy::default()
        };
        let mut tracker = PollTracker::new(policy);
        let err = tracker
            .record(Err(ScanError::Transport("dns".into())))
            .unwrap_err();
        assert!(matches!(err, ScanError::Transport(_)));
    }

    #[test]
    fn test_client_error_not_retried() {
        let mut tracker = PollTracker::new(BackoffPolicy::default());
        let err = tracker
            .record(Err(ScanError::UpstreamError {
                status: 404,
                body: "not found".into(),
            }))
            .unwrap_err();
        assert!(matches!(err, ScanError::UpstreamError { status: 404, .. }));
    }
}
