//! Storage abstractions for feedback and visit counting.
//!
//! Handlers receive these as `Arc<dyn ...>` trait objects, so the backing
//! technology (memory, JSON-lines file, SQLite) is chosen at startup and
//! test doubles slot in without touching request code.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// One piece of visitor feedback. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl FeedbackEntry {
    /// Create an entry stamped with the current time.
    ///
    /// The text is trimmed; blank text is rejected with
    /// [`ScanError::EmptyInput`].
    pub fn new(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ScanError::EmptyInput);
        }
        Ok(Self {
            timestamp: Utc::now(),
            text: text.to_string(),
        })
    }
}

/// Append-only feedback storage.
///
/// # Ordering
///
/// [`list`](FeedbackStore::list) returns entries newest-first for every
/// implementation.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Store trimmed `text` and return the stored entry.
    async fn submit(&self, text: &str) -> Result<FeedbackEntry>;

    /// All entries, newest-first. An empty store yields an empty list.
    async fn list(&self) -> Result<Vec<FeedbackEntry>>;
}

/// Monotonic visit counter.
///
/// Each [`increment`](VisitCounter::increment) must be atomic: concurrent
/// callers never observe the same value.
#[async_trait]
pub trait VisitCounter: Send + Sync {
    /// Add one and return the new value.
    async fn increment(&self) -> Result<u64>;

    /// Current value without changing it.
    async fn get(&self) -> Result<u64>;
}
