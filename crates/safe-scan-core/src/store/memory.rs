//! In-memory stores for tests and single-process deployments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{Result, ScanError};

use super::{FeedbackEntry, FeedbackStore, VisitCounter};

/// Feedback kept in a `Vec` behind a lock; lost on restart.
#[derive(Default)]
pub struct InMemoryFeedbackStore {
    entries: RwLock<Vec<FeedbackEntry>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn submit(&self, text: &str) -> Result<FeedbackEntry> {
        let entry = FeedbackEntry::new(text)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ScanError::StorageError("feedback lock poisoned".to_string()))?;
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self) -> Result<Vec<FeedbackEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ScanError::StorageError("feedback lock poisoned".to_string()))?;
        Ok(entries.iter().rev().cloned().collect())
    }
}

/// Counter backed by an atomic integer.
#[derive(Default)]
pub struct InMemoryCounter {
    value: AtomicU64,
}

impl InMemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }
}

#[async_trait]
impl VisitCounter for InMemoryCounter {
    async fn increment(&self) -> Result<u64> {
        Ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn get(&self) -> Result<u64> {
        Ok(self.value.load(Ordering::SeqCst))
    }
}
