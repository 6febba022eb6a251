//! Builds the feedback and counter stores selected by configuration.

use std::sync::Arc;

use anyhow::Result;
use safe_scan_core::store::memory::InMemoryCounter;
use safe_scan_core::store::{FeedbackStore, VisitCounter};
use tracing::info;

use crate::config::Config;
use crate::feedback_file::FileFeedbackStore;
use crate::migrate;
use crate::sqlite_counter::SqliteCounter;

/// Store handles shared by handlers and CLI commands.
#[derive(Clone)]
pub struct Stores {
    pub feedback: Arc<dyn FeedbackStore>,
    pub counter: Arc<dyn VisitCounter>,
}

impl Stores {
    pub fn new(feedback: Arc<dyn FeedbackStore>, counter: Arc<dyn VisitCounter>) -> Self {
        Self { feedback, counter }
    }
}

pub async fn open_feedback(config: &Config) -> Result<Arc<dyn FeedbackStore>> {
    let store = FileFeedbackStore::new(&config.feedback.path);
    store.ensure_exists().await?;
    Ok(Arc::new(store))
}

/// Open the configured counter. The SQLite backend runs its migration so a
/// fresh database works without `init`.
pub async fn open_counter(config: &Config) -> Result<Arc<dyn VisitCounter>> {
    if config.counter.is_persistent() {
        let pool = migrate::run_migrations(config).await?;
        info!(path = %config.counter.path.display(), key = %config.counter.key, "using sqlite counter");
        Ok(Arc::new(SqliteCounter::new(pool, config.counter.key.clone())))
    } else {
        info!("using in-memory counter");
        Ok(Arc::new(InMemoryCounter::new()))
    }
}

pub async fn open(config: &Config) -> Result<Stores> {
    Ok(Stores::new(
        open_feedback(config).await?,
        open_counter(config).await?,
    ))
}
