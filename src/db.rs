//! SQLite pool backing the persistent visit counter.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Open (creating if needed) the counter database at `counter.path`.
///
/// WAL mode lets `GET /api/counter` readers proceed while an increment
/// holds the write lock.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.counter.path;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open counter database {}", db_path.display()))
}
