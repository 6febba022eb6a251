//! SQLite-backed [`VisitCounter`].
//!
//! Each increment is a single upsert statement, so concurrent callers
//! (across tasks or processes sharing the database file) never read and
//! write the same value.

use async_trait::async_trait;
use safe_scan_core::store::VisitCounter;
use safe_scan_core::ScanError;
use sqlx::SqlitePool;

pub struct SqliteCounter {
    pool: SqlitePool,
    key: String,
}

impl SqliteCounter {
    pub fn new(pool: SqlitePool, key: impl Into<String>) -> Self {
        Self {
            pool,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

fn storage_err(e: sqlx::Error) -> ScanError {
    ScanError::StorageError(e.to_string())
}

fn to_count(value: i64) -> Result<u64, ScanError> {
    u64::try_from(value)
        .map_err(|_| ScanError::StorageError(format!("negative counter value: {}", value)))
}

#[async_trait]
impl VisitCounter for SqliteCounter {
    async fn increment(&self) -> Result<u64, ScanError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO counters (name, count) VALUES (?, 1)
            ON CONFLICT(name) DO UPDATE SET count = count + 1
            RETURNING count
            "#,
        )
        .bind(&self.key)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        to_count(count)
    }

    async fn get(&self) -> Result<u64, ScanError> {
        let count: Option<i64> = sqlx::query_scalar("SELECT count FROM counters WHERE name = ?")
            .bind(&self.key)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        to_count(count.unwrap_or(0))
    }
}
