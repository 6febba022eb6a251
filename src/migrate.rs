use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Connect to the counter database and create its schema.
pub async fn run_migrations(config: &Config) -> Result<SqlitePool> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    Ok(pool)
}

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Named counters; one row per key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY,
            count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
