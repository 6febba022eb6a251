//! `safe-scan init`: create the data files. Safe to run repeatedly.

use anyhow::Result;

use crate::config::Config;
use crate::feedback_file::FileFeedbackStore;
use crate::migrate;

pub async fn run_init(config: &Config) -> Result<()> {
    if config.counter.is_persistent() {
        let pool = migrate::run_migrations(config).await?;
        pool.close().await;
        println!("Counter database initialized at {}", config.counter.path.display());
    } else {
        println!("Counter backend is in-memory; nothing to initialize.");
    }

    let feedback = FileFeedbackStore::new(&config.feedback.path);
    feedback.ensure_exists().await?;
    println!("Feedback file initialized at {}", feedback.path().display());
    Ok(())
}
