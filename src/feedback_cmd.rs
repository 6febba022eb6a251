//! `safe-scan feedback add|list`.

use anyhow::Result;

use crate::config::Config;
use crate::stores;

/// CLI entry point for `safe-scan feedback add <TEXT>`.
pub async fn run_feedback_add(config: &Config, text: &str) -> Result<()> {
    let store = stores::open_feedback(config).await?;
    let entry = store.submit(text).await?;
    println!("Thank you for your feedback! ({})", entry.timestamp.to_rfc3339());
    Ok(())
}

/// CLI entry point for `safe-scan feedback list`. Newest entries first.
pub async fn run_feedback_list(config: &Config, json: bool) -> Result<()> {
    let store = stores::open_feedback(config).await?;
    let entries = store.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No feedback available.");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.text
        );
    }
    Ok(())
}
