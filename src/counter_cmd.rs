//! `safe-scan counter`.

use anyhow::Result;
use tracing::warn;

use crate::config::Config;
use crate::stores;

async fn read_count(config: &Config, hit: bool) -> Result<u64> {
    let counter = stores::open_counter(config).await?;
    let count = if hit {
        counter.increment().await?
    } else {
        counter.get().await?
    };
    Ok(count)
}

/// CLI entry point. Prints `N/A` instead of failing when the store is
/// unavailable.
pub async fn run_counter(config: &Config, hit: bool) -> Result<()> {
    match read_count(config, hit).await {
        Ok(count) => println!("visitors: {}", count),
        Err(e) => {
            warn!("visit counter unavailable: {:#}", e);
            println!("visitors: N/A");
        }
    }
    Ok(())
}
