//! Mini Cache demo driver
//!
//! Stores a key with a short TTL and polls it once per second until it
//! expires, then round-trips a second key through a snapshot file.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_cache::{Cache, Expiration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cache = Cache::new(Duration::from_secs(30 * 60), Duration::from_secs(3))
        .context("failed to create cache")?;
    info!("Cache created");

    cache
        .set("k1", "hello Mr.Chen".to_string(), Duration::from_secs(5))
        .await;

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        match cache.get_as::<String>("k1").await {
            Some(value) => info!("Found k1: {}", value),
            None => {
                info!("Not found k1");
                break;
            }
        }
    }

    let path = std::env::temp_dir().join("mini_cache_demo.json");
    cache
        .set("k2", "v2".to_string(), Expiration::After(Duration::from_secs(60)))
        .await;
    cache
        .save_to_file(&path)
        .await
        .with_context(|| format!("failed to save snapshot to {}", path.display()))?;

    let restored = Cache::new(Expiration::Never, Duration::from_secs(3))?;
    let merged = restored
        .load_file(&path)
        .await
        .with_context(|| format!("failed to load snapshot from {}", path.display()))?;
    info!(
        "Restored {} entries from {}, k2 = {:?}",
        merged,
        path.display(),
        restored.get_as::<String>("k2").await
    );

    cache.shutdown().await;
    restored.shutdown().await;
    Ok(())
}
