//! Loads a build-pipeline snapshot into the serving SQLite store.
//!
//! Usage: `seed_store <snapshot.json> [db-path]` (db path defaults to
//! the `ASI_DB_PATH` environment variable, then `asi.db`).

use std::env;

use anyhow::{Context, Result};
use tracing::info;

use asi::store::{SqliteBigramStore, StoreSnapshot};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let snapshot_path = args
        .next()
        .context("usage: seed_store <snapshot.json> [db-path]")?;
    let db_path = args
        .next()
        .or_else(|| env::var("ASI_DB_PATH").ok())
        .unwrap_or_else(|| "asi.db".to_string());

    let raw = std::fs::read(&snapshot_path)
        .with_context(|| format!("failed to read snapshot {snapshot_path}"))?;
    let snapshot: StoreSnapshot = serde_json::from_slice(&raw)
        .with_context(|| format!("snapshot {snapshot_path} does not match the store schema"))?;

    let formats = snapshot.formats.len();
    let store = SqliteBigramStore::new(&db_path).await?;
    let written = store.seed_snapshot(snapshot).await?;

    info!("Seeded {written} records across {formats} formats into {db_path}");
    Ok(())
}
