//! Archetype Similarity Index server entry point.

use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use asi::server::{router, AppState};
use asi::store::{BigramStore, HttpBigramStore, MemoryBigramStore, SqliteBigramStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("asi=info,tower_http=info")),
        )
        .with_target(false)
        .init();

    let store = build_store().await?;
    info!(
        database = store.database(),
        backend = %store.backend(),
        "bigram store ready"
    );

    let app = router(AppState { store });

    let port = env::var("ASI_PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("0.0.0.0:{port}");
    info!("ASI server listening at http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Store selection: a remote URL wins, then a snapshot file, then the
/// local SQLite database.
async fn build_store() -> Result<Arc<dyn BigramStore>> {
    if let Ok(url) = env::var("ASI_STORE_URL") {
        let token = env::var("ASI_STORE_TOKEN").ok();
        return Ok(Arc::new(HttpBigramStore::new(url, token)));
    }

    if let Ok(path) = env::var("ASI_SNAPSHOT_PATH") {
        return Ok(Arc::new(MemoryBigramStore::from_path(path)?));
    }

    let db_path = env::var("ASI_DB_PATH").unwrap_or_else(|_| "asi.db".to_string());
    Ok(Arc::new(SqliteBigramStore::new(db_path).await?))
}
