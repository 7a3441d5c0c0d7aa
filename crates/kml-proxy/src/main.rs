//! KML Proxy - caching download proxy for Drive-hosted KML overlays
//!
//! Lists the KML files in a configured Google Drive folder and serves their
//! bytes by name, caching downloads on local disk with TTL expiration so
//! repeated requests avoid re-hitting the Drive API.

mod download;
mod error;
mod server;
mod source;
mod types;

use crate::download::Downloader;
use crate::error::{ProxyError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::source::DriveSource;
use crate::types::ProxyConfig;
use drive_api::DriveClient;
use kml_cache::{FileStore, Sweeper};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("kml_proxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting KML proxy...");

    // Load configuration from environment; missing required values abort
    // startup with a non-zero exit
    let config = ProxyConfig::from_env()?;
    info!("Port: {}", config.port);
    info!("Folder: {}", config.folder_id);
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Cache TTL: {} seconds", config.ttl.as_secs());
    info!("Sweep interval: {} seconds", config.sweep_interval.as_secs());

    // Create the cache store
    let store = Arc::new(FileStore::new(config.cache_dir.clone(), config.ttl));
    store.init().await?;

    // Wire the Drive client behind the source seam
    let client = DriveClient::new(&config.api_key);
    let source = Arc::new(DriveSource::new(client, &config.folder_id));
    let downloader = Downloader::new(store.clone(), source);

    // Background expiry sweeping, independent of the request path
    let sweeper = Sweeper::new(store.clone(), config.sweep_interval);
    let _sweep_task = sweeper.spawn();

    // Create shared state
    let state: SharedState = Arc::new(ServerState::new(downloader, store));

    // Start HTTP server (blocking)
    start_server(state, config.port)
        .await
        .map_err(|e| ProxyError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
