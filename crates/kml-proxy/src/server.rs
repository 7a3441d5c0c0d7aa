//! HTTP server for the proxy endpoints
//!
//! Provides /health, /files, and /download/{name} endpoints.

use crate::download::Downloader;
use crate::error::ProxyError;
use crate::types::{FileListBody, HealthResponse};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use drive_api::DriveError;
use kml_cache::FileStore;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Content type of every served blob
const KML_CONTENT_TYPE: &str = "application/vnd.google-earth.kml+xml";

/// Shared state for the HTTP server
pub struct ServerState {
    pub downloader: Downloader,
    pub store: Arc<FileStore>,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(downloader: Downloader, store: Arc<FileStore>) -> Self {
        Self {
            downloader,
            store,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/files", get(list_files))
        .route("/download/{name}", get(download))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.store.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// List the files in the remote folder
async fn list_files(State(state): State<SharedState>) -> Response {
    match state.downloader.list().await {
        Ok(files) => Json(FileListBody { files }).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list remote folder");
            error_response(&e)
        }
    }
}

/// Download a file by display name
async fn download(State(state): State<SharedState>, Path(name): Path<String>) -> Response {
    match state.downloader.download(&name).await {
        Ok((bytes, from_cache)) => {
            let cache_header = if from_cache { "HIT" } else { "MISS" };
            let filename = disposition_filename(&name);

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, KML_CONTENT_TYPE)
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", filename),
                )
                .header("X-Cache", cache_header)
                .body(Body::from(bytes))
                .unwrap()
        }
        Err(e) => {
            warn!(name = %name, error = %e, "Download failed");
            error_response(&e)
        }
    }
}

/// Build a safe Content-Disposition filename from a display name
///
/// Drive display names may contain control characters, which make the
/// header value unbuildable, or quotes and backslashes, which break the
/// quoted-string grammar; all are replaced before formatting.
fn disposition_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_control() || c == '"' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();

    if cleaned.ends_with(".kml") {
        cleaned
    } else {
        format!("{}.kml", cleaned)
    }
}

/// Map a proxy error to an HTTP response
fn error_response(err: &ProxyError) -> Response {
    let status = match err {
        ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
        ProxyError::Remote(DriveError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        ProxyError::Remote(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}
