//! Configuration and response types

use crate::error::{ProxyError, Result};
use drive_api::DriveFile;
use kml_cache::CacheStats;
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default entry TTL: 6 hours
pub const DEFAULT_TTL_SECS: u64 = 6 * 60 * 60;

/// Proxy configuration parsed from environment variables
///
/// The API key and folder id are required; startup fails before serving
/// when either is absent.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub api_key: String,
    pub folder_id: String,
    pub cache_dir: PathBuf,
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl ProxyConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GOOGLE_API_KEY")
            .map_err(|_| ProxyError::Config("GOOGLE_API_KEY is required".to_string()))?;

        let folder_id = env::var("GOOGLE_DRIVE_FOLDER_ID")
            .map_err(|_| ProxyError::Config("GOOGLE_DRIVE_FOLDER_ID is required".to_string()))?;

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let cache_dir = env::var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./cache/kml"));

        let ttl_secs = env::var("CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TTL_SECS);

        // Sweep more often than entries expire; one twelfth of the TTL
        // (30 minutes against the 6 hour default) unless overridden.
        let sweep_secs = env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(|| (ttl_secs / 12).max(1));

        Ok(Self {
            port,
            api_key,
            folder_id,
            cache_dir,
            ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

/// Body of the `/files` listing endpoint
#[derive(Debug, Serialize)]
pub struct FileListBody {
    pub files: Vec<DriveFile>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_list_body_serialization() {
        let body = FileListBody {
            files: vec![DriveFile {
                id: "1AbCdEf".to_string(),
                name: "overlay.kml".to_string(),
                mime_type: "application/vnd.google-earth.kml+xml".to_string(),
            }],
        };

        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"files\""));
        assert!(json.contains("mimeType"));
        assert!(json.contains("overlay.kml"));
    }

    #[test]
    fn test_empty_file_list_serializes_to_empty_array() {
        let body = FileListBody { files: vec![] };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"files":[]}"#);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 3600,
            cache: CacheStats {
                entries: 4,
                total_size: 2048,
                hits: 10,
                misses: 2,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("ok"));
        assert!(json.contains("3600"));
        assert!(json.contains("2048"));
    }
}
