//! Error types for the KML proxy

use drive_api::DriveError;
use kml_cache::StoreError;
use std::fmt;

#[derive(Debug)]
pub enum ProxyError {
    /// Upstream listing or download failure
    Remote(DriveError),
    /// Requested name has no match in the remote folder listing
    NotFound(String),
    /// Cache storage failure
    Storage(StoreError),
    Config(String),
    /// Fetch task failed to produce a result (panic or runtime shutdown)
    Internal(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Remote(err) => write!(f, "Remote error: {}", err),
            ProxyError::NotFound(name) => write!(f, "No file named \"{}\" in folder", name),
            ProxyError::Storage(err) => write!(f, "Storage error: {}", err),
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProxyError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Remote(err) => Some(err),
            ProxyError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DriveError> for ProxyError {
    fn from(err: DriveError) -> Self {
        ProxyError::Remote(err)
    }
}

impl From<StoreError> for ProxyError {
    fn from(err: StoreError) -> Self {
        ProxyError::Storage(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProxyError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
