//! Error types for the Drive API client

use std::fmt;

/// Errors that can occur when talking to the Drive API
///
/// `List` and `Fetch` carry the upstream status and a body snippet so a
/// failed response can be diagnosed without re-issuing the request.
#[derive(Debug)]
pub enum DriveError {
    /// Folder listing returned a non-success status
    List { status: u16, body: String },
    /// Media download returned a non-success status (including missing or
    /// trashed files)
    Fetch { status: u16, body: String },
    /// Request exceeded the client timeout
    Timeout(String),
    /// Transport-level failure (connection, TLS, body read)
    Http(Box<reqwest::Error>),
}

impl fmt::Display for DriveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveError::List { status, body } => {
                write!(f, "Drive listing failed with status {}: {}", status, body)
            }
            DriveError::Fetch { status, body } => {
                write!(f, "Drive download failed with status {}: {}", status, body)
            }
            DriveError::Timeout(msg) => write!(f, "Drive request timed out: {}", msg),
            DriveError::Http(err) => write!(f, "Drive HTTP error: {}", err),
        }
    }
}

impl std::error::Error for DriveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriveError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriveError::Timeout(err.to_string())
        } else {
            DriveError::Http(Box::new(err))
        }
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;
