//! Client for the Google Drive v3 files API
//!
//! Covers the two operations the proxy needs: listing the files in a folder
//! and downloading a file's media content. No retries; callers decide how to
//! handle failures.

mod client;
mod error;
mod types;

pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use types::{DriveFile, FileListResponse};
