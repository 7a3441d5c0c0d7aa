//! Drive API response types

use serde::{Deserialize, Serialize};

/// A file record from a folder listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Response shape of the Drive v3 files listing endpoint
#[derive(Debug, Deserialize)]
pub struct FileListResponse {
    pub files: Option<Vec<DriveFile>>,
}
