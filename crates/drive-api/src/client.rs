//! Drive API HTTP client

use crate::error::{DriveError, Result};
use crate::types::{DriveFile, FileListResponse};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum length of the upstream body carried in an error
const BODY_SNIPPET_LEN: usize = 512;

/// Client for the Google Drive v3 files API
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DriveClient {
    /// Base URL for the Drive v3 API
    pub const BASE_URL: &'static str = "https://www.googleapis.com/drive/v3";
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Create a new client with the default timeout
    pub fn new(api_key: &str) -> Self {
        Self::with_timeout(api_key, Self::DEFAULT_TIMEOUT)
    }

    /// Create a new client with a custom request timeout
    pub fn with_timeout(api_key: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: Self::BASE_URL.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create a new client against a custom API base URL
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let mut client = Self::new(api_key);
        client.base_url = base_url.trim_end_matches('/').to_string();
        client
    }

    /// List the files in a folder
    ///
    /// An empty folder yields an empty vector, not an error.
    pub async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>> {
        let query = format!("'{}' in parents", folder_id);
        let url = format!(
            "{}/files?q={}&key={}&fields=files(id,name,mimeType)",
            self.base_url,
            urlencoding::encode(&query),
            self.api_key,
        );

        debug!(folder_id, "Listing Drive folder");

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(folder_id, status, "Drive listing failed");
            return Err(DriveError::List {
                status,
                body: body_snippet(response).await,
            });
        }

        let data: FileListResponse = response.json().await?;
        Ok(data.files.unwrap_or_default())
    }

    /// Download a file's media content
    ///
    /// Returns the complete body or an error; there are no partial results.
    pub async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/files/{}?alt=media&key={}",
            self.base_url,
            urlencoding::encode(file_id),
            self.api_key,
        );

        debug!(file_id, "Fetching Drive file");

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(file_id, status, "Drive download failed");
            return Err(DriveError::Fetch {
                status,
                body: body_snippet(response).await,
            });
        }

        let data = response.bytes().await?.to_vec();
        debug!(file_id, size = data.len(), "Fetched Drive file");
        Ok(data)
    }
}

/// Read up to [`BODY_SNIPPET_LEN`] characters of an error response body
async fn body_snippet(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    body.chars().take(BODY_SNIPPET_LEN).collect()
}
