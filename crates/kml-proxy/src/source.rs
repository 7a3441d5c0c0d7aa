//! Remote object source abstraction

use async_trait::async_trait;
use drive_api::{DriveClient, DriveFile, Result};

/// The two remote operations the proxy consumes, behind a trait so tests
/// can substitute a scripted source
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// List the object records in the configured folder
    async fn list_objects(&self) -> Result<Vec<DriveFile>>;

    /// Fetch an object's raw bytes by remote id
    async fn fetch_object(&self, id: &str) -> Result<Vec<u8>>;
}

/// Drive-backed source scoped to a single folder
pub struct DriveSource {
    client: DriveClient,
    folder_id: String,
}

impl DriveSource {
    pub fn new(client: DriveClient, folder_id: &str) -> Self {
        Self {
            client,
            folder_id: folder_id.to_string(),
        }
    }
}

#[async_trait]
impl ObjectSource for DriveSource {
    async fn list_objects(&self) -> Result<Vec<DriveFile>> {
        self.client.list_files(&self.folder_id).await
    }

    async fn fetch_object(&self, id: &str) -> Result<Vec<u8>> {
        self.client.fetch_file(id).await
    }
}
