//! Download orchestration: cache consult, single-flight remote fetch,
//! write-through
//!
//! A request for a fresh key is served straight from the cache. A request
//! for an absent or expired key joins the in-flight fetch for that key,
//! spawning one if none exists, so N concurrent misses on the same key
//! issue exactly one remote download and share its result.

use crate::error::{ProxyError, Result};
use crate::source::ObjectSource;
use drive_api::DriveFile;
use futures::future::{BoxFuture, FutureExt, Shared};
use kml_cache::{FileStore, Lookup};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of one remote fetch, cloneable so every waiter gets a copy
type FetchResult = std::result::Result<Vec<u8>, Arc<ProxyError>>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

type InFlight = Arc<Mutex<HashMap<String, SharedFetch>>>;

/// Coordinates cache lookups with single-flight remote fetches
pub struct Downloader {
    store: Arc<FileStore>,
    source: Arc<dyn ObjectSource>,
    in_flight: InFlight,
}

impl Downloader {
    pub fn new(store: Arc<FileStore>, source: Arc<dyn ObjectSource>) -> Self {
        Self {
            store,
            source,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// List the object records in the remote folder
    pub async fn list(&self) -> Result<Vec<DriveFile>> {
        Ok(self.source.list_objects().await?)
    }

    /// Download an object by display name
    ///
    /// Returns the bytes and whether they were served from the cache.
    pub async fn download(&self, name: &str) -> std::result::Result<(Vec<u8>, bool), Arc<ProxyError>> {
        if let Lookup::Fresh(bytes) = self.store.lookup(name).await {
            debug!(name, "Serving from cache");
            return Ok((bytes, true));
        }

        let fetch = self.join_fetch(name).await;
        let bytes = fetch.await?;
        Ok((bytes, false))
    }

    /// Join the in-flight fetch for `name`, spawning one if none exists
    ///
    /// The registry lock is held across spawn and insert, so the task's
    /// self-removal cannot run before the entry exists.
    async fn join_fetch(&self, name: &str) -> SharedFetch {
        let mut in_flight = self.in_flight.lock().await;

        if let Some(existing) = in_flight.get(name) {
            debug!(name, "Joining in-flight fetch");
            return existing.clone();
        }

        let task = tokio::spawn(fetch_and_store(
            self.store.clone(),
            self.source.clone(),
            self.in_flight.clone(),
            name.to_string(),
        ));

        let fetch: SharedFetch = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(ProxyError::Internal(format!(
                    "fetch task failed: {}",
                    e
                )))),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(name.to_string(), fetch.clone());
        fetch
    }
}

/// Run one remote fetch for `name` and write the result through the store
///
/// Spawned as its own task so a caller disconnect never cancels a fetch
/// that other waiters are joined on. Deregisters itself once the result is
/// settled, success or failure.
async fn fetch_and_store(
    store: Arc<FileStore>,
    source: Arc<dyn ObjectSource>,
    in_flight: InFlight,
    name: String,
) -> FetchResult {
    let result = fetch_inner(&store, source.as_ref(), &name)
        .await
        .map_err(Arc::new);
    in_flight.lock().await.remove(&name);
    result
}

async fn fetch_inner(store: &FileStore, source: &dyn ObjectSource, name: &str) -> Result<Vec<u8>> {
    // A previous flight may have filled the cache between the caller's
    // lookup and this task starting. Peek instead of lookup: the caller
    // already recorded the miss for this request.
    match store.peek(name).await {
        Lookup::Fresh(bytes) => return Ok(bytes),
        Lookup::Stale => store.evict(name).await,
        Lookup::Absent => {}
    }

    let id = resolve_id(source, name).await?;
    let bytes = source.fetch_object(&id).await?;
    info!(name, id = %id, size = bytes.len(), "Fetched object from remote");

    if let Err(e) = store.write(name, &bytes).await {
        // Serve what was fetched; only the cache miss persists.
        warn!(name, error = %e, "Failed to write blob through to cache");
    }

    Ok(bytes)
}

/// Resolve a display name to a remote id via the folder listing
async fn resolve_id(source: &dyn ObjectSource, name: &str) -> Result<String> {
    let files = source.list_objects().await?;
    files
        .into_iter()
        .find(|f| f.name == name)
        .map(|f| f.id)
        .ok_or_else(|| ProxyError::NotFound(name.to_string()))
}
