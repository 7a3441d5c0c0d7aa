//! File-based blob storage with in-memory metadata

use crate::error::Result;
use crate::types::{CacheEntry, CacheStats, Lookup};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A blob store with in-memory metadata and file-based storage
///
/// Exclusively owns entry lifecycle: callers request lookups, writes, and
/// evictions but never touch the cache directory themselves.
pub struct FileStore {
    /// In-memory metadata for cached entries
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    /// Directory where cached blobs are stored
    cache_dir: PathBuf,
    /// Maximum entry age before it is reported stale
    ttl: Duration,
    /// Current total size of cached blobs
    current_size: Arc<AtomicU64>,
    /// Cache hit counter
    hits: Arc<AtomicU64>,
    /// Cache miss counter
    misses: Arc<AtomicU64>,
}

impl FileStore {
    /// Create a new file store
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            cache_dir,
            ttl,
            current_size: Arc::new(AtomicU64::new(0)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Initialize the store: ensure the cache directory exists and clear
    /// blob files left behind by a previous process
    ///
    /// Metadata lives in memory, so leftover files are unreachable; removing
    /// them keeps the directory in sync with the (empty) metadata map.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;

        let mut orphans = 0usize;
        let mut dir = fs::read_dir(&self.cache_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                let _ = fs::remove_file(entry.path()).await;
                orphans += 1;
            }
        }
        if orphans > 0 {
            info!(orphans, "Removed orphaned blob files from previous run");
        }

        info!(cache_dir = ?self.cache_dir, "Cache store initialized");
        Ok(())
    }

    /// Configured TTL for entries in this store
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Derive the on-disk file name for a cache key
    ///
    /// Keys are display names and may contain path separators or other
    /// characters unsafe in file names, so blobs are stored under the hex
    /// SHA-256 of the key.
    pub fn blob_file_name(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up a key, classifying it as absent, fresh (with bytes), or stale
    ///
    /// Records a hit or miss. A fresh entry whose blob file cannot be read
    /// is evicted and reported absent, so the caller falls back to a remote
    /// fetch instead of seeing a low-level I/O error.
    pub async fn lookup(&self, key: &str) -> Lookup {
        let result = self.classify(key).await;
        if matches!(result, Lookup::Fresh(_)) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Classify a key without recording a hit or miss
    ///
    /// For callers re-checking an entry whose miss they already counted,
    /// so the counters track requests rather than internal re-checks.
    pub async fn peek(&self, key: &str) -> Lookup {
        self.classify(key).await
    }

    async fn classify(&self, key: &str) -> Lookup {
        let entry = {
            let entries = self.entries.read().await;
            entries.get(key).cloned()
        };

        let Some(entry) = entry else {
            return Lookup::Absent;
        };

        let age = (Utc::now() - entry.created_at).to_std().unwrap_or_default();
        if age > self.ttl {
            debug!(key = %key, age_secs = age.as_secs(), ttl_secs = self.ttl.as_secs(), "Cache entry expired");
            return Lookup::Stale;
        }

        match fs::read(&entry.path).await {
            Ok(bytes) => {
                debug!(key = %key, "Cache hit");
                Lookup::Fresh(bytes)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cached blob, evicting entry");
                self.evict(key).await;
                Lookup::Absent
            }
        }
    }

    /// Store a blob, creating or replacing the entry for `key`
    ///
    /// Bytes are written to a temporary path in the cache directory and
    /// renamed into place, so a concurrent lookup sees either the prior
    /// blob or the complete new one, never a partial write. The entry's age
    /// resets to zero.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let file_name = Self::blob_file_name(key);
        let path = self.cache_dir.join(&file_name);
        let tmp_path = self.cache_dir.join(format!("{}.tmp", file_name));

        fs::write(&tmp_path, bytes).await?;
        fs::rename(&tmp_path, &path).await?;

        let size = bytes.len() as u64;
        let entry = CacheEntry {
            path,
            size,
            created_at: Utc::now(),
        };

        let previous = {
            let mut entries = self.entries.write().await;
            entries.insert(key.to_string(), entry)
        };

        if let Some(previous) = previous {
            self.current_size.fetch_sub(previous.size, Ordering::Relaxed);
        }
        self.current_size.fetch_add(size, Ordering::Relaxed);
        debug!(key = %key, size, "Cached blob");

        Ok(())
    }

    /// Remove the entry for `key` if present
    ///
    /// Idempotent: evicting an absent key is a no-op.
    pub async fn evict(&self, key: &str) {
        let entry = {
            let mut entries = self.entries.write().await;
            entries.remove(key)
        };

        if let Some(entry) = entry {
            self.current_size.fetch_sub(entry.size, Ordering::Relaxed);
            if let Err(e) = fs::remove_file(&entry.path).await {
                debug!(key = %key, error = %e, "Blob file already gone during eviction");
            }
        }
    }

    /// Enumerate all keys with their current age, for the sweeper
    pub async fn keys_with_age(&self) -> Vec<(String, Duration)> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(key, entry)| {
                let age = (now - entry.created_at).to_std().unwrap_or_default();
                (key.clone(), age)
            })
            .collect()
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            entries: entries.len(),
            total_size: self.current_size.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_blob_file_name() {
        let name1 = FileStore::blob_file_name("region-north.kml");
        let name2 = FileStore::blob_file_name("region-north.kml");
        let name3 = FileStore::blob_file_name("region-south.kml");

        // Same key produces the same file name
        assert_eq!(name1, name2);

        // Different keys produce different file names
        assert_ne!(name1, name3);

        // File names are hex strings (64 chars for SHA-256)
        assert_eq!(name1.len(), 64);
        assert!(name1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_write_then_lookup_fresh() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        store.write("overlay.kml", b"<kml/>").await.unwrap();

        match store.lookup("overlay.kml").await {
            Lookup::Fresh(bytes) => assert_eq!(bytes, b"<kml/>"),
            other => panic!("expected Fresh, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_absent() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        assert_eq!(store.lookup("missing.kml").await, Lookup::Absent);
    }

    #[tokio::test]
    async fn test_lookup_stale_after_ttl() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_millis(1));
        store.init().await.unwrap();

        store.write("overlay.kml", b"<kml/>").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Expired entries are reported stale with no bytes
        assert_eq!(store.lookup("overlay.kml").await, Lookup::Stale);
    }

    #[tokio::test]
    async fn test_write_replaces_entry_and_resets_age() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        store.write("overlay.kml", b"first").await.unwrap();
        store.write("overlay.kml", b"second").await.unwrap();

        match store.lookup("overlay.kml").await {
            Lookup::Fresh(bytes) => assert_eq!(bytes, b"second"),
            other => panic!("expected Fresh, got {:?}", other),
        }

        // One entry per key, and no temp files left behind
        let stats = store.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.total_size, 6);

        let mut files = 0;
        let mut dir_iter = fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = dir_iter.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
            files += 1;
        }
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn test_evict_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        store.write("overlay.kml", b"<kml/>").await.unwrap();
        store.evict("overlay.kml").await;
        assert_eq!(store.lookup("overlay.kml").await, Lookup::Absent);

        // Evicting again, or evicting a never-written key, is a no-op
        store.evict("overlay.kml").await;
        store.evict("never-written.kml").await;
        assert_eq!(store.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_lookup_falls_back_when_blob_file_disappears() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        store.write("overlay.kml", b"<kml/>").await.unwrap();

        // Simulate a concurrent eviction of the file behind a fresh entry
        let blob_path = dir.path().join(FileStore::blob_file_name("overlay.kml"));
        fs::remove_file(&blob_path).await.unwrap();

        assert_eq!(store.lookup("overlay.kml").await, Lookup::Absent);
        assert_eq!(store.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_keys_with_age() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        store.write("a.kml", b"a").await.unwrap();
        store.write("b.kml", b"b").await.unwrap();

        let mut keys: Vec<String> = store
            .keys_with_age()
            .await
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["a.kml", "b.kml"]);
    }

    #[tokio::test]
    async fn test_hit_miss_counters() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        store.lookup("overlay.kml").await;
        let stats = store.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);

        store.write("overlay.kml", b"<kml/>").await.unwrap();
        store.lookup("overlay.kml").await;

        let stats = store.stats().await;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_peek_does_not_touch_counters() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        assert_eq!(store.peek("overlay.kml").await, Lookup::Absent);

        store.write("overlay.kml", b"<kml/>").await.unwrap();
        match store.peek("overlay.kml").await {
            Lookup::Fresh(bytes) => assert_eq!(bytes, b"<kml/>"),
            other => panic!("expected Fresh, got {:?}", other),
        }

        let stats = store.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_lookup_during_replacement_never_sees_partial_bytes() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::new(
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
        ));
        store.init().await.unwrap();

        let old = vec![b'a'; 256 * 1024];
        let new = vec![b'b'; 256 * 1024];
        store.write("overlay.kml", &old).await.unwrap();

        let writer = {
            let store = store.clone();
            let new = new.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    store.write("overlay.kml", &new).await.unwrap();
                }
            })
        };

        // Every concurrent read observes either the prior blob or the
        // complete replacement, never a half-written file
        for _ in 0..100 {
            match store.lookup("overlay.kml").await {
                Lookup::Fresh(bytes) => assert!(
                    bytes == old || bytes == new,
                    "observed a partial blob of {} bytes",
                    bytes.len()
                ),
                other => panic!("expected Fresh, got {:?}", other),
            }
        }

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_init_clears_orphaned_files() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("leftover"), b"stale blob")
            .await
            .unwrap();

        let store = FileStore::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        store.init().await.unwrap();

        let mut dir_iter = fs::read_dir(dir.path()).await.unwrap();
        assert!(dir_iter.next_entry().await.unwrap().is_none());
    }
}
