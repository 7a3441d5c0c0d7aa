//! Periodic expiry sweeping

use crate::store::FileStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Periodically evicts cache entries older than the store's TTL
///
/// The sweeper is purely destructive: it never fetches, and evicting an
/// already-gone entry is a no-op, so runs are safe to repeat. Tests call
/// [`Sweeper::sweep_once`] directly instead of waiting on the timer.
pub struct Sweeper {
    store: Arc<FileStore>,
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper over `store`, ticking every `interval`
    pub fn new(store: Arc<FileStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run one sweep, returning the number of entries evicted
    pub async fn sweep_once(&self) -> usize {
        let ttl = self.store.ttl();
        let mut evicted = 0;

        for (key, age) in self.store.keys_with_age().await {
            if age > ttl {
                self.store.evict(&key).await;
                info!(key = %key, age_secs = age.as_secs(), "Evicted expired cache entry");
                evicted += 1;
            }
        }

        evicted
    }

    /// Spawn the periodic sweep loop
    ///
    /// Each sweep runs to completion before the next tick is observed; a
    /// tick that fires mid-sweep is skipped rather than queued, so the
    /// sweeper never overlaps itself.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick resolves immediately; skip it so the first
            // sweep happens one full interval after startup.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = self.sweep_once().await;
                if evicted > 0 {
                    debug!(evicted, "Sweep complete");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lookup;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sweep_evicts_expired_entries() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::new(
            dir.path().to_path_buf(),
            Duration::from_millis(1),
        ));
        store.init().await.unwrap();

        store.write("old-a.kml", b"a").await.unwrap();
        store.write("old-b.kml", b"b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await, 2);

        assert_eq!(store.lookup("old-a.kml").await, Lookup::Absent);
        assert_eq!(store.lookup("old-b.kml").await, Lookup::Absent);
        assert_eq!(store.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_sweep_leaves_fresh_entries() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::new(
            dir.path().to_path_buf(),
            Duration::from_secs(3600),
        ));
        store.init().await.unwrap();

        store.write("fresh.kml", b"<kml/>").await.unwrap();

        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await, 0);

        match store.lookup("fresh.kml").await {
            Lookup::Fresh(bytes) => assert_eq!(bytes, b"<kml/>"),
            other => panic!("expected Fresh, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileStore::new(
            dir.path().to_path_buf(),
            Duration::from_millis(1),
        ));
        store.init().await.unwrap();

        store.write("old.kml", b"x").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await, 1);
        assert_eq!(sweeper.sweep_once().await, 0);
    }
}
