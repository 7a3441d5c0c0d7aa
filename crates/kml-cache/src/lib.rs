//! File-based blob cache with TTL expiration
//!
//! Stores binary blobs on disk with in-memory metadata tracking. Entries
//! older than the configured TTL are reported as stale on lookup and
//! reclaimed by a periodic background sweeper.

mod error;
mod store;
mod sweeper;
mod types;

pub use error::StoreError;
pub use store::FileStore;
pub use sweeper::Sweeper;
pub use types::{CacheEntry, CacheStats, Lookup};
