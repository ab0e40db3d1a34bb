pub mod sqlite;
pub mod threads;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::app::Result;

pub use sqlite::SqliteStore;
pub use threads::ThreadSnapshots;

/// A persisted HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Generation-tagged store the entry belongs to.
    pub store: String,
    /// Request identity, see [`CacheEntry::request_key`].
    pub key: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Deterministic request identity from method and URL
    pub fn request_key(method: &str, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(method.to_ascii_uppercase().as_bytes());
        hasher.update(b" ");
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

pub trait Store {
    // Named stores
    fn open_store(&self, name: &str) -> Result<()>;
    fn store_names(&self) -> Result<Vec<String>>;
    fn delete_store(&self, name: &str) -> Result<bool>;

    // Entries
    fn put(&self, entry: &CacheEntry) -> Result<()>;
    fn lookup(&self, stores: &[&str], key: &str) -> Result<Option<CacheEntry>>;
    fn entry_count(&self, store: &str) -> Result<usize>;

    // Generation bookkeeping
    fn active_generation(&self) -> Result<Option<String>>;
    fn set_active_generation(&self, name: Option<&str>) -> Result<()>;
}
