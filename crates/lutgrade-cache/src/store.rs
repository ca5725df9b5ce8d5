//! Cache collaborator interfaces.
//!
//! The durable store and the origin fetch are external to the engine;
//! the cache only assumes these narrow, object-safe contracts.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// A persisted LUT asset: the raw `.clut` bytes plus the content hash
/// they were stored under.
#[derive(Debug, Clone)]
pub struct StoredLut {
    /// LUT identity.
    pub id: String,
    /// Content hash of `payload` at store time.
    pub hash: String,
    /// Raw `.clut` bytes.
    pub payload: Vec<u8>,
}

/// Durable store failure. The cache treats the store as best-effort and
/// only ever logs these.
#[derive(Debug, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Origin fetch failure (non-success response, transport error).
#[derive(Debug, Error)]
#[error("fetch failed: {0}")]
pub struct FetchError(pub String);

/// A durable key-value store for LUT assets, keyed by id.
pub trait DurableStore: Send + Sync {
    /// Looks up a stored asset.
    fn get(&self, id: &str) -> Result<Option<StoredLut>, StoreError>;
    /// Persists an asset, replacing any prior entry for the same id.
    fn put(&self, entry: StoredLut) -> Result<(), StoreError>;
}

/// Retrieves raw `.clut` bytes from the asset origin.
pub trait OriginFetch: Send + Sync {
    /// Fetches the asset at `file`.
    fn fetch(&self, file: &str) -> Result<Vec<u8>, FetchError>;
}

/// In-memory [`DurableStore`] implementation.
///
/// Useful as a process-lifetime store and in tests; real deployments
/// substitute a disk- or database-backed implementation.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredLut>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<StoredLut>, StoreError> {
        Ok(self.entries.lock().unwrap().get(id).cloned())
    }

    fn put(&self, entry: StoredLut) -> Result<(), StoreError> {
        self.entries.lock().unwrap().insert(entry.id.clone(), entry);
        Ok(())
    }
}
