//! LUT resource cache.
//!
//! Three tiers, consulted in order for a given LUT identity:
//!
//! 1. **In-flight/completed slot map** (process-local): at most one load
//!    in flight per id; concurrent requests coalesce onto the same
//!    result. A failed load evicts its slot so the next request retries.
//! 2. **Durable store** ([`DurableStore`]): a hit counts only when the
//!    stored content hash equals the requested one, so a changed asset
//!    is a miss even under the same id.
//! 3. **Origin fetch** ([`OriginFetch`]): retrieves the `.clut` bytes,
//!    decodes them, and persists to the durable store on a detached
//!    best-effort thread.
//!
//! Cached LUTs are immutable once loaded and shared read-only via `Arc`
//! across any number of concurrent render calls.

mod cache;
mod store;

pub use cache::{CachedLut, LutCache};
pub use store::{DurableStore, FetchError, MemoryStore, OriginFetch, StoreError, StoredLut};

use lutgrade_core::CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity descriptor for a LUT asset, as listed in a library manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LutMeta {
    /// Stable identifier (`<category>-<name>`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Origin location of the `.clut` asset.
    pub file: String,
    /// Library category.
    pub category: String,
    /// Content hash of the binary asset, for cache invalidation.
    pub hash: String,
}

/// Errors surfaced by [`LutCache::load`].
///
/// Cloneable so a single failure can be broadcast to every coalesced
/// waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// Origin fetch did not return the asset.
    #[error("LUT not found: {0}")]
    NotFound(String),

    /// Fetched bytes had a bad magic tag or version.
    #[error("invalid .clut format: {0}")]
    InvalidFormat(String),

    /// Fetched payload was shorter than its header declares.
    #[error("corrupt LUT data: expected {expected} bytes, got {actual}")]
    CorruptData {
        /// Byte count the header declares.
        expected: usize,
        /// Byte count actually present.
        actual: usize,
    },

    /// Text-LUT structural error (only reachable through decode paths
    /// that validate grid structure).
    #[error("malformed LUT: {0}")]
    MalformedLut(String),

    /// The loading thread went away before producing a result.
    #[error("LUT load interrupted")]
    LoadInterrupted,
}

impl From<CoreError> for CacheError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MalformedLut(msg) => CacheError::MalformedLut(msg),
            CoreError::InvalidFormat(msg) => CacheError::InvalidFormat(msg),
            CoreError::CorruptData { expected, actual } => {
                CacheError::CorruptData { expected, actual }
            }
            CoreError::Io(e) => CacheError::NotFound(e.to_string()),
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
