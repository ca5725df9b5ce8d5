//! The multi-tier cache itself.

use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use lutgrade_core::{clut, PackedLut};
use tracing::{debug, warn};

use crate::{CacheError, CacheResult, DurableStore, LutMeta, OriginFetch, StoredLut};

/// A loaded LUT: packed texture plus the identity it was loaded under.
///
/// Immutable after construction; shared read-only across render jobs.
#[derive(Debug, Clone)]
pub struct CachedLut {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Content hash the asset was validated against.
    pub hash: String,
    /// The packed texture.
    pub lut: PackedLut,
}

type LoadResult = CacheResult<Arc<CachedLut>>;

enum Slot {
    /// A load is in flight; waiters subscribe here.
    Pending(Vec<Sender<LoadResult>>),
    /// Loaded and shared.
    Ready(Arc<CachedLut>),
}

/// Process-wide LUT cache.
///
/// One instance is shared (by reference or `Arc`) between all callers;
/// the slot map guarantees a given id is fetched at most once
/// concurrently.
pub struct LutCache {
    slots: Mutex<HashMap<String, Slot>>,
    store: Arc<dyn DurableStore>,
    origin: Arc<dyn OriginFetch>,
}

impl LutCache {
    /// Creates a cache over the given collaborators.
    pub fn new(store: Arc<dyn DurableStore>, origin: Arc<dyn OriginFetch>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            store,
            origin,
        }
    }

    /// Loads a LUT by identity, consulting the tiers in order.
    ///
    /// Concurrent calls for the same id coalesce onto a single load; a
    /// failed load evicts its slot so a later call retries from scratch.
    pub fn load(&self, meta: &LutMeta) -> LoadResult {
        let waiter = {
            let mut slots = self.slots.lock().unwrap();
            match slots.get_mut(&meta.id) {
                Some(Slot::Ready(lut)) => return Ok(lut.clone()),
                Some(Slot::Pending(waiters)) => {
                    let (tx, rx) = mpsc::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    slots.insert(meta.id.clone(), Slot::Pending(Vec::new()));
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            return rx.recv().map_err(|_| CacheError::LoadInterrupted)?;
        }

        let result = self.load_slow(meta);

        // Publish: settle the slot, then notify every coalesced waiter.
        let waiters = {
            let mut slots = self.slots.lock().unwrap();
            let waiters = match slots.remove(&meta.id) {
                Some(Slot::Pending(w)) => w,
                _ => Vec::new(),
            };
            if let Ok(lut) = &result {
                slots.insert(meta.id.clone(), Slot::Ready(lut.clone()));
            }
            waiters
        };
        for tx in waiters {
            let _ = tx.send(result.clone());
        }
        result
    }

    /// Durable-store tier, then origin fetch.
    fn load_slow(&self, meta: &LutMeta) -> LoadResult {
        match self.store.get(&meta.id) {
            Ok(Some(entry)) if entry.hash == meta.hash => match clut::decode(&entry.payload) {
                Ok(packed) => {
                    debug!(id = %meta.id, "LUT served from durable store");
                    return Ok(Arc::new(self.wrap(meta, packed)));
                }
                Err(e) => {
                    warn!(id = %meta.id, error = %e, "stored LUT undecodable, refetching");
                }
            },
            Ok(Some(_)) => {
                debug!(id = %meta.id, "stored hash differs, refetching");
            }
            Ok(None) => {}
            Err(e) => {
                warn!(id = %meta.id, error = %e, "durable store lookup failed");
            }
        }

        let bytes = self
            .origin
            .fetch(&meta.file)
            .map_err(|e| CacheError::NotFound(format!("{}: {e}", meta.name)))?;
        let packed = clut::decode(&bytes)?;
        debug!(id = %meta.id, bytes = bytes.len(), "LUT fetched from origin");

        // Best-effort persist; never blocks the caller, failure ignored.
        let store = Arc::clone(&self.store);
        let entry = StoredLut {
            id: meta.id.clone(),
            hash: meta.hash.clone(),
            payload: bytes,
        };
        thread::spawn(move || {
            if let Err(e) = store.put(entry) {
                warn!(error = %e, "failed to persist LUT");
            }
        });

        Ok(Arc::new(self.wrap(meta, packed)))
    }

    fn wrap(&self, meta: &LutMeta, lut: PackedLut) -> CachedLut {
        CachedLut {
            id: meta.id.clone(),
            name: meta.name.clone(),
            hash: meta.hash.clone(),
            lut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchError, MemoryStore};
    use lutgrade_core::{pack, Lut3d};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn clut_bytes() -> Vec<u8> {
        clut::encode(&pack(&Lut3d::identity(2)))
    }

    fn meta(id: &str, hash: &str) -> LutMeta {
        LutMeta {
            id: id.into(),
            name: id.into(),
            file: format!("/LUTS/test/{id}.clut"),
            category: "test".into(),
            hash: hash.into(),
        }
    }

    /// Origin that counts fetches and can be slowed down or failed.
    struct FakeOrigin {
        fetches: AtomicUsize,
        delay: Duration,
        fail_first: AtomicUsize,
        payload: Vec<u8>,
    }

    impl FakeOrigin {
        fn new(payload: Vec<u8>) -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_first: AtomicUsize::new(0),
                payload,
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn failing_first(self, n: usize) -> Self {
            self.fail_first.store(n, Ordering::SeqCst);
            self
        }

        fn count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl OriginFetch for FakeOrigin {
        fn fetch(&self, _file: &str) -> Result<Vec<u8>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(FetchError("HTTP 404".into()));
            }
            Ok(self.payload.clone())
        }
    }

    fn cache_with(origin: Arc<FakeOrigin>) -> (Arc<LutCache>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(LutCache::new(store.clone(), origin));
        (cache, store)
    }

    #[test]
    fn concurrent_loads_coalesce_to_one_fetch() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()).slow(Duration::from_millis(100)));
        let (cache, _) = cache_with(origin.clone());
        let m = meta("film-a", "aaaa1111");

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let m = m.clone();
                thread::spawn(move || cache.load(&m))
            })
            .collect();
        for t in threads {
            let lut = t.join().unwrap().expect("load failed");
            assert_eq!(lut.lut.size, 2);
        }
        assert_eq!(origin.count(), 1);
    }

    #[test]
    fn second_load_hits_ready_slot() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()));
        let (cache, _) = cache_with(origin.clone());
        let m = meta("film-b", "bbbb2222");

        let first = cache.load(&m).unwrap();
        let second = cache.load(&m).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(origin.count(), 1);
    }

    #[test]
    fn stored_hash_mismatch_forces_refetch() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()));
        let (cache, store) = cache_with(origin.clone());
        store
            .put(StoredLut {
                id: "film-c".into(),
                hash: "stale000".into(),
                payload: clut_bytes(),
            })
            .unwrap();

        cache.load(&meta("film-c", "fresh111")).unwrap();
        assert_eq!(origin.count(), 1, "stale hash must not be served");
    }

    #[test]
    fn matching_stored_hash_avoids_fetch() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()));
        let (cache, store) = cache_with(origin.clone());
        store
            .put(StoredLut {
                id: "film-d".into(),
                hash: "same5555".into(),
                payload: clut_bytes(),
            })
            .unwrap();

        cache.load(&meta("film-d", "same5555")).unwrap();
        assert_eq!(origin.count(), 0);
    }

    #[test]
    fn corrupt_stored_payload_is_a_miss() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()));
        let (cache, store) = cache_with(origin.clone());
        store
            .put(StoredLut {
                id: "film-e".into(),
                hash: "hash9999".into(),
                payload: vec![0xFF; 8],
            })
            .unwrap();

        let lut = cache.load(&meta("film-e", "hash9999")).unwrap();
        assert_eq!(lut.lut.size, 2);
        assert_eq!(origin.count(), 1);
    }

    #[test]
    fn failed_load_is_evicted_and_retried() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()).failing_first(1));
        let (cache, _) = cache_with(origin.clone());
        let m = meta("film-f", "ffff6666");

        match cache.load(&m) {
            Err(CacheError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
        cache.load(&m).expect("retry after eviction should succeed");
        assert_eq!(origin.count(), 2);
    }

    #[test]
    fn origin_load_persists_to_store() {
        let origin = Arc::new(FakeOrigin::new(clut_bytes()));
        let (cache, store) = cache_with(origin);
        cache.load(&meta("film-g", "gggg7777")).unwrap();

        // Persist runs on a detached thread; poll briefly.
        for _ in 0..50 {
            if !store.is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        let stored = store.get("film-g").unwrap().expect("entry persisted");
        assert_eq!(stored.hash, "gggg7777");
    }

    #[test]
    fn truncated_fetch_is_corrupt_data() {
        let mut bad = clut_bytes();
        bad.truncate(33);
        let origin = Arc::new(FakeOrigin::new(bad));
        let (cache, store) = cache_with(origin);

        match cache.load(&meta("film-h", "hhhh8888")) {
            Err(CacheError::CorruptData { .. }) => {}
            other => panic!("expected CorruptData, got {other:?}"),
        }
        // A failed decode must never be persisted.
        thread::sleep(Duration::from_millis(50));
        assert!(store.is_empty());
    }
}
