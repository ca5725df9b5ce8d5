//! Render-job coordination.
//!
//! One interactive side issues grading requests; one background worker
//! thread owns the decoded image, resolves LUTs through the cache and
//! runs the sampler. The two sides talk exclusively over channels, so
//! the interactive side never blocks while jobs are outstanding.
//!
//! Responses are correlated purely by job id, never by arrival order: a
//! router thread delivers each response into its job's one-shot channel
//! and drops responses for jobs nobody waits on anymore (cooperative
//! cancellation — in-progress work is not preempted, late results are
//! discarded).
//!
//! Invariants:
//! - at most one decoded image is held; a replacement drops the prior
//!   one immediately, as does worker teardown
//! - a render against a superseded image id fails with
//!   [`WorkerError::StaleImage`] before any LUT resolution or sampling
//! - an error is scoped to its one job; the held image and other jobs
//!   are unaffected

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use lutgrade_cache::{CacheError, LutCache, LutMeta};
use lutgrade_render::{Backend, Rgba8Image, Sampler};

/// Opaque per-request token used to match responses to requests.
pub type JobId = String;

/// Worker-side failures, scoped to a single job.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The render referenced an image that is no longer current.
    #[error("stale image: requested {requested}, current {current:?}")]
    StaleImage {
        /// Image id the render asked for.
        requested: String,
        /// Image id the worker currently holds, if any.
        current: Option<String>,
    },

    /// LUT resolution failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Sampler construction or execution failed.
    #[error("render failed: {0}")]
    Render(String),

    /// The job was cancelled or the worker shut down before replying.
    #[error("job abandoned")]
    Abandoned,
}

/// Image quality tiers, each capping the longest edge of the held image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    /// Thumbnail-scale previews.
    Thumbnail,
    /// Larger compare view.
    Compare,
}

impl Quality {
    /// Longest-edge cap for this tier.
    pub fn max_edge(self) -> u32 {
        match self {
            Quality::Thumbnail => 300,
            Quality::Compare => 1920,
        }
    }
}

enum Request {
    SetImage {
        image: Rgba8Image,
        id: String,
        quality: Quality,
    },
    Render {
        meta: LutMeta,
        image_id: String,
        job_id: JobId,
    },
    Shutdown,
}

struct Response {
    job_id: JobId,
    result: Result<Rgba8Image, WorkerError>,
}

type PendingMap = Arc<Mutex<HashMap<JobId, Sender<Result<Rgba8Image, WorkerError>>>>>;

/// A pending render job. Await it with [`RenderTicket::wait`] or drop it
/// to abandon interest in the result.
pub struct RenderTicket {
    /// The job's correlation token.
    pub job_id: JobId,
    rx: Receiver<Result<Rgba8Image, WorkerError>>,
}

impl RenderTicket {
    /// Blocks until the job completes.
    pub fn wait(self) -> Result<Rgba8Image, WorkerError> {
        self.rx.recv().map_err(|_| WorkerError::Abandoned)?
    }
}

/// Interactive-side handle to the background worker.
pub struct PreviewWorker {
    tx: Sender<Request>,
    pending: PendingMap,
    current: Mutex<Option<(String, Quality)>>,
    worker: Option<JoinHandle<()>>,
    router: Option<JoinHandle<()>>,
}

impl PreviewWorker {
    /// Spawns the worker and router threads.
    ///
    /// The sampler is built lazily on the worker thread at the first
    /// render, on the requested backend.
    pub fn spawn(cache: Arc<LutCache>, backend: Backend) -> Self {
        let (tx_req, rx_req) = unbounded::<Request>();
        let (tx_resp, rx_resp) = unbounded::<Response>();

        let worker = thread::spawn(move || worker_loop(rx_req, tx_resp, cache, backend));

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let router = {
            let pending = pending.clone();
            thread::spawn(move || {
                for resp in rx_resp.iter() {
                    // Route strictly by id; a missing entry means the job
                    // was cancelled and its late result is discarded.
                    match pending.lock().remove(&resp.job_id) {
                        Some(tx) => {
                            let _ = tx.send(resp.result);
                        }
                        None => debug!(job_id = %resp.job_id, "dropping result for abandoned job"),
                    }
                }
            })
        };

        Self {
            tx: tx_req,
            pending,
            current: Mutex::new(None),
            worker: Some(worker),
            router: Some(router),
        }
    }

    /// Hands a decoded image to the worker under `id`.
    ///
    /// The worker resizes it to the quality tier's cap and drops any
    /// previously held image. A no-op when the same id is already
    /// current at equal-or-higher quality, to avoid redundant work.
    pub fn set_image(&self, image: Rgba8Image, id: &str, quality: Quality) {
        {
            let mut current = self.current.lock();
            if let Some((cur_id, cur_quality)) = current.as_ref() {
                if cur_id == id && *cur_quality >= quality {
                    debug!(id, "image already current at sufficient quality");
                    return;
                }
            }
            *current = Some((id.to_string(), quality));
        }
        let _ = self.tx.send(Request::SetImage {
            image,
            id: id.to_string(),
            quality,
        });
    }

    /// Requests a graded preview of the current image under `meta`.
    ///
    /// Returns immediately; the result arrives through the ticket.
    /// Completion order across tickets is unspecified.
    pub fn render(&self, meta: &LutMeta, image_id: &str) -> RenderTicket {
        let job_id = Uuid::new_v4().to_string();
        let (tx, rx) = bounded(1);
        self.pending.lock().insert(job_id.clone(), tx);

        let _ = self.tx.send(Request::Render {
            meta: meta.clone(),
            image_id: image_id.to_string(),
            job_id: job_id.clone(),
        });

        RenderTicket { job_id, rx }
    }

    /// Abandons interest in a pending job. The worker may still finish
    /// the work; its result is discarded on arrival.
    pub fn cancel(&self, job_id: &JobId) {
        if self.pending.lock().remove(job_id).is_some() {
            debug!(%job_id, "job cancelled");
        }
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("render worker panicked during shutdown");
            }
        }
        // Worker exit closes the response channel, which ends the router.
        if let Some(router) = self.router.take() {
            let _ = router.join();
        }
    }
}

fn worker_loop(
    rx: Receiver<Request>,
    tx: Sender<Response>,
    cache: Arc<LutCache>,
    backend: Backend,
) {
    // The single held image, exclusively owned by this thread.
    let mut current: Option<(Rgba8Image, String)> = None;
    let mut sampler: Option<Sampler> = None;

    for req in rx.iter() {
        match req {
            Request::SetImage { image, id, quality } => {
                let sized = image.fit_within(quality.max_edge());
                debug!(
                    id,
                    width = sized.width,
                    height = sized.height,
                    "image replaced"
                );
                // Assignment drops the previous image here.
                current = Some((sized, id));
            }
            Request::Render {
                meta,
                image_id,
                job_id,
            } => {
                let result = run_job(&current, &mut sampler, &cache, backend, &meta, &image_id);
                if tx
                    .send(Response {
                        job_id,
                        result,
                    })
                    .is_err()
                {
                    break;
                }
            }
            Request::Shutdown => break,
        }
    }
    // `current` drops with the loop, releasing the held image.
}

fn run_job(
    current: &Option<(Rgba8Image, String)>,
    sampler: &mut Option<Sampler>,
    cache: &LutCache,
    backend: Backend,
    meta: &LutMeta,
    image_id: &str,
) -> Result<Rgba8Image, WorkerError> {
    // Stale check comes first: a render racing an image replacement must
    // fail here, before any LUT resolution or sampling happens.
    let image = match current {
        Some((image, id)) if id == image_id => image,
        other => {
            return Err(WorkerError::StaleImage {
                requested: image_id.to_string(),
                current: other.as_ref().map(|(_, id)| id.clone()),
            });
        }
    };

    let lut = cache.load(meta)?;

    if sampler.is_none() {
        *sampler =
            Some(Sampler::with_backend(backend).map_err(|e| WorkerError::Render(e.to_string()))?);
    }
    let sampler = sampler.as_ref().ok_or_else(|| WorkerError::Render("no sampler".into()))?;

    sampler
        .apply(image, &lut.lut)
        .map_err(|e| WorkerError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lutgrade_cache::{FetchError, MemoryStore, OriginFetch};
    use lutgrade_core::{clut, pack, Lut3d};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Origin serving constant-color LUTs; `slow-` assets take a while.
    struct TestOrigin {
        fetches: AtomicUsize,
    }

    impl TestOrigin {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl OriginFetch for TestOrigin {
        fn fetch(&self, file: &str) -> Result<Vec<u8>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if file.contains("slow") {
                std::thread::sleep(Duration::from_millis(150));
            }
            // File name encodes the flood color: .../<v>.clut
            let v: f32 = file
                .rsplit('/')
                .next()
                .and_then(|f| f.strip_suffix(".clut"))
                .and_then(|f| f.rsplit('-').next())
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| FetchError("bad test path".into()))?;
            let lut = Lut3d::from_data(vec![[v, v, v]; 8], 2).map_err(|e| FetchError(e.to_string()))?;
            Ok(clut::encode(&pack(&lut)))
        }
    }

    fn meta_for(id: &str) -> LutMeta {
        LutMeta {
            id: id.into(),
            name: id.into(),
            file: format!("/LUTS/test/{id}.clut"),
            category: "test".into(),
            hash: "t".into(),
        }
    }

    fn setup() -> (PreviewWorker, Arc<TestOrigin>) {
        let origin = Arc::new(TestOrigin::new());
        let cache = Arc::new(LutCache::new(
            Arc::new(MemoryStore::new()),
            origin.clone(),
        ));
        (PreviewWorker::spawn(cache, Backend::Cpu), origin)
    }

    fn white_image(width: u32, height: u32) -> Rgba8Image {
        let mut img = Rgba8Image::new(width, height);
        img.pixels.fill(255);
        img
    }

    #[test]
    fn stale_image_fails_without_lut_resolution() {
        let (worker, origin) = setup();
        worker.set_image(white_image(8, 8), "img-1", Quality::Thumbnail);

        let ticket = worker.render(&meta_for("slow-0.5"), "img-gone");
        match ticket.wait() {
            Err(WorkerError::StaleImage { requested, current }) => {
                assert_eq!(requested, "img-gone");
                assert_eq!(current.as_deref(), Some("img-1"));
            }
            other => panic!("expected StaleImage, got {other:?}"),
        }
        assert_eq!(origin.count(), 0, "stale render must not touch the cache");
    }

    #[test]
    fn render_before_any_image_is_stale() {
        let (worker, _) = setup();
        let ticket = worker.render(&meta_for("slow-0.5"), "img-1");
        match ticket.wait() {
            Err(WorkerError::StaleImage { current: None, .. }) => {}
            other => panic!("expected StaleImage, got {other:?}"),
        }
    }

    #[test]
    fn responses_route_by_job_id_not_order() {
        let (worker, _) = setup();
        worker.set_image(white_image(4, 4), "img-1", Quality::Thumbnail);

        // First job is slow, second is fast; completion order on the
        // worker is sequential, but routing must still match each ticket
        // to its own color.
        let slow = worker.render(&meta_for("slow-0.2"), "img-1");
        let fast = worker.render(&meta_for("fast-0.8"), "img-1");
        assert_ne!(slow.job_id, fast.job_id);

        let fast_img = fast.wait().unwrap();
        let slow_img = slow.wait().unwrap();
        assert_eq!(fast_img.pixel(0, 0)[0], 204); // 0.8 * 255 rounded
        assert_eq!(slow_img.pixel(0, 0)[0], 51); // 0.2 * 255 rounded
    }

    #[test]
    fn graded_output_matches_held_image_dimensions() {
        let (worker, _) = setup();
        worker.set_image(white_image(600, 300), "img-1", Quality::Thumbnail);
        let out = worker.render(&meta_for("fast-0.5"), "img-1").wait().unwrap();
        assert_eq!((out.width, out.height), (300, 150));
    }

    #[test]
    fn quality_upgrade_replaces_but_downgrade_is_noop() {
        let (worker, _) = setup();
        worker.set_image(white_image(600, 300), "img-1", Quality::Thumbnail);
        let thumb = worker.render(&meta_for("fast-0.5"), "img-1").wait().unwrap();
        assert_eq!(thumb.width, 300);

        // Upgrade to the compare tier re-sends the image.
        worker.set_image(white_image(600, 300), "img-1", Quality::Compare);
        let compare = worker.render(&meta_for("fast-0.5"), "img-1").wait().unwrap();
        assert_eq!(compare.width, 600);

        // Asking for thumbnail again is a no-op; the compare image stays.
        worker.set_image(white_image(600, 300), "img-1", Quality::Thumbnail);
        let still = worker.render(&meta_for("fast-0.5"), "img-1").wait().unwrap();
        assert_eq!(still.width, 600);
    }

    #[test]
    fn replacing_image_staleness_applies_to_old_id() {
        let (worker, _) = setup();
        worker.set_image(white_image(4, 4), "img-1", Quality::Thumbnail);
        worker.set_image(white_image(4, 4), "img-2", Quality::Thumbnail);

        match worker.render(&meta_for("fast-0.5"), "img-1").wait() {
            Err(WorkerError::StaleImage { current, .. }) => {
                assert_eq!(current.as_deref(), Some("img-2"));
            }
            other => panic!("expected StaleImage, got {other:?}"),
        }
        // The new id still renders fine.
        assert!(worker.render(&meta_for("fast-0.5"), "img-2").wait().is_ok());
    }

    #[test]
    fn cancelled_job_result_is_discarded() {
        let (worker, _) = setup();
        worker.set_image(white_image(4, 4), "img-1", Quality::Thumbnail);

        let ticket = worker.render(&meta_for("slow-0.5"), "img-1");
        worker.cancel(&ticket.job_id);
        match ticket.wait() {
            Err(WorkerError::Abandoned) => {}
            other => panic!("expected Abandoned, got {other:?}"),
        }

        // The worker itself is unaffected.
        assert!(worker.render(&meta_for("fast-0.9"), "img-1").wait().is_ok());
    }

    #[test]
    fn cache_error_is_scoped_to_its_job() {
        let (worker, _) = setup();
        worker.set_image(white_image(4, 4), "img-1", Quality::Thumbnail);

        match worker.render(&meta_for("broken"), "img-1").wait() {
            Err(WorkerError::Cache(CacheError::NotFound(_))) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(worker.render(&meta_for("fast-0.5"), "img-1").wait().is_ok());
    }
}
