use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::foundation::core::CanvasSize;
use crate::foundation::error::FlipbookResult;
use crate::raster::codec;
use crate::raster::stack::StackSnapshot;
use crate::timeline::store::FrameStore;

/// Minimum spacing between live-thumbnail refreshes while drawing.
pub const LIVE_THUMB_MIN_INTERVAL: Duration = Duration::from_millis(30);

pub(crate) const THUMB_BACKGROUND: [u8; 4] = [255, 255, 255, 255];

struct RenderJob {
    frame: usize,
    epoch: u64,
    snapshot: StackSnapshot,
    canvas: CanvasSize,
}

struct RenderDone {
    frame: usize,
    epoch: u64,
    jpeg: FlipbookResult<Vec<u8>>,
}

/// Per-frame JPEG preview bitmaps for the timeline strip.
///
/// The live frame's preview is composed synchronously from the live stack,
/// throttled during drawing and forced after undo, redo, or a commit. Stored
/// frames render off the hot path on a worker thread; each job carries the
/// selection epoch it was issued under and results that resolve after a newer
/// selection are discarded on delivery.
pub struct ThumbnailCache {
    thumbs: Vec<Option<Arc<Vec<u8>>>>,
    last_live_update: Option<Instant>,
    jobs: Option<mpsc::Sender<RenderJob>>,
    done: mpsc::Receiver<RenderDone>,
    worker: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl ThumbnailCache {
    pub fn new(frame_count: usize) -> Self {
        let (job_tx, job_rx) = mpsc::channel::<RenderJob>();
        let (done_tx, done_rx) = mpsc::channel::<RenderDone>();
        let worker = thread::spawn(move || {
            for job in job_rx {
                let composed =
                    codec::compose_layers(job.snapshot.layers(), job.canvas, Some(THUMB_BACKGROUND));
                let jpeg = codec::encode_jpeg_preview(&composed);
                let delivered = done_tx.send(RenderDone {
                    frame: job.frame,
                    epoch: job.epoch,
                    jpeg,
                });
                if delivered.is_err() {
                    break;
                }
            }
        });
        Self {
            thumbs: vec![None; frame_count],
            last_live_update: None,
            jobs: Some(job_tx),
            done: done_rx,
            worker: Some(worker),
            in_flight: 0,
        }
    }

    /// The most recent preview for a frame, if one has been rendered.
    pub fn thumbnail(&self, frame: usize) -> Option<Arc<Vec<u8>>> {
        self.thumbs.get(frame).and_then(|t| t.clone())
    }

    pub fn pending_jobs(&self) -> usize {
        self.in_flight
    }

    /// Refresh the live frame's preview from the live stack.
    ///
    /// Unforced updates are throttled; forced ones (after undo, redo, or a
    /// commit) always run.
    pub fn update_live(
        &mut self,
        store: &FrameStore,
        now: Instant,
        force: bool,
    ) -> FlipbookResult<bool> {
        if !force
            && let Some(prev) = self.last_live_update
            && now.duration_since(prev) < LIVE_THUMB_MIN_INTERVAL
        {
            tracing::trace!("live thumbnail throttled");
            return Ok(false);
        }
        self.last_live_update = Some(now);
        let flat = store.live().flatten(Some(THUMB_BACKGROUND));
        let jpeg = codec::encode_jpeg_preview(&flat)?;
        self.put(store.current_index(), jpeg);
        Ok(true)
    }

    /// Queue a stored frame for rendering on the worker thread.
    pub fn request_static(&mut self, store: &FrameStore, frame: usize) -> FlipbookResult<()> {
        let snapshot = store.snapshot_at(frame)?.clone();
        let job = RenderJob {
            frame,
            epoch: store.selection_epoch(),
            snapshot,
            canvas: store.config().canvas,
        };
        if let Some(tx) = &self.jobs
            && tx.send(job).is_ok()
        {
            self.in_flight += 1;
        }
        Ok(())
    }

    /// Resize to the store's frame table and re-request every frame. Called
    /// after structural edits (insert, delete, move) shift frame indices.
    pub fn rebuild(&mut self, store: &FrameStore) -> FlipbookResult<()> {
        self.thumbs = vec![None; store.frame_count()];
        for frame in 0..store.frame_count() {
            self.request_static(store, frame)?;
        }
        Ok(())
    }

    /// Apply finished worker results without blocking. Returns how many were
    /// applied; results issued under a superseded epoch are dropped.
    pub fn drain(&mut self, current_epoch: u64) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.done.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if self.apply(done, current_epoch) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until every submitted job has been delivered. Test and shutdown
    /// helper; the interactive path uses [`ThumbnailCache::drain`].
    pub fn wait_idle(&mut self, current_epoch: u64) -> usize {
        let mut applied = 0;
        while self.in_flight > 0 {
            match self.done.recv() {
                Ok(done) => {
                    self.in_flight -= 1;
                    if self.apply(done, current_epoch) {
                        applied += 1;
                    }
                }
                Err(_) => break,
            }
        }
        applied
    }

    fn apply(&mut self, done: RenderDone, current_epoch: u64) -> bool {
        if done.epoch != current_epoch {
            tracing::trace!(
                frame = done.frame,
                job_epoch = done.epoch,
                current_epoch,
                "discarding stale thumbnail"
            );
            return false;
        }
        match done.jpeg {
            Ok(bytes) => {
                self.put(done.frame, bytes);
                true
            }
            Err(e) => {
                tracing::warn!(frame = done.frame, error = %e, "thumbnail render failed");
                false
            }
        }
    }

    fn put(&mut self, frame: usize, jpeg: Vec<u8>) {
        if frame >= self.thumbs.len() {
            self.thumbs.resize(frame + 1, None);
        }
        self.thumbs[frame] = Some(Arc::new(jpeg));
    }
}

impl Drop for ThumbnailCache {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{ProjectConfig, Rgb8};
    use crate::timeline::store::InsertContent;
    use kurbo::Point;

    fn config() -> ProjectConfig {
        ProjectConfig {
            canvas: CanvasSize {
                width: 20,
                height: 20,
            },
            layer_count: 2,
            max_history: 10,
        }
    }

    #[test]
    fn live_updates_throttle_then_force() {
        let store = FrameStore::new(config()).unwrap();
        let mut cache = ThumbnailCache::new(store.frame_count());
        let t0 = Instant::now();

        assert!(cache.update_live(&store, t0, false).unwrap());
        assert!(
            !cache
                .update_live(&store, t0 + Duration::from_millis(10), false)
                .unwrap()
        );
        assert!(
            cache
                .update_live(&store, t0 + Duration::from_millis(10), true)
                .unwrap()
        );
        assert!(
            cache
                .update_live(&store, t0 + Duration::from_millis(45), false)
                .unwrap()
        );
        assert!(cache.thumbnail(0).is_some());
    }

    #[test]
    fn static_render_delivers_for_current_epoch() {
        let mut store = FrameStore::new(config()).unwrap();
        store
            .live_mut()
            .active_mut()
            .paint_disc(Point::new(10.0, 10.0), 4.0, Rgb8::BLACK, 1.0);
        store.commit_live().unwrap();

        let mut cache = ThumbnailCache::new(store.frame_count());
        cache.request_static(&store, 0).unwrap();
        let applied = cache.wait_idle(store.selection_epoch());
        assert_eq!(applied, 1);
        let jpeg = cache.thumbnail(0).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn results_from_a_superseded_selection_are_discarded() {
        let mut store = FrameStore::new(config()).unwrap();
        store.insert_frame(0, InsertContent::Empty).unwrap();

        let mut cache = ThumbnailCache::new(store.frame_count());
        cache.request_static(&store, 0).unwrap();

        // A newer selection supersedes the in-flight job.
        store.select_frame(0).unwrap();
        let applied = cache.wait_idle(store.selection_epoch());
        assert_eq!(applied, 0);
        assert!(cache.thumbnail(0).is_none());
        assert_eq!(cache.pending_jobs(), 0);
    }

    #[test]
    fn rebuild_requests_every_frame() {
        let mut store = FrameStore::new(config()).unwrap();
        store.insert_frame(0, InsertContent::Empty).unwrap();
        store.insert_frame(1, InsertContent::Empty).unwrap();

        let mut cache = ThumbnailCache::new(1);
        cache.rebuild(&store).unwrap();
        let applied = cache.wait_idle(store.selection_epoch());
        assert_eq!(applied, 3);
        for frame in 0..3 {
            assert!(cache.thumbnail(frame).is_some(), "frame {frame}");
        }
    }
}
