use std::thread;

use crate::foundation::core::Fps;
use crate::foundation::error::FlipbookResult;
use crate::playback::PlaybackSequencer;
use crate::raster::codec;
use crate::raster::surface::RasterSurface;
use crate::timeline::store::FrameStore;

/// Suggested name for the encoded artifact a sink produces.
pub const DEFAULT_EXPORT_FILENAME: &str = "animation.webm";

/// Frames are flattened onto opaque white before being fed to the sink.
pub const EXPORT_BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    pub frame_count: usize,
}

/// Capture contract for the encoding transport.
///
/// `push_frame` is called once per animation frame in strictly increasing
/// index order, at the configured fps cadence.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> FlipbookResult<()>;
    /// Push one composed frame.
    fn push_frame(&mut self, index: usize, frame: &RasterSurface) -> FlipbookResult<()>;
    /// Called once after the last frame's hold completes.
    fn end(&mut self) -> FlipbookResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(usize, RasterSurface)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(usize, RasterSurface)] {
        &self.frames
    }

    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> FlipbookResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, index: usize, frame: &RasterSurface) -> FlipbookResult<()> {
        self.frames.push((index, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> FlipbookResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// How the per-frame hold is spent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportPacing {
    /// Sleep `1000/fps` ms per frame, for sinks capturing in real time.
    Realtime,
    /// No holds; the sink sees the same sequence as fast as it renders.
    #[default]
    Immediate,
}

/// Drive every frame, in order, through the sink at the playback rate.
///
/// Active playback is stopped first. Each frame is composed off-screen,
/// sequentially layer by layer, so the z-order is deterministic regardless of
/// how slow an individual decode is; undecodable layers degrade to empty and
/// the sink always receives the full sequence length. On completion the live
/// stack is restored to the current frame's content.
#[tracing::instrument(level = "debug", skip_all, fields(frames = store.frame_count()))]
pub fn export_animation(
    store: &mut FrameStore,
    playback: &mut PlaybackSequencer,
    sink: &mut dyn FrameSink,
    pacing: ExportPacing,
) -> FlipbookResult<()> {
    if playback.is_playing() {
        playback.stop(store);
    }
    store.commit_live()?;

    let canvas = store.config().canvas;
    let fps = playback.fps();
    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps,
        frame_count: store.frame_count(),
    })?;

    let hold = fps.frame_duration();
    for index in 0..store.frame_count() {
        let snapshot = store.snapshot_at(index)?;
        let composed = codec::compose_layers(snapshot.layers(), canvas, Some(EXPORT_BACKGROUND));
        sink.push_frame(index, &composed)?;
        if pacing == ExportPacing::Realtime {
            thread::sleep(hold);
        }
    }
    sink.end()?;

    store.materialize(store.current_index());
    Ok(())
}
