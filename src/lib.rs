//! Flipbook is the state engine of a frame-by-frame raster animation editor.
//!
//! A user paints onto a stack of transparent layers, one stack per animation
//! frame, scrubs and reorders frames, and exports the sequence through a
//! capture sink. The engine keeps that mutable raster dataset consistent
//! under interactive editing, per-frame undo/redo, drag-reorder, timed
//! playback, and export.
//!
//! # Pipeline overview
//!
//! 1. **Paint**: pointer samples -> brush rasterization into the live
//!    [`LayerStack`]
//! 2. **Checkpoint/commit**: full-stack snapshots into the per-frame
//!    [`History`] and the [`FrameStore`]
//! 3. **Derive**: onion-skin overlay and thumbnail previews react to frame
//!    changes
//! 4. **Sequence**: playback and export walk the frame table at the
//!    configured rate
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Premultiplied RGBA8** end-to-end; snapshots round-trip bit-exact.
//! - **One logical thread**: every state-mutating operation completes its
//!   decode-and-paint step before returning, so operations never race.
//!   Deferred work carries the selection epoch and stale results are dropped.
//! - **Partial-frame resilience**: a corrupt layer decodes to empty; it never
//!   blanks a frame or fails navigation.
#![forbid(unsafe_code)]

mod brush;
mod editor;
mod export;
mod foundation;
mod onion;
mod playback;
mod raster;
mod thumbnail;
mod timeline;

pub use brush::{
    BrushSettings, BrushStyle, SprayRng, StrokeState, Tool, begin_stroke, extend_stroke,
};
pub use editor::{Editor, EditorEvent, KeyCommand, KeyContext, PointerPhase};
pub use export::{
    DEFAULT_EXPORT_FILENAME, EXPORT_BACKGROUND, ExportPacing, FrameSink, InMemorySink, SinkConfig,
    export_animation,
};
pub use foundation::core::{CanvasSize, Fps, Point, ProjectConfig, Rgb8, Vec2};
pub use foundation::error::{FlipbookError, FlipbookResult};
pub use onion::{ONION_OPACITY, ONION_TINT, OnionSkin};
pub use playback::{PlaybackSequencer, PlaybackState};
pub use raster::codec::{
    EncodedBitmap, compose_layers, decode_surface, encode_jpeg_preview, encode_surface,
};
pub use raster::stack::{LayerStack, StackSnapshot};
pub use raster::surface::RasterSurface;
pub use thumbnail::{LIVE_THUMB_MIN_INTERVAL, ThumbnailCache};
pub use timeline::history::History;
pub use timeline::store::{FrameStore, InsertContent};
