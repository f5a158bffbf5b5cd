use std::time::Instant;

use kurbo::Point;

use crate::brush::{self, BrushSettings, BrushStyle, StrokeState, Tool};
use crate::export::{self, ExportPacing, FrameSink};
use crate::foundation::core::{Fps, ProjectConfig, Rgb8};
use crate::foundation::error::FlipbookResult;
use crate::onion::OnionSkin;
use crate::playback::{PlaybackSequencer, PlaybackState};
use crate::thumbnail::ThumbnailCache;
use crate::timeline::store::{FrameStore, InsertContent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum KeyCommand {
    Undo,
    Redo,
    TogglePlayback,
}

/// Where a key event landed; commands are ignored while a text input has
/// focus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyContext {
    pub text_input_focused: bool,
}

/// Typed input consumed by [`Editor::dispatch`].
///
/// The input collaborator translates whatever presentation layer it fronts
/// (pointer hardware, toolbar widgets, key bindings) into these events;
/// pointer coordinates arrive already unprojected into surface-local space.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum EditorEvent {
    Pointer { x: f64, y: f64, phase: PointerPhase },
    ToolChanged(Tool),
    StyleChanged(BrushStyle),
    ColorChanged(Rgb8),
    SizeChanged(f64),
    OpacityChanged(f64),
    LayerSelected(usize),
    ClearActiveLayer,
    SelectFrame(usize),
    InsertFrame { after: usize, content: InsertContent },
    DeleteFrame(usize),
    MoveFrame { from: usize, to: usize },
    Undo,
    Redo,
    TogglePlayback,
    FpsChanged(u32),
    ToggleOnionSkin,
    Key { command: KeyCommand, context: KeyContext },
}

/// The animation editor session: frame table, live stack, brush, onion skin,
/// playback, and thumbnails behind one dispatch entry point.
pub struct Editor {
    store: FrameStore,
    brush: BrushSettings,
    stroke: Option<StrokeState>,
    onion: OnionSkin,
    playback: PlaybackSequencer,
    thumbs: ThumbnailCache,
    stroke_seq: u64,
}

impl Editor {
    pub fn new(config: ProjectConfig) -> FlipbookResult<Self> {
        let store = FrameStore::new(config)?;
        let thumbs = ThumbnailCache::new(store.frame_count());
        Ok(Self {
            onion: OnionSkin::new(config.canvas),
            playback: PlaybackSequencer::new(Fps::default()),
            brush: BrushSettings::default(),
            stroke: None,
            stroke_seq: 0,
            store,
            thumbs,
        })
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn onion(&self) -> &OnionSkin {
        &self.onion
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn thumbnails(&self) -> &ThumbnailCache {
        &self.thumbs
    }

    /// Mutable cache access for hosts that want to block on pending renders
    /// (e.g. before first showing the timeline strip).
    pub fn thumbnails_mut(&mut self) -> &mut ThumbnailCache {
        &mut self.thumbs
    }

    /// Single entry point for all input collaborators.
    pub fn dispatch(&mut self, event: EditorEvent, now: Instant) -> FlipbookResult<()> {
        match event {
            EditorEvent::Pointer { x, y, phase } => {
                let p = Point::new(x, y);
                match phase {
                    PointerPhase::Down => self.pointer_down(p, now),
                    PointerPhase::Move => self.pointer_move(p, now),
                    PointerPhase::Up => self.pointer_up(now),
                }
            }
            EditorEvent::ToolChanged(tool) => {
                self.brush.tool = tool;
                Ok(())
            }
            EditorEvent::StyleChanged(style) => {
                self.brush.style = style;
                Ok(())
            }
            EditorEvent::ColorChanged(color) => {
                self.brush.color = color;
                Ok(())
            }
            EditorEvent::SizeChanged(size) => {
                self.brush.size = size.max(1.0);
                Ok(())
            }
            EditorEvent::OpacityChanged(opacity) => {
                self.brush.opacity = opacity.clamp(0.0, 1.0);
                Ok(())
            }
            EditorEvent::LayerSelected(index) => self.store.live_mut().set_active(index),
            EditorEvent::ClearActiveLayer => self.clear_active_layer(now),
            EditorEvent::SelectFrame(index) => self.select_frame(index, now),
            EditorEvent::InsertFrame { after, content } => self.insert_frame(after, content, now),
            EditorEvent::DeleteFrame(index) => self.delete_frame(index, now),
            EditorEvent::MoveFrame { from, to } => self.move_frame(from, to),
            EditorEvent::Undo => self.undo(now).map(|_| ()),
            EditorEvent::Redo => self.redo(now).map(|_| ()),
            EditorEvent::TogglePlayback => self.toggle_playback(now),
            EditorEvent::FpsChanged(fps) => self.set_fps(fps, now),
            EditorEvent::ToggleOnionSkin => {
                self.toggle_onion_skin();
                Ok(())
            }
            EditorEvent::Key { command, context } => self.key(command, context, now),
        }
    }

    /// Poll point for the embedding shell: advances playback when a frame is
    /// due and applies finished thumbnail renders.
    pub fn tick(&mut self, now: Instant) -> FlipbookResult<bool> {
        let advanced = self.playback.tick(&mut self.store, now)?;
        self.thumbs.drain(self.store.selection_epoch());
        Ok(advanced)
    }

    fn pointer_down(&mut self, p: Point, now: Instant) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        // Checkpoint before the first pixel of the stroke lands.
        self.store.record_checkpoint()?;
        self.stroke_seq += 1;
        let seed = self.stroke_seq;
        let stroke = brush::begin_stroke(self.store.live_mut().active_mut(), &self.brush, p, seed);
        self.stroke = Some(stroke);
        self.thumbs.update_live(&self.store, now, false)?;
        Ok(())
    }

    fn pointer_move(&mut self, p: Point, now: Instant) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        let Some(stroke) = self.stroke.as_mut() else {
            return Ok(());
        };
        brush::extend_stroke(self.store.live_mut().active_mut(), &self.brush, stroke, p);
        self.thumbs.update_live(&self.store, now, false)?;
        Ok(())
    }

    fn pointer_up(&mut self, now: Instant) -> FlipbookResult<()> {
        if self.stroke.take().is_none() {
            return Ok(());
        }
        self.store.commit_live()?;
        self.thumbs.update_live(&self.store, now, true)?;
        Ok(())
    }

    /// Silent no-op on an empty undo stack or during playback.
    pub fn undo(&mut self, now: Instant) -> FlipbookResult<bool> {
        if self.playback.is_playing() {
            return Ok(false);
        }
        let applied = self.store.undo()?;
        if applied {
            self.onion.refresh(&self.store, false);
            self.thumbs.update_live(&self.store, now, true)?;
        }
        Ok(applied)
    }

    pub fn redo(&mut self, now: Instant) -> FlipbookResult<bool> {
        if self.playback.is_playing() {
            return Ok(false);
        }
        let applied = self.store.redo()?;
        if applied {
            self.onion.refresh(&self.store, false);
            self.thumbs.update_live(&self.store, now, true)?;
        }
        Ok(applied)
    }

    pub fn select_frame(&mut self, index: usize, now: Instant) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        let outgoing = self.store.current_index();
        self.store.select_frame(index)?;
        self.onion.refresh(&self.store, false);
        self.thumbs.request_static(&self.store, outgoing)?;
        self.thumbs.update_live(&self.store, now, true)?;
        self.thumbs.drain(self.store.selection_epoch());
        Ok(())
    }

    pub fn insert_frame(
        &mut self,
        after: usize,
        content: InsertContent,
        now: Instant,
    ) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        self.store.insert_frame(after, content)?;
        self.after_structural_edit(now)
    }

    pub fn delete_frame(&mut self, index: usize, now: Instant) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        self.store.delete_frame(index)?;
        self.after_structural_edit(now)
    }

    pub fn move_frame(&mut self, from: usize, to: usize) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        self.store.move_frame(from, to)?;
        self.onion.refresh(&self.store, false);
        self.thumbs.rebuild(&self.store)?;
        self.thumbs.drain(self.store.selection_epoch());
        Ok(())
    }

    fn after_structural_edit(&mut self, now: Instant) -> FlipbookResult<()> {
        self.onion.refresh(&self.store, false);
        self.thumbs.rebuild(&self.store)?;
        self.thumbs.update_live(&self.store, now, true)?;
        self.thumbs.drain(self.store.selection_epoch());
        Ok(())
    }

    pub fn clear_active_layer(&mut self, now: Instant) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            return Ok(());
        }
        self.store.record_checkpoint()?;
        self.store.live_mut().clear_active();
        self.store.commit_live()?;
        self.thumbs.update_live(&self.store, now, true)?;
        Ok(())
    }

    pub fn toggle_playback(&mut self, now: Instant) -> FlipbookResult<()> {
        if self.playback.is_playing() {
            self.playback.stop(&mut self.store);
            self.onion.refresh(&self.store, false);
            self.thumbs.update_live(&self.store, now, true)?;
        } else {
            // A held stroke cannot survive into playback.
            self.stroke = None;
            self.playback.start(&mut self.store, now)?;
            self.onion.refresh(&self.store, true);
        }
        Ok(())
    }

    pub fn set_fps(&mut self, fps: u32, now: Instant) -> FlipbookResult<()> {
        let fps = Fps::new(fps)?;
        self.playback.set_fps(fps, now);
        Ok(())
    }

    pub fn toggle_onion_skin(&mut self) {
        let enabled = self.onion.enabled();
        self.onion.set_enabled(!enabled);
        self.onion.refresh(&self.store, self.playback.is_playing());
    }

    /// Run the export pipeline into `sink` at the playback rate.
    pub fn export(&mut self, sink: &mut dyn FrameSink, pacing: ExportPacing) -> FlipbookResult<()> {
        export::export_animation(&mut self.store, &mut self.playback, sink, pacing)?;
        self.onion.refresh(&self.store, false);
        Ok(())
    }

    fn key(&mut self, command: KeyCommand, context: KeyContext, now: Instant) -> FlipbookResult<()> {
        if context.text_input_focused {
            tracing::trace!(?command, "key ignored while a text input has focus");
            return Ok(());
        }
        match command {
            KeyCommand::Undo => self.undo(now).map(|_| ()),
            KeyCommand::Redo => self.redo(now).map(|_| ()),
            KeyCommand::TogglePlayback => self.toggle_playback(now),
        }
    }
}
