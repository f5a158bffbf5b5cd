use crate::foundation::core::ProjectConfig;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::stack::{LayerStack, StackSnapshot};
use crate::timeline::history::History;

/// What a newly inserted frame starts out holding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InsertContent {
    Empty,
    DuplicateCurrent,
}

#[derive(Clone, Debug)]
struct Frame {
    snapshot: StackSnapshot,
    history: History,
}

/// Ordered frame table plus the single live layer stack materialized from the
/// selected frame.
///
/// Every state-mutating operation finishes its decode-and-paint step before
/// returning, so overlapping operations are serialized by construction. The
/// selection epoch increases monotonically on every transition of the live
/// content; asynchronous consumers tag work with it and drop results whose
/// epoch is no longer current.
pub struct FrameStore {
    config: ProjectConfig,
    frames: Vec<Frame>,
    current: usize,
    live: LayerStack,
    live_history: History,
    epoch: u64,
}

impl FrameStore {
    /// A new project: one empty frame, selected, with a fresh history.
    pub fn new(config: ProjectConfig) -> FlipbookResult<Self> {
        config.validate()?;
        let frames = vec![Frame {
            snapshot: StackSnapshot::empty(&config)?,
            history: History::new(config.max_history),
        }];
        Ok(Self {
            frames,
            current: 0,
            live: LayerStack::new(&config),
            live_history: History::new(config.max_history),
            epoch: 0,
            config,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn selection_epoch(&self) -> u64 {
        self.epoch
    }

    pub fn live(&self) -> &LayerStack {
        &self.live
    }

    pub fn live_mut(&mut self) -> &mut LayerStack {
        &mut self.live
    }

    /// The history of the frame that is currently live.
    pub fn history(&self) -> &History {
        &self.live_history
    }

    pub fn snapshot_at(&self, index: usize) -> FlipbookResult<&StackSnapshot> {
        self.check_index(index)?;
        Ok(&self.frames[index].snapshot)
    }

    /// Snapshot the live stack onto the undo stack. Called once per stroke,
    /// before its first pixel mutation.
    pub fn record_checkpoint(&mut self) -> FlipbookResult<()> {
        let snapshot = self.live.snapshot()?;
        self.live_history.record_checkpoint(snapshot);
        Ok(())
    }

    /// Serialize the live stack (and its history) into the current frame.
    pub fn commit_live(&mut self) -> FlipbookResult<()> {
        let snapshot = self.live.snapshot()?;
        self.commit_snapshot(snapshot);
        Ok(())
    }

    fn commit_snapshot(&mut self, snapshot: StackSnapshot) {
        let frame = &mut self.frames[self.current];
        frame.snapshot = snapshot;
        frame.history = self.live_history.clone();
    }

    /// Commit the outgoing frame, then materialize `index` as the live frame.
    pub fn select_frame(&mut self, index: usize) -> FlipbookResult<()> {
        self.check_index(index)?;
        self.commit_live()?;
        self.materialize(index);
        Ok(())
    }

    /// Make `index` live without committing the outgoing stack. Used where
    /// the live stack must not be written back: after deleting the live
    /// frame, when leaving playback, and after an export run.
    pub(crate) fn materialize(&mut self, index: usize) {
        debug_assert!(index < self.frames.len());
        self.current = index;
        self.epoch += 1;
        let snapshot = self.frames[index].snapshot.clone();
        self.live.load(&snapshot);
        self.live_history = self.frames[index].history.clone();
        tracing::debug!(frame = index, epoch = self.epoch, "frame materialized");
    }

    /// Playback path: paint a frame's layers straight onto the live stack,
    /// leaving the history binding where it was.
    pub(crate) fn present_frame(&mut self, index: usize) -> FlipbookResult<()> {
        self.check_index(index)?;
        self.current = index;
        self.epoch += 1;
        let snapshot = self.frames[index].snapshot.clone();
        self.live.load(&snapshot);
        Ok(())
    }

    /// Insert a new frame immediately after `after` and select it.
    pub fn insert_frame(&mut self, after: usize, content: InsertContent) -> FlipbookResult<()> {
        self.check_index(after)?;
        self.commit_live()?;
        let snapshot = match content {
            InsertContent::Empty => StackSnapshot::empty(&self.config)?,
            InsertContent::DuplicateCurrent => self.frames[self.current].snapshot.clone(),
        };
        self.frames.insert(
            after + 1,
            Frame {
                snapshot,
                history: History::new(self.config.max_history),
            },
        );
        if self.current > after {
            self.current += 1;
        }
        tracing::debug!(after, frames = self.frames.len(), "frame inserted");
        self.select_frame(after + 1)
    }

    /// Remove a frame and re-select its nearest surviving neighbor.
    pub fn delete_frame(&mut self, index: usize) -> FlipbookResult<()> {
        self.check_index(index)?;
        if self.frames.len() == 1 {
            return Err(FlipbookError::minimum_frames(
                "a project keeps at least one frame",
            ));
        }
        let deleting_live = index == self.current;
        if !deleting_live {
            self.commit_live()?;
        }
        self.frames.remove(index);
        if !deleting_live && self.current > index {
            self.current -= 1;
        }
        let target = index.min(self.frames.len() - 1);
        self.materialize(target);
        tracing::debug!(index, frames = self.frames.len(), "frame deleted");
        Ok(())
    }

    /// Relocate a frame (with its history). The current selection keeps
    /// tracking the same logical frame, including when it sits between `from`
    /// and `to`. An out-of-bounds target is ignored.
    pub fn move_frame(&mut self, from: usize, to: usize) -> FlipbookResult<()> {
        self.check_index(from)?;
        if to >= self.frames.len() {
            tracing::debug!(from, to, "move target out of bounds; ignored");
            return Ok(());
        }
        if from == to {
            return Ok(());
        }
        self.commit_live()?;
        let frame = self.frames.remove(from);
        self.frames.insert(to, frame);
        self.current = if self.current == from {
            to
        } else if from < self.current && self.current <= to {
            self.current - 1
        } else if to <= self.current && self.current < from {
            self.current + 1
        } else {
            self.current
        };
        self.epoch += 1;
        tracing::debug!(from, to, current = self.current, "frame moved");
        Ok(())
    }

    /// Restore the most recent checkpoint. Returns `Ok(false)` (a silent
    /// no-op) when the undo stack is empty.
    pub fn undo(&mut self) -> FlipbookResult<bool> {
        let current = self.live.snapshot()?;
        let Some(snapshot) = self.live_history.pop_undo(current) else {
            tracing::debug!("undo with empty stack; ignored");
            return Ok(false);
        };
        self.live.load(&snapshot);
        self.epoch += 1;
        self.commit_snapshot(snapshot);
        Ok(true)
    }

    /// Symmetric to [`FrameStore::undo`].
    pub fn redo(&mut self) -> FlipbookResult<bool> {
        let current = self.live.snapshot()?;
        let Some(snapshot) = self.live_history.pop_redo(current) else {
            tracing::debug!("redo with empty stack; ignored");
            return Ok(false);
        };
        self.live.load(&snapshot);
        self.epoch += 1;
        self.commit_snapshot(snapshot);
        Ok(true)
    }

    fn check_index(&self, index: usize) -> FlipbookResult<()> {
        if index >= self.frames.len() {
            return Err(FlipbookError::invalid_index(format!(
                "frame {index} out of range ({} frames)",
                self.frames.len()
            )));
        }
        Ok(())
    }
}
