use std::time::Instant;

use crate::foundation::core::Fps;
use crate::foundation::error::FlipbookResult;
use crate::timeline::store::FrameStore;

/// Transport state; never persisted per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackState {
    pub playing: bool,
    pub fps: Fps,
}

/// Cooperative playback loop: `Stopped -> Playing -> Stopped`.
///
/// The original interval timer becomes an explicit deadline consumed by
/// [`PlaybackSequencer::tick`]; the driver calls `tick` with the current time
/// and the sequencer advances the frame table whenever the deadline passed.
pub struct PlaybackSequencer {
    state: PlaybackState,
    next_due: Option<Instant>,
}

impl PlaybackSequencer {
    pub fn new(fps: Fps) -> Self {
        Self {
            state: PlaybackState {
                playing: false,
                fps,
            },
            next_due: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn fps(&self) -> Fps {
        self.state.fps
    }

    /// Commit the live frame and enter `Playing`. Already playing is a no-op.
    pub fn start(&mut self, store: &mut FrameStore, now: Instant) -> FlipbookResult<()> {
        if self.state.playing {
            return Ok(());
        }
        store.commit_live()?;
        self.state.playing = true;
        self.next_due = Some(now + self.state.fps.frame_duration());
        tracing::debug!(fps = self.state.fps.get(), "playback started");
        Ok(())
    }

    /// Leave `Playing` and re-materialize the frame the playhead stopped on,
    /// restoring its history binding.
    pub fn stop(&mut self, store: &mut FrameStore) {
        if !self.state.playing {
            return;
        }
        self.state.playing = false;
        self.next_due = None;
        store.materialize(store.current_index());
        tracing::debug!(frame = store.current_index(), "playback stopped");
    }

    /// Advance one frame if the deadline passed. Playback paints frames
    /// straight onto the live stack; undo/redo bindings are not touched.
    pub fn tick(&mut self, store: &mut FrameStore, now: Instant) -> FlipbookResult<bool> {
        let Some(due) = self.next_due else {
            return Ok(false);
        };
        if now < due {
            return Ok(false);
        }
        let next = (store.current_index() + 1) % store.frame_count();
        store.present_frame(next)?;

        let period = self.state.fps.frame_duration();
        let mut rearmed = due + period;
        if rearmed <= now {
            // Late ticks coalesce instead of bursting to catch up.
            rearmed = now + period;
        }
        self.next_due = Some(rearmed);
        Ok(true)
    }

    /// Takes effect immediately: a running timer is re-armed at the new rate
    /// without losing the current frame position.
    pub fn set_fps(&mut self, fps: Fps, now: Instant) {
        self.state.fps = fps;
        if self.state.playing {
            self.next_due = Some(now + fps.frame_duration());
        }
        tracing::debug!(fps = fps.get(), "playback rate set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{CanvasSize, ProjectConfig, Rgb8};
    use crate::timeline::store::InsertContent;
    use kurbo::Point;
    use std::time::Duration;

    fn store_with_frames(n: usize) -> FrameStore {
        let cfg = ProjectConfig {
            canvas: CanvasSize {
                width: 16,
                height: 16,
            },
            layer_count: 2,
            max_history: 10,
        };
        let mut store = FrameStore::new(cfg).unwrap();
        for _ in 1..n {
            store
                .insert_frame(store.current_index(), InsertContent::Empty)
                .unwrap();
        }
        store.select_frame(0).unwrap();
        store
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn advances_modulo_frame_count_at_rate() {
        let mut store = store_with_frames(3);
        let mut seq = PlaybackSequencer::new(Fps::new(12).unwrap());
        let t0 = Instant::now();

        seq.start(&mut store, t0).unwrap();
        assert!(seq.is_playing());
        assert!(!seq.tick(&mut store, t0 + ms(50)).unwrap());
        assert_eq!(store.current_index(), 0);

        assert!(seq.tick(&mut store, t0 + ms(84)).unwrap());
        assert_eq!(store.current_index(), 1);
        assert!(seq.tick(&mut store, t0 + ms(167)).unwrap());
        assert_eq!(store.current_index(), 2);
        assert!(seq.tick(&mut store, t0 + ms(250)).unwrap());
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn stop_keeps_playhead_and_restores_history_binding() {
        let mut store = store_with_frames(3);
        store.record_checkpoint().unwrap();
        store
            .live_mut()
            .active_mut()
            .paint_disc(Point::new(8.0, 8.0), 2.0, Rgb8::BLACK, 1.0);

        let mut seq = PlaybackSequencer::new(Fps::new(12).unwrap());
        let t0 = Instant::now();
        seq.start(&mut store, t0).unwrap();

        // Playback moves the playhead without swapping histories.
        seq.tick(&mut store, t0 + ms(90)).unwrap();
        assert_eq!(store.current_index(), 1);
        assert!(store.history().can_undo());

        seq.stop(&mut store);
        assert!(!seq.is_playing());
        assert_eq!(store.current_index(), 1);
        // Frame 1 never had a checkpoint; its own history is live again.
        assert!(!store.history().can_undo());
    }

    #[test]
    fn tick_does_nothing_when_stopped() {
        let mut store = store_with_frames(2);
        let mut seq = PlaybackSequencer::new(Fps::default());
        assert!(!seq.tick(&mut store, Instant::now()).unwrap());
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn fps_change_rearms_without_moving_playhead() {
        let mut store = store_with_frames(3);
        let mut seq = PlaybackSequencer::new(Fps::new(2).unwrap());
        let t0 = Instant::now();
        seq.start(&mut store, t0).unwrap();

        // At 2 fps nothing is due yet at +100ms.
        assert!(!seq.tick(&mut store, t0 + ms(100)).unwrap());

        // Switching to 20 fps re-arms from "now"; +160ms passes the new 50ms
        // deadline.
        seq.set_fps(Fps::new(20).unwrap(), t0 + ms(100));
        assert_eq!(store.current_index(), 0);
        assert!(seq.tick(&mut store, t0 + ms(160)).unwrap());
        assert_eq!(store.current_index(), 1);
    }

    #[test]
    fn late_ticks_coalesce() {
        let mut store = store_with_frames(4);
        let mut seq = PlaybackSequencer::new(Fps::new(10).unwrap());
        let t0 = Instant::now();
        seq.start(&mut store, t0).unwrap();

        // Far past several periods: one advance, then the next deadline sits
        // a full period after "now".
        assert!(seq.tick(&mut store, t0 + ms(1000)).unwrap());
        assert_eq!(store.current_index(), 1);
        assert!(!seq.tick(&mut store, t0 + ms(1050)).unwrap());
        assert!(seq.tick(&mut store, t0 + ms(1101)).unwrap());
        assert_eq!(store.current_index(), 2);
    }
}
