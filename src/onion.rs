use crate::foundation::core::{CanvasSize, Rgb8};
use crate::raster::codec;
use crate::raster::surface::RasterSurface;
use crate::timeline::store::FrameStore;

/// Hue of the previous-frame silhouette.
pub const ONION_TINT: Rgb8 = Rgb8::new(50, 150, 255);
/// Display opacity applied to the silhouette alpha.
pub const ONION_OPACITY: f64 = 0.3;

/// Translucent single-hue preview of the frame preceding the live one.
///
/// The overlay is a reference aid, not a literal preview: the previous
/// frame's layers are flattened and then reduced to their silhouette in one
/// flat tint.
pub struct OnionSkin {
    enabled: bool,
    overlay: RasterSurface,
}

impl OnionSkin {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            enabled: false,
            overlay: RasterSurface::new(canvas),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        tracing::debug!(enabled, "onion skin toggled");
    }

    /// The composited overlay; empty whenever the skin is inactive.
    pub fn overlay(&self) -> &RasterSurface {
        &self.overlay
    }

    /// Recompute the overlay from the frame preceding the current selection.
    ///
    /// Cleared outright while disabled, during playback, or on the first
    /// frame. Individual layers that fail to decode are skipped.
    pub fn refresh(&mut self, store: &FrameStore, playing: bool) {
        self.overlay.clear();
        if !self.enabled || playing || store.current_index() == 0 {
            return;
        }
        let Ok(snapshot) = store.snapshot_at(store.current_index() - 1) else {
            return;
        };
        let composed = codec::compose_layers(snapshot.layers(), self.overlay.canvas(), None);
        self.overlay
            .tint_silhouette(&composed, ONION_TINT, ONION_OPACITY);
    }
}
