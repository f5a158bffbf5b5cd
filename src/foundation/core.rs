use std::time::Duration;

use crate::foundation::error::{FlipbookError, FlipbookResult};

pub use kurbo::{Point, Vec2};

/// Fixed pixel dimensions shared by every surface in a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> FlipbookResult<Self> {
        if width == 0 || height == 0 {
            return Err(FlipbookError::validation(
                "CanvasSize dimensions must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn byte_len(self) -> usize {
        self.pixel_count() * 4
    }
}

/// Whole frames per second. The zero rate is rejected at construction so the
/// frame interval is always well defined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(u32);

impl Fps {
    pub fn new(fps: u32) -> FlipbookResult<Self> {
        if fps == 0 {
            return Err(FlipbookError::validation("Fps must be > 0"));
        }
        Ok(Self(fps))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Wall-clock duration of one frame at this rate.
    pub fn frame_duration(self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.0))
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self(12)
    }
}

/// Straight-alpha-free brush color; alpha always comes from the brush opacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fully opaque premultiplied RGBA8 pixel of this color.
    pub fn opaque_premul(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// Project-wide structural configuration, fixed at creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProjectConfig {
    pub canvas: CanvasSize,
    /// Number of paintable layers per frame. Constant for the project lifetime.
    pub layer_count: usize,
    /// Bound on each frame's undo and redo stacks; oldest entries are evicted.
    pub max_history: usize,
}

impl ProjectConfig {
    pub fn validate(&self) -> FlipbookResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(FlipbookError::validation(
                "ProjectConfig canvas dimensions must be > 0",
            ));
        }
        if self.layer_count == 0 {
            return Err(FlipbookError::validation(
                "ProjectConfig layer_count must be >= 1",
            ));
        }
        if self.max_history == 0 {
            return Err(FlipbookError::validation(
                "ProjectConfig max_history must be >= 1",
            ));
        }
        Ok(())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasSize {
                width: 800,
                height: 600,
            },
            layer_count: 4,
            max_history: 30,
        }
    }
}
