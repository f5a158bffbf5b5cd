use kurbo::Point;

use crate::foundation::core::Rgb8;
use crate::raster::surface::RasterSurface;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BrushStyle {
    #[default]
    Round,
    Square,
    Spray,
    Marker,
}

/// Editor-session brush configuration, passed by reference into every stroke
/// operation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BrushSettings {
    pub tool: Tool,
    pub style: BrushStyle,
    pub color: Rgb8,
    /// Stroke width / stamp side in pixels.
    pub size: f64,
    /// Paint opacity in `[0, 1]`. The eraser ignores it.
    pub opacity: f64,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Brush,
            style: BrushStyle::Round,
            color: Rgb8::BLACK,
            size: 5.0,
            opacity: 1.0,
        }
    }
}

impl BrushSettings {
    fn alpha(&self) -> f64 {
        self.opacity.clamp(0.0, 1.0)
    }

    /// Markers stay translucent no matter how opaque the brush is set.
    fn marker_alpha(&self) -> f64 {
        self.alpha().min(0.5)
    }

    fn radius(&self) -> f64 {
        self.size / 2.0
    }

    /// Stamp spacing along a dragged square/marker segment.
    fn stamp_spacing(&self) -> f64 {
        (self.size / 8.0).max(1.0)
    }

    /// Dots emitted per spray call. Depends on brush size only, not on travel
    /// distance, so fast drags under-sample.
    fn spray_count(&self) -> usize {
        (self.size * 1.5).max(1.0).ceil() as usize
    }
}

/// Live state of one stroke.
///
/// Owned by the stroke lifecycle: created by [`begin_stroke`], advanced by
/// [`extend_stroke`], dropped when the stroke ends, so no cursor position or
/// stamp mask can leak across strokes.
#[derive(Clone, Debug)]
pub struct StrokeState {
    last: Point,
    rng: SprayRng,
    /// Marker strokes flag each painted pixel so overlapping stamps within a
    /// single stroke do not accumulate opacity. Repeated strokes still do.
    stamped: Option<Vec<u8>>,
}

impl StrokeState {
    pub fn last_point(&self) -> Point {
        self.last
    }
}

/// Open a stroke and paint its first point (a lone click must leave a mark).
pub fn begin_stroke(
    surface: &mut RasterSurface,
    brush: &BrushSettings,
    at: Point,
    seed: u64,
) -> StrokeState {
    let mut state = StrokeState {
        last: at,
        rng: SprayRng::new(seed),
        stamped: matches!((brush.tool, brush.style), (Tool::Brush, BrushStyle::Marker))
            .then(|| vec![0u8; surface.canvas().pixel_count()]),
    };

    match brush.tool {
        Tool::Eraser => surface.erase_disc(at, brush.radius()),
        Tool::Brush => match brush.style {
            BrushStyle::Round => surface.paint_disc(at, brush.radius(), brush.color, brush.alpha()),
            BrushStyle::Square => {
                surface.paint_square(at, brush.size, brush.color, brush.alpha(), None);
            }
            BrushStyle::Marker => {
                surface.paint_square(
                    at,
                    brush.size,
                    brush.color,
                    brush.marker_alpha(),
                    state.stamped.as_deref_mut(),
                );
            }
            BrushStyle::Spray => spray_burst(surface, brush, &mut state.rng, at),
        },
    }

    state
}

/// Rasterize the segment from the stroke's last point to `to`.
pub fn extend_stroke(
    surface: &mut RasterSurface,
    brush: &BrushSettings,
    state: &mut StrokeState,
    to: Point,
) {
    match brush.tool {
        Tool::Eraser => surface.erase_capsule(state.last, to, brush.radius()),
        Tool::Brush => match brush.style {
            BrushStyle::Round => {
                surface.paint_capsule(state.last, to, brush.radius(), brush.color, brush.alpha());
            }
            BrushStyle::Square | BrushStyle::Marker => stamp_segment(surface, brush, state, to),
            // No interpolation: dot density depends only on the sample point.
            BrushStyle::Spray => spray_burst(surface, brush, &mut state.rng, to),
        },
    }
    state.last = to;
}

fn stamp_segment(
    surface: &mut RasterSurface,
    brush: &BrushSettings,
    state: &mut StrokeState,
    to: Point,
) {
    let alpha = match brush.style {
        BrushStyle::Marker => brush.marker_alpha(),
        _ => brush.alpha(),
    };
    let dist = state.last.distance(to);
    let steps = (dist / brush.stamp_spacing()).ceil() as usize;
    for i in 1..=steps {
        let t = i as f64 / steps as f64;
        let p = state.last.lerp(to, t);
        surface.paint_square(p, brush.size, brush.color, alpha, state.stamped.as_deref_mut());
    }
}

fn spray_burst(surface: &mut RasterSurface, brush: &BrushSettings, rng: &mut SprayRng, at: Point) {
    let alpha = brush.alpha();
    for _ in 0..brush.spray_count() {
        let angle = rng.next_f64() * std::f64::consts::TAU;
        // sqrt keeps the dot distribution uniform over the disk area instead
        // of clustering at the center.
        let r = rng.next_f64().sqrt() * brush.size;
        let px = at.x + r * angle.cos();
        let py = at.y + r * angle.sin();
        surface.paint_pixel(px.floor() as i64, py.floor() as i64, brush.color, alpha);
    }
}

/// Seeded splitmix64; spray scatter stays reproducible for a given stroke seed.
#[derive(Clone, Debug)]
pub struct SprayRng(u64);

impl SprayRng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}
