use crate::foundation::core::{CanvasSize, ProjectConfig};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::codec::{self, EncodedBitmap};
use crate::raster::surface::RasterSurface;

/// One frame's serialized layer contents, insertion order = stack order
/// (index 0 is the bottom layer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackSnapshot(Vec<EncodedBitmap>);

impl StackSnapshot {
    /// Snapshot of a fully transparent stack. Every layer shares the same
    /// encoded bytes.
    pub fn empty(config: &ProjectConfig) -> FlipbookResult<Self> {
        let blank = codec::encode_surface(&RasterSurface::new(config.canvas))?;
        Ok(Self(vec![blank; config.layer_count]))
    }

    pub fn from_layers(layers: Vec<EncodedBitmap>) -> Self {
        Self(layers)
    }

    pub fn layers(&self) -> &[EncodedBitmap] {
        &self.0
    }

    pub fn layer_count(&self) -> usize {
        self.0.len()
    }
}

/// The fixed-count ordered stack of paintable surfaces for one frame.
///
/// The layer count and canvas size are constant for the project lifetime;
/// `active` always stays within `[0, layer_count)`.
#[derive(Clone, Debug)]
pub struct LayerStack {
    canvas: CanvasSize,
    layers: Vec<RasterSurface>,
    active: usize,
}

impl LayerStack {
    pub fn new(config: &ProjectConfig) -> Self {
        Self {
            canvas: config.canvas,
            layers: (0..config.layer_count)
                .map(|_| RasterSurface::new(config.canvas))
                .collect(),
            active: 0,
        }
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, index: usize) -> FlipbookResult<()> {
        if index >= self.layers.len() {
            return Err(FlipbookError::invalid_index(format!(
                "layer {index} out of range ({} layers)",
                self.layers.len()
            )));
        }
        self.active = index;
        Ok(())
    }

    pub fn layer(&self, index: usize) -> FlipbookResult<&RasterSurface> {
        self.layers.get(index).ok_or_else(|| {
            FlipbookError::invalid_index(format!(
                "layer {index} out of range ({} layers)",
                self.layers.len()
            ))
        })
    }

    pub fn active(&self) -> &RasterSurface {
        &self.layers[self.active]
    }

    /// The surface stroke operations target.
    pub fn active_mut(&mut self) -> &mut RasterSurface {
        &mut self.layers[self.active]
    }

    pub fn clear_all(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    pub fn clear_active(&mut self) {
        self.layers[self.active].clear();
    }

    /// Serialize every layer in stack order.
    pub fn snapshot(&self) -> FlipbookResult<StackSnapshot> {
        let layers = self
            .layers
            .iter()
            .map(codec::encode_surface)
            .collect::<FlipbookResult<Vec<_>>>()?;
        Ok(StackSnapshot(layers))
    }

    /// Clear the stack and materialize a snapshot into it.
    ///
    /// A layer that fails to decode is left transparent; one corrupt layer
    /// never blocks loading the rest of the frame.
    pub fn load(&mut self, snapshot: &StackSnapshot) {
        self.clear_all();
        for (i, layer) in self.layers.iter_mut().enumerate() {
            let Some(bitmap) = snapshot.layers().get(i) else {
                continue;
            };
            match codec::decode_surface(bitmap, self.canvas) {
                Ok(decoded) => *layer = decoded,
                Err(e) => tracing::warn!(layer = i, error = %e, "loading layer as empty"),
            }
        }
        if snapshot.layer_count() > self.layers.len() {
            tracing::warn!(
                snapshot_layers = snapshot.layer_count(),
                stack_layers = self.layers.len(),
                "snapshot has more layers than the stack; extras ignored"
            );
        }
    }

    /// Composite all layers bottom-to-top onto a fresh surface.
    pub fn flatten(&self, background: Option<[u8; 4]>) -> RasterSurface {
        let mut out = RasterSurface::new(self.canvas);
        if let Some(bg) = background {
            out.fill(bg);
        }
        for layer in &self.layers {
            out.composite_over(layer, 1.0);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Rgb8;
    use kurbo::Point;

    fn config() -> ProjectConfig {
        ProjectConfig {
            canvas: CanvasSize {
                width: 32,
                height: 24,
            },
            layer_count: 4,
            max_history: 30,
        }
    }

    #[test]
    fn active_index_is_validated() {
        let mut stack = LayerStack::new(&config());
        assert_eq!(stack.active_index(), 0);
        stack.set_active(3).unwrap();
        assert!(stack.set_active(4).is_err());
        assert_eq!(stack.active_index(), 3);
    }

    #[test]
    fn snapshot_load_roundtrip_preserves_layers() {
        let mut stack = LayerStack::new(&config());
        stack.set_active(1).unwrap();
        stack
            .active_mut()
            .paint_disc(Point::new(10.0, 10.0), 3.0, Rgb8::new(255, 0, 0), 1.0);

        let snap = stack.snapshot().unwrap();
        let mut other = LayerStack::new(&config());
        other.load(&snap);

        for i in 0..4 {
            assert_eq!(other.layer(i).unwrap().data(), stack.layer(i).unwrap().data());
        }
    }

    #[test]
    fn load_treats_corrupt_layer_as_empty() {
        let mut stack = LayerStack::new(&config());
        stack
            .active_mut()
            .paint_disc(Point::new(5.0, 5.0), 2.0, Rgb8::BLACK, 1.0);
        let good = stack.snapshot().unwrap();

        let mut layers: Vec<_> = good.layers().to_vec();
        layers[0] = EncodedBitmap::from_bytes(vec![9u8; 16]);
        layers[2] = good.layers()[0].clone();
        let snap = StackSnapshot::from_layers(layers);

        let mut other = LayerStack::new(&config());
        other.load(&snap);
        assert!(other.layer(0).unwrap().is_blank());
        assert!(!other.layer(2).unwrap().is_blank());
    }

    #[test]
    fn empty_snapshot_shares_encoded_bytes() {
        let snap = StackSnapshot::empty(&config()).unwrap();
        assert_eq!(snap.layer_count(), 4);
        assert_eq!(snap.layers()[0], snap.layers()[3]);
    }

    #[test]
    fn flatten_composites_in_stack_order() {
        let mut stack = LayerStack::new(&config());
        stack
            .active_mut()
            .paint_disc(Point::new(8.0, 8.0), 3.0, Rgb8::new(255, 0, 0), 1.0);
        stack.set_active(2).unwrap();
        stack
            .active_mut()
            .paint_disc(Point::new(8.0, 8.0), 3.0, Rgb8::new(0, 0, 255), 1.0);

        let flat = stack.flatten(Some([255, 255, 255, 255]));
        // Layer 2 sits above layer 0.
        assert_eq!(flat.pixel(8, 8), [0, 0, 255, 255]);
        assert_eq!(flat.pixel(0, 0), [255, 255, 255, 255]);
    }
}
