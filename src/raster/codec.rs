use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context as _;
use image::ImageEncoder as _;

use crate::foundation::core::CanvasSize;
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::surface::RasterSurface;

/// Opaque encoded bitmap held behind an `Arc` so snapshots duplicate cheaply.
///
/// Layer bitmaps are PNG bytes carrying the premultiplied channels verbatim;
/// restoring a snapshot is therefore bit-exact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBitmap(Arc<Vec<u8>>);

impl EncodedBitmap {
    /// Wrap externally produced encoded bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn byte_len(&self) -> usize {
        self.0.len()
    }
}

/// Serialize a surface into an in-memory PNG.
pub fn encode_surface(surface: &RasterSurface) -> FlipbookResult<EncodedBitmap> {
    let mut bytes = Vec::new();
    image::write_buffer_with_format(
        &mut Cursor::new(&mut bytes),
        surface.data(),
        surface.width(),
        surface.height(),
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .context("encode layer bitmap")?;
    Ok(EncodedBitmap(Arc::new(bytes)))
}

/// Decode an encoded layer back into a paintable surface.
///
/// The decoded dimensions must match the project canvas; anything else is a
/// decode failure for the caller to absorb.
pub fn decode_surface(bitmap: &EncodedBitmap, canvas: CanvasSize) -> FlipbookResult<RasterSurface> {
    let img = image::load_from_memory(bitmap.as_bytes())
        .map_err(|e| FlipbookError::decode(format!("layer bitmap: {e}")))?;
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    if w != canvas.width || h != canvas.height {
        return Err(FlipbookError::decode(format!(
            "layer bitmap is {w}x{h}, expected {}x{}",
            canvas.width, canvas.height
        )));
    }
    RasterSurface::from_raw(canvas, rgba.into_raw())
        .ok_or_else(|| FlipbookError::decode("layer bitmap byte length mismatch"))
}

/// Decode and composite encoded layers bottom-to-top onto one surface.
///
/// An undecodable layer is treated as empty rather than failing the whole
/// composition, so a corrupt layer never blanks a frame.
pub fn compose_layers(
    layers: &[EncodedBitmap],
    canvas: CanvasSize,
    background: Option<[u8; 4]>,
) -> RasterSurface {
    let mut out = RasterSurface::new(canvas);
    if let Some(bg) = background {
        out.fill(bg);
    }
    for (i, bitmap) in layers.iter().enumerate() {
        match decode_surface(bitmap, canvas) {
            Ok(layer) => out.composite_over(&layer, 1.0),
            Err(e) => tracing::warn!(layer = i, error = %e, "skipping undecodable layer"),
        }
    }
    out
}

pub(crate) const PREVIEW_JPEG_QUALITY: u8 = 50;

/// JPEG-encode an already-flattened, fully opaque preview surface.
pub fn encode_jpeg_preview(surface: &RasterSurface) -> FlipbookResult<Vec<u8>> {
    let mut rgb = Vec::with_capacity(surface.data().len() / 4 * 3);
    for px in surface.data().chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    let mut bytes = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, PREVIEW_JPEG_QUALITY);
    encoder
        .write_image(
            &rgb,
            surface.width(),
            surface.height(),
            image::ExtendedColorType::Rgb8,
        )
        .context("encode preview jpeg")?;
    Ok(bytes)
}
