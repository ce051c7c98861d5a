//! Region backend built on the `image` crate.
//!
//! Opening a handle decodes the entire source into one RGBA buffer that lives
//! until the handle is dropped, so memory use is proportional to the full
//! image size (4 bytes per pixel) rather than to the tiles requested. The
//! `image` crate's default decoding limits bound how large that buffer may
//! get. Region requests then crop the cached buffer and box-filter it down by
//! the sample size.
//!
//! Sources too large to hold in memory need a backend that reads tiles from
//! the file directly.

use std::io::Cursor;

use image::{DynamicImage, ImageReader, RgbaImage};
use tracing::debug;

use crate::error::{DecoderError, SourceError};
use crate::source::SourceStream;

use super::backend::{RegionBackend, RegionHandle};
use super::pixel::PixelFormat;
use super::types::{DecodedImage, Dimensions, Rect};

// =============================================================================
// Decoding helpers
// =============================================================================

/// Decode a whole source stream, guessing the format from its content.
pub fn decode_stream(stream: SourceStream) -> Result<DynamicImage, DecoderError> {
    let reader = match stream {
        SourceStream::Bytes(bytes) => ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| SourceError::io("<memory>", e))?
            .decode(),
        SourceStream::Path(path) => ImageReader::open(&path)
            .map_err(|e| SourceError::io(path.display().to_string(), e))?
            .with_guessed_format()
            .map_err(|e| SourceError::io(path.display().to_string(), e))?
            .decode(),
    };

    let image = reader.map_err(|e| {
        DecoderError::decode(format!("image format may not be supported: {}", e))
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(DecoderError::decode("decoder returned an empty image"));
    }
    Ok(image)
}

/// Crop `rect` out of `image` and downsample it by `sample_size`.
///
/// Each output pixel is the mean of the `sample_size × sample_size` block it
/// covers (blocks on the right and bottom edges may be partial).
pub fn sample_region(
    image: &RgbaImage,
    rect: Rect,
    sample_size: u32,
    format: PixelFormat,
) -> Option<DecodedImage> {
    let bounds = Rect::new(0, 0, image.width(), image.height());
    let clipped = rect.intersect(&bounds)?;
    let sample = sample_size.max(1);
    let (out_w, out_h) = clipped.sampled_size(sample);

    let mut data = Vec::with_capacity(out_w as usize * out_h as usize * format.bytes_per_pixel());
    for oy in 0..out_h {
        let y0 = clipped.top + oy * sample;
        let y1 = y0.saturating_add(sample).min(clipped.bottom);
        for ox in 0..out_w {
            let x0 = clipped.left + ox * sample;
            let x1 = x0.saturating_add(sample).min(clipped.right);

            let px = if sample == 1 {
                image.get_pixel(x0, y0).0
            } else {
                block_mean(image, x0, y0, x1, y1)
            };
            format.push_rgba(px, &mut data);
        }
    }

    Some(DecodedImage::new(out_w, out_h, format, data))
}

// Sums are u64: a single block may cover the whole image.
fn block_mean(image: &RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) -> [u8; 4] {
    let mut sum = [0u64; 4];
    for y in y0..y1 {
        for x in x0..x1 {
            let p = image.get_pixel(x, y).0;
            for c in 0..4 {
                sum[c] += u64::from(p[c]);
            }
        }
    }
    let count = (u64::from(x1 - x0) * u64::from(y1 - y0)).max(1);
    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = ((sum[c] + count / 2) / count) as u8;
    }
    out
}

// =============================================================================
// Raster backend
// =============================================================================

/// Handle holding a fully decoded RGBA buffer.
#[derive(Debug)]
pub struct RasterRegion {
    image: RgbaImage,
}

impl RasterRegion {
    /// Wrap an already decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: image.into_rgba8(),
        }
    }
}

impl RegionHandle for RasterRegion {
    fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    fn decode_region(&self, rect: Rect, sample_size: u32, format: PixelFormat) -> Option<DecodedImage> {
        sample_region(&self.image, rect, sample_size, format)
    }
}

/// The default backend: decode with the `image` crate, sample in memory.
///
/// Handles are plain immutable buffers, so they are safe to share across
/// threads and the backend reports itself as internally synchronized.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterBackend;

impl RasterBackend {
    pub const NAME: &'static str = "raster";
}

impl RegionBackend for RasterBackend {
    type Handle = RasterRegion;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_internally_synchronized(&self) -> bool {
        true
    }

    fn open(&self, stream: SourceStream) -> Result<RasterRegion, DecoderError> {
        let described = stream.describe();
        let image = decode_stream(stream)?;
        debug!(
            source = %described,
            width = image.width(),
            height = image.height(),
            "Opened raster region handle"
        );
        Ok(RasterRegion::from_image(image))
    }
}

// =============================================================================
// Tests
// =============================================================================
