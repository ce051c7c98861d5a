//! Value types shared by all decoders.

use bytes::Bytes;
use image::RgbaImage;
use serde::Serialize;

use super::pixel::PixelFormat;

// =============================================================================
// Dimensions
// =============================================================================

/// Full, un-downsampled size of a source image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The rectangle covering the whole image.
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Split the image into a row-major grid of `tile_size` squares.
    ///
    /// Tiles on the right and bottom edges are clipped to the image.
    pub fn tiles(&self, tile_size: u32) -> Vec<Rect> {
        let tile_size = tile_size.max(1);
        let mut tiles = Vec::new();
        for top in (0..self.height).step_by(tile_size as usize) {
            for left in (0..self.width).step_by(tile_size as usize) {
                tiles.push(Rect::new(
                    left,
                    top,
                    left.saturating_add(tile_size).min(self.width),
                    top.saturating_add(tile_size).min(self.height),
                ));
            }
        }
        tiles
    }
}

// =============================================================================
// Rect
// =============================================================================

/// A rectangle in source pixel coordinates.
///
/// `right` and `bottom` are exclusive. A rect with `right <= left` or
/// `bottom <= top` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build a rect from an origin and a size.
    pub const fn from_xywh(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::new(x, y, x.saturating_add(width), y.saturating_add(height))
    }

    pub const fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub const fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Overlap of two rects, or `None` if they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let clipped = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }

    /// Output size of this rect decoded at `sample_size`.
    ///
    /// Each side is divided by the sample size and rounded down, but never
    /// drops below one pixel. A sample size of 0 behaves like 1.
    pub fn sampled_size(&self, sample_size: u32) -> (u32, u32) {
        let s = sample_size.max(1);
        ((self.width() / s).max(1), (self.height() / s).max(1))
    }
}

impl std::str::FromStr for Rect {
    type Err = String;

    /// Parse `left,top,right,bottom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(format!(
                "invalid rect '{}': expected left,top,right,bottom",
                s
            ));
        }

        let mut values = [0u32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse()
                .map_err(|_| format!("invalid rect '{}': '{}' is not a coordinate", s, part))?;
        }

        let [left, top, right, bottom] = values;
        Ok(Rect::new(left, top, right, bottom))
    }
}

// =============================================================================
// DecodedImage
// =============================================================================

/// A fully materialized pixel buffer.
///
/// Rows are tightly packed: the stride is `width * format.bytes_per_pixel()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * format.bytes_per_pixel(),
            "DecodedImage buffer size mismatch"
        );
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Pixel at (`x`, `y`) expanded to RGBA8.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = y as usize * self.stride() + x as usize * bpp;
        Some(self.format.to_rgba(&self.data[offset..offset + bpp]))
    }

    /// Expand to an RGBA8 image, e.g. for saving to disk.
    pub fn to_rgba8(&self) -> RgbaImage {
        let bpp = self.format.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(bpp) {
            out.extend_from_slice(&self.format.to_rgba(px));
        }
        // Length matches width * height * 4 by construction.
        RgbaImage::from_raw(self.width, self.height, out)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

// =============================================================================
// Tests
// =============================================================================
