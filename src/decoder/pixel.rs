//! Output pixel formats.
//!
//! Decoders always produce pixels in one [`PixelFormat`], fixed when the
//! decoder is constructed. Resolution order for that format is:
//!
//! 1. the value passed to the decoder constructor,
//! 2. the process-wide preference set with [`set_preferred_pixel_format`],
//! 3. [`PixelFormat::Rgb565`].

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static PREFERRED_PIXEL_FORMAT: OnceLock<PixelFormat> = OnceLock::new();

/// Pixel layout of a [`DecodedImage`](super::DecodedImage) buffer.
///
/// Multi-byte pixels are stored little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 16-bit packed RGB, 5/6/5 bits, no alpha.
    #[default]
    Rgb565,

    /// 32-bit RGBA, one byte per channel in R, G, B, A order.
    Argb8888,

    /// 16-bit packed ARGB, 4 bits per channel (R high nibble .. A low nibble).
    Argb4444,

    /// 8-bit alpha only.
    Alpha8,
}

impl PixelFormat {
    /// All supported formats.
    pub const ALL: [PixelFormat; 4] = [
        PixelFormat::Rgb565,
        PixelFormat::Argb8888,
        PixelFormat::Argb4444,
        PixelFormat::Alpha8,
    ];

    /// Canonical name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgb565 => "RGB_565",
            PixelFormat::Argb8888 => "ARGB_8888",
            PixelFormat::Argb4444 => "ARGB_4444",
            PixelFormat::Alpha8 => "ALPHA_8",
        }
    }

    /// Bytes used by one pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb565 | PixelFormat::Argb4444 => 2,
            PixelFormat::Argb8888 => 4,
            PixelFormat::Alpha8 => 1,
        }
    }

    /// Pick the effective format for a decoder.
    pub fn resolve(explicit: Option<PixelFormat>) -> PixelFormat {
        explicit
            .or_else(preferred_pixel_format)
            .unwrap_or_default()
    }

    /// Append one RGBA8 pixel to `out` in this format.
    #[inline]
    pub fn push_rgba(self, [r, g, b, a]: [u8; 4], out: &mut Vec<u8>) {
        match self {
            PixelFormat::Rgb565 => {
                let packed =
                    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3);
                out.extend_from_slice(&packed.to_le_bytes());
            }
            PixelFormat::Argb8888 => out.extend_from_slice(&[r, g, b, a]),
            PixelFormat::Argb4444 => {
                let packed = ((r as u16 >> 4) << 12)
                    | ((g as u16 >> 4) << 8)
                    | ((b as u16 >> 4) << 4)
                    | (a as u16 >> 4);
                out.extend_from_slice(&packed.to_le_bytes());
            }
            PixelFormat::Alpha8 => out.push(a),
        }
    }

    /// Expand one pixel of this format back to RGBA8.
    ///
    /// `bytes` must hold at least [`bytes_per_pixel`](Self::bytes_per_pixel) bytes.
    #[inline]
    pub fn to_rgba(self, bytes: &[u8]) -> [u8; 4] {
        match self {
            PixelFormat::Rgb565 => {
                let v = u16::from_le_bytes([bytes[0], bytes[1]]);
                let r = ((v >> 11) & 0x1f) as u8;
                let g = ((v >> 5) & 0x3f) as u8;
                let b = (v & 0x1f) as u8;
                [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 255]
            }
            PixelFormat::Argb8888 => [bytes[0], bytes[1], bytes[2], bytes[3]],
            PixelFormat::Argb4444 => {
                let v = u16::from_le_bytes([bytes[0], bytes[1]]);
                let nibble = |shift: u16| ((v >> shift) & 0xf) as u8 * 17;
                [nibble(12), nibble(8), nibble(4), nibble(0)]
            }
            PixelFormat::Alpha8 => [0, 0, 0, bytes[0]],
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "565" | "RGB_565" | "RGB565" => Ok(PixelFormat::Rgb565),
            "8888" | "ARGB_8888" | "ARGB8888" => Ok(PixelFormat::Argb8888),
            "4444" | "ARGB_4444" | "ARGB4444" => Ok(PixelFormat::Argb4444),
            "A8" | "ALPHA_8" | "ALPHA8" => Ok(PixelFormat::Alpha8),
            other => Err(format!(
                "unknown pixel format '{}' (expected one of 565, 8888, ARGB_4444, ALPHA_8)",
                other
            )),
        }
    }
}

/// Set the process-wide default pixel format.
///
/// Can be set once; later calls return the rejected value.
pub fn set_preferred_pixel_format(format: PixelFormat) -> Result<(), PixelFormat> {
    PREFERRED_PIXEL_FORMAT.set(format)
}

/// The process-wide default pixel format, if one was set.
pub fn preferred_pixel_format() -> Option<PixelFormat> {
    PREFERRED_PIXEL_FORMAT.get().copied()
}

/// Convert a tightly packed RGBA8 buffer to `format`.
pub fn encode_rgba(rgba: &[u8], format: PixelFormat) -> Vec<u8> {
    if format == PixelFormat::Argb8888 {
        return rgba.to_vec();
    }

    let mut out = Vec::with_capacity(rgba.len() / 4 * format.bytes_per_pixel());
    for px in rgba.chunks_exact(4) {
        format.push_rgba([px[0], px[1], px[2], px[3]], &mut out);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
