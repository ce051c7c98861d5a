//! Whole-image decoder.
//!
//! Decodes an entire source into one [`DecodedImage`]. Used for small images
//! and previews where region decoding would not pay off. The decoder keeps no
//! state between calls.

use async_trait::async_trait;
use tracing::debug;

use crate::error::DecoderError;
use crate::source::{open_source, AccessMode, SourceContext, SourceRef};

use super::pixel::{encode_rgba, PixelFormat};
use super::raster::decode_stream;
use super::types::DecodedImage;
use super::ImageDecoder;

/// [`ImageDecoder`] built on the `image` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterImageDecoder {
    pixel_format: PixelFormat,
}

impl RasterImageDecoder {
    /// Create a decoder using the process-wide default pixel format.
    pub fn new() -> Self {
        Self::with_pixel_format(None)
    }

    /// Create a decoder producing `pixel_format` (or the process default).
    pub fn with_pixel_format(pixel_format: Option<PixelFormat>) -> Self {
        Self {
            pixel_format: PixelFormat::resolve(pixel_format),
        }
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }
}

impl Default for RasterImageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageDecoder for RasterImageDecoder {
    async fn decode(&self, context: &dyn SourceContext, uri: &str) -> Result<DecodedImage, DecoderError> {
        let source = SourceRef::parse(uri);
        let stream = open_source(context, &source, AccessMode::Streaming).await?;
        let format = self.pixel_format;

        let decoded = tokio::task::spawn_blocking(move || {
            let image = decode_stream(stream)?.into_rgba8();
            let (width, height) = image.dimensions();
            let data = encode_rgba(image.as_raw(), format);
            Ok::<_, DecoderError>(DecodedImage::new(width, height, format, data))
        })
        .await
        .map_err(|e| DecoderError::Task {
            message: e.to_string(),
        })??;

        debug!(
            source = %source,
            width = decoded.width,
            height = decoded.height,
            pixel_format = %format,
            "Decoded whole image"
        );
        Ok(decoded)
    }
}

// =============================================================================
// Tests
// =============================================================================
