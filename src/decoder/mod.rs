//! Decoders.
//!
//! Two decoder roles are defined here:
//!
//! - [`ImageDecoder`]: decodes a whole source into one image, no state kept.
//! - [`ImageRegionDecoder`]: owns one native handle and decodes arbitrary
//!   sub-rectangles of it, at a chosen sample size, from many tasks at once.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Consumer (tiling view, CLI)        │
//! └────────────────────┬────────────────────┘
//!                      │ init / decode_region / recycle
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            RegionDecoder<B>             │
//! │  RwLock<Uninitialized|Ready|Recycled>   │
//! │  LockPolicy: Shared | Serialized        │
//! └────────────────────┬────────────────────┘
//!                      │ RegionBackend::open
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   RegionHandle (native resource)        │
//! │   RasterBackend → RasterRegion          │
//! └─────────────────────────────────────────┘
//! ```

mod backend;
mod pixel;
mod raster;
mod region;
mod types;
mod whole;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DecoderError;
use crate::source::SourceContext;

pub use backend::{RegionBackend, RegionHandle};
pub use pixel::{encode_rgba, preferred_pixel_format, set_preferred_pixel_format, PixelFormat};
pub use raster::{decode_stream, sample_region, RasterBackend, RasterRegion};
pub use region::{LockPolicy, RegionDecoder, RegionDecoderConfig};
pub use types::{DecodedImage, Dimensions, Rect};
pub use whole::RasterImageDecoder;

/// Decodes a complete image in one call.
#[async_trait]
pub trait ImageDecoder: Send + Sync {
    /// Resolve `uri` through `context` and decode the entire image.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::Source`] if the URI cannot be resolved or read
    /// - [`DecoderError::Decode`] if the data is empty or not a supported image
    async fn decode(&self, context: &dyn SourceContext, uri: &str) -> Result<DecodedImage, DecoderError>;
}

/// Decodes regions of one source, shared by concurrent callers.
///
/// Call [`init`](Self::init) once, then [`decode_region`](Self::decode_region)
/// from as many tasks as needed, then [`recycle`](Self::recycle) once when the
/// consumer lets go of the source. Decoders never recycle themselves.
#[async_trait]
pub trait ImageRegionDecoder: Send + Sync {
    /// Open the native handle for `uri` and return the full image size.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::Source`] if the URI cannot be resolved or read
    /// - [`DecoderError::Decode`] if the data is not a supported image
    /// - [`DecoderError::IllegalState`] if the decoder is not uninitialized
    async fn init(&self, context: &dyn SourceContext, uri: &str) -> Result<Dimensions, DecoderError>;

    /// True between a successful `init` and `recycle`.
    async fn is_ready(&self) -> bool;

    /// Decode `rect` (source pixels) downsampled by `sample_size`.
    ///
    /// # Errors
    ///
    /// - [`DecoderError::IllegalState`] before `init` or after `recycle`,
    ///   including when `recycle` wins a race with this call
    /// - [`DecoderError::Decode`] if the backend produced no pixels
    async fn decode_region(&self, rect: Rect, sample_size: u32) -> Result<DecodedImage, DecoderError>;

    /// Wait for in-flight decodes, then release the native handle.
    async fn recycle(&self);
}

/// A whole-image decoder behind shared ownership.
pub type SharedImageDecoder = Arc<dyn ImageDecoder>;

/// A region decoder behind shared ownership, ready to hand to worker tasks.
pub type SharedRegionDecoder = Arc<dyn ImageRegionDecoder>;
