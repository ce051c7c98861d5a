//! Native decode backends.
//!
//! A [`RegionBackend`] opens a [`SourceStream`] into a [`RegionHandle`], the
//! native resource a [`RegionDecoder`](super::RegionDecoder) owns while it is
//! ready. Backends declare up front whether their handles may be entered by
//! several threads at once; the region decoder picks its locking policy from
//! that flag when it is constructed.

use crate::error::DecoderError;
use crate::source::SourceStream;

use super::pixel::PixelFormat;
use super::types::{DecodedImage, Dimensions, Rect};

/// An opened native decoding resource.
///
/// Handles are only ever reached through the owning decoder's lock, so a
/// handle can never be used after the decoder dropped it.
pub trait RegionHandle: Send + Sync + 'static {
    /// Full size of the source image.
    fn dimensions(&self) -> Dimensions;

    /// Decode `rect` at `sample_size` in `format`.
    ///
    /// Returns `None` when the backend cannot produce pixels for the region
    /// (empty intersection with the image, unsupported data).
    fn decode_region(&self, rect: Rect, sample_size: u32, format: PixelFormat) -> Option<DecodedImage>;
}

/// Factory for native handles.
pub trait RegionBackend: Send + Sync + 'static {
    /// The handle type this backend opens.
    type Handle: RegionHandle;

    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Whether one handle may decode regions on several threads at once.
    ///
    /// When `false`, region decodes are serialized by the owning decoder.
    fn is_internally_synchronized(&self) -> bool;

    /// Open a handle on `stream`. This may block; callers run it off the
    /// async executor.
    fn open(&self, stream: SourceStream) -> Result<Self::Handle, DecoderError>;
}
