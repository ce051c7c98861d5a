//! # Region Decode
//!
//! Tiled region decoding for very large images.
//!
//! A tiling image view never decodes a large image in one go. It opens the
//! source once with a region decoder and then asks for many small tiles, each
//! a sub-rectangle of the full image downsampled by a power-of-two sample
//! size, from many worker tasks at the same time.
//!
//! ## Features
//!
//! - **Source location**: resolves resource, asset, file and content URIs to
//!   readable streams through a host [`SourceContext`]
//! - **Shared region decoding**: one native handle serves concurrent tile
//!   requests behind a fair reader/writer lock
//! - **Safe teardown**: recycling waits for in-flight decodes and every later
//!   request fails cleanly with [`DecoderError::IllegalState`]
//! - **Decoder factories**: decoders are built by name from a registry, with
//!   or without an explicit output pixel format
//!
//! ## Architecture
//!
//! - [`source`] - URI classification and the host context abstraction
//! - [`decoder`] - whole-image and region decoders, pixel formats, backends
//! - [`factory`] - decoder factories and the decoder registry
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use region_decode::decoder::{ImageRegionDecoder, Rect};
//! use region_decode::factory::{DecoderFactory, DecoderRegistry};
//! use region_decode::source::LocalContext;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = LocalContext::new("com.example.viewer").with_assets("assets");
//!     let decoder = DecoderRegistry::region_defaults()
//!         .factory("raster", None)?
//!         .make()?;
//!
//!     let size = decoder.init(&context, "file:///android_asset/map.png").await?;
//!     let tile = decoder.decode_region(Rect::new(0, 0, 512, 512), 4).await?;
//!     println!("{}x{} source, {}x{} tile", size.width, size.height, tile.width, tile.height);
//!
//!     decoder.recycle().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod factory;
pub mod source;

// Re-export commonly used types
pub use config::{Cli, Command, DecodeConfig, InfoConfig, RegionConfig, SourceArgs, SweepConfig};
pub use decoder::{
    encode_rgba, preferred_pixel_format, set_preferred_pixel_format, DecodedImage, Dimensions,
    ImageDecoder, ImageRegionDecoder, LockPolicy, PixelFormat, RasterBackend, RasterImageDecoder,
    Rect, RegionBackend, RegionDecoder, RegionDecoderConfig, RegionHandle, SharedImageDecoder,
    SharedRegionDecoder,
};
pub use error::{DecoderError, SourceError};
pub use factory::{
    BoundDecoderFactory, CompatDecoderFactory, DecoderConstructors, DecoderFactory,
    DecoderRegistry,
};
pub use source::{
    open_source, AccessMode, LocalContext, ResourceTable, ResourceTarget, SourceContext,
    SourceRef, SourceStream,
};
