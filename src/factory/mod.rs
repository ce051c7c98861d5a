//! Decoder factories.
//!
//! Consumers never construct decoders directly. They hold a
//! [`DecoderFactory`] and call [`make`](DecoderFactory::make) whenever they
//! need a fresh decoder, e.g. each time a view is bound to a new source.
//!
//! Two factories are provided:
//!
//! - [`BoundDecoderFactory`]: wraps a closure that already captured whatever
//!   the decoder needs (a backend, a pixel format, a scale).
//! - [`CompatDecoderFactory`]: builds a decoder from a [`DecoderConstructors`]
//!   table, choosing the default or the pixel-format constructor depending on
//!   whether a format was configured.
//!
//! A [`DecoderRegistry`] maps decoder-kind names to constructor tables so a
//! decoder can be selected by name at runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::decoder::{
    PixelFormat, RasterBackend, RasterImageDecoder, RegionDecoder, SharedImageDecoder,
    SharedRegionDecoder,
};
use crate::error::DecoderError;

// =============================================================================
// DecoderFactory
// =============================================================================

/// Produces a new decoder of type `T` on every call.
pub trait DecoderFactory<T>: Send + Sync {
    /// Build a new decoder.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Construction`] if the decoder cannot be built.
    fn make(&self) -> Result<T, DecoderError>;
}

// =============================================================================
// BoundDecoderFactory
// =============================================================================

/// A factory around a closure with pre-bound construction context.
///
/// ```
/// use region_decode::decoder::{PixelFormat, RasterBackend, RegionDecoder};
/// use region_decode::factory::{BoundDecoderFactory, DecoderFactory};
///
/// let format = PixelFormat::Argb8888;
/// let factory = BoundDecoderFactory::new(move || {
///     RegionDecoder::with_pixel_format(RasterBackend, Some(format))
/// });
///
/// let decoder = factory.make().unwrap();
/// assert_eq!(decoder.pixel_format(), PixelFormat::Argb8888);
/// ```
pub struct BoundDecoderFactory<F> {
    build: F,
}

impl<F> BoundDecoderFactory<F> {
    pub fn new(build: F) -> Self {
        Self { build }
    }
}

impl<T, F> DecoderFactory<T> for BoundDecoderFactory<F>
where
    F: Fn() -> T + Send + Sync,
{
    fn make(&self) -> Result<T, DecoderError> {
        Ok((self.build)())
    }
}

// =============================================================================
// Constructor tables
// =============================================================================

/// Constructor taking no arguments.
pub type DefaultConstructor<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Constructor taking the output pixel format.
pub type FormatConstructor<T> = Arc<dyn Fn(PixelFormat) -> T + Send + Sync>;

/// The construction paths a decoder kind supports.
pub struct DecoderConstructors<T> {
    kind: String,
    default: Option<DefaultConstructor<T>>,
    with_format: Option<FormatConstructor<T>>,
}

impl<T> DecoderConstructors<T> {
    /// An empty table for `kind`. Add at least one constructor.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            default: None,
            with_format: None,
        }
    }

    /// Register the no-argument constructor.
    pub fn with_default(mut self, build: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.default = Some(Arc::new(build));
        self
    }

    /// Register the pixel-format constructor.
    pub fn with_format(mut self, build: impl Fn(PixelFormat) -> T + Send + Sync + 'static) -> Self {
        self.with_format = Some(Arc::new(build));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn has_format(&self) -> bool {
        self.with_format.is_some()
    }
}

impl<T> Clone for DecoderConstructors<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            default: self.default.clone(),
            with_format: self.with_format.clone(),
        }
    }
}

impl<T> fmt::Debug for DecoderConstructors<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderConstructors")
            .field("kind", &self.kind)
            .field("default", &self.has_default())
            .field("with_format", &self.has_format())
            .finish()
    }
}

// =============================================================================
// CompatDecoderFactory
// =============================================================================

/// Builds decoders from a constructor table.
///
/// Without a pixel format the default constructor is used; with one, the
/// pixel-format constructor is. A missing constructor for the selected path
/// fails with [`DecoderError::Construction`].
#[derive(Debug, Clone)]
pub struct CompatDecoderFactory<T> {
    constructors: DecoderConstructors<T>,
    pixel_format: Option<PixelFormat>,
}

impl<T> CompatDecoderFactory<T> {
    /// Factory using the default constructor.
    pub fn new(constructors: DecoderConstructors<T>) -> Self {
        Self::with_pixel_format(constructors, None)
    }

    /// Factory passing `pixel_format` to the format constructor when set.
    pub fn with_pixel_format(constructors: DecoderConstructors<T>, pixel_format: Option<PixelFormat>) -> Self {
        Self {
            constructors,
            pixel_format,
        }
    }

    pub fn kind(&self) -> &str {
        self.constructors.kind()
    }

    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.pixel_format
    }
}

impl<T> DecoderFactory<T> for CompatDecoderFactory<T> {
    fn make(&self) -> Result<T, DecoderError> {
        let kind = self.constructors.kind();
        match self.pixel_format {
            None => {
                let build = self.constructors.default.as_ref().ok_or_else(|| {
                    DecoderError::Construction {
                        kind: kind.to_string(),
                        reason: "no default constructor".to_string(),
                    }
                })?;
                debug!(kind = kind, "Constructing decoder with default constructor");
                Ok(build())
            }
            Some(format) => {
                let build = self.constructors.with_format.as_ref().ok_or_else(|| {
                    DecoderError::Construction {
                        kind: kind.to_string(),
                        reason: format!("no constructor accepting a pixel format ({})", format),
                    }
                })?;
                debug!(kind = kind, pixel_format = %format, "Constructing decoder with pixel format");
                Ok(build(format))
            }
        }
    }
}

// =============================================================================
// DecoderRegistry
// =============================================================================

/// Decoder kinds by name.
#[derive(Debug, Clone)]
pub struct DecoderRegistry<T> {
    kinds: HashMap<String, DecoderConstructors<T>>,
}

impl<T> Default for DecoderRegistry<T> {
    fn default() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }
}

impl<T> DecoderRegistry<T> {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a decoder kind.
    pub fn register(&mut self, constructors: DecoderConstructors<T>) -> &mut Self {
        self.kinds.insert(constructors.kind().to_string(), constructors);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, constructors: DecoderConstructors<T>) -> Self {
        self.register(constructors);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Factory for `kind`, optionally configured with a pixel format.
    pub fn factory(
        &self,
        kind: &str,
        pixel_format: Option<PixelFormat>,
    ) -> Result<CompatDecoderFactory<T>, DecoderError> {
        let constructors = self.kinds.get(kind).ok_or_else(|| DecoderError::Construction {
            kind: kind.to_string(),
            reason: format!("unknown decoder kind (registered: {})", self.kinds().join(", ")),
        })?;
        Ok(CompatDecoderFactory::with_pixel_format(
            constructors.clone(),
            pixel_format,
        ))
    }
}

impl DecoderRegistry<SharedRegionDecoder> {
    /// Registry holding the built-in region decoder kinds.
    pub fn region_defaults() -> Self {
        Self::new().with(
            DecoderConstructors::new(RasterBackend::NAME)
                .with_default(|| Arc::new(RegionDecoder::new(RasterBackend)) as SharedRegionDecoder)
                .with_format(|format| {
                    Arc::new(RegionDecoder::with_pixel_format(RasterBackend, Some(format)))
                        as SharedRegionDecoder
                }),
        )
    }
}

impl DecoderRegistry<SharedImageDecoder> {
    /// Registry holding the built-in whole-image decoder kinds.
    pub fn image_defaults() -> Self {
        Self::new().with(
            DecoderConstructors::new(RasterBackend::NAME)
                .with_default(|| Arc::new(RasterImageDecoder::new()) as SharedImageDecoder)
                .with_format(|format| {
                    Arc::new(RasterImageDecoder::with_pixel_format(Some(format))) as SharedImageDecoder
                }),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
