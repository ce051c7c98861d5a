//! The region decoder.
//!
//! A [`RegionDecoder`] owns exactly one native handle and hands out tiles from
//! it to any number of concurrent callers. Its lifecycle is
//!
//! ```text
//! Uninitialized ──init──▶ Ready ──recycle──▶ Recycled (terminal)
//! ```
//!
//! # Locking
//!
//! The state, and with it the native handle, lives behind a single fair
//! (FIFO) `tokio::sync::RwLock`. The handle can only be reached through a
//! guard of that lock, so a tile decode can never observe a handle that is
//! being dropped:
//!
//! - [`LockPolicy::Shared`]: decodes take the read lock and run in parallel.
//! - [`LockPolicy::Serialized`]: decodes take the write lock, one at a time,
//!   for backends whose handles must not be entered concurrently.
//! - `recycle` always takes the write lock, so it waits for every in-flight
//!   decode. Because the lock is FIFO, a queued `recycle` is not starved by
//!   new decodes, and decodes queued ahead of it still run.
//!
//! The guard is moved into the blocking task that performs the native decode.
//! Dropping the caller's future therefore never releases the lock while the
//! backend is still working on the handle.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::{debug, info, warn};

use crate::error::DecoderError;
use crate::source::{open_source, AccessMode, SourceContext, SourceRef};

use super::backend::{RegionBackend, RegionHandle};
use super::pixel::PixelFormat;
use super::raster::RasterBackend;
use super::types::{DecodedImage, Dimensions, Rect};
use super::ImageRegionDecoder;

// =============================================================================
// Configuration
// =============================================================================

/// How region decodes are synchronized against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Decodes share the lock and run in parallel.
    Shared,

    /// Decodes hold the lock exclusively and run one at a time.
    Serialized,
}

impl LockPolicy {
    /// Policy for a backend with the given thread-safety capability.
    pub const fn from_capability(internally_synchronized: bool) -> Self {
        if internally_synchronized {
            LockPolicy::Shared
        } else {
            LockPolicy::Serialized
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            LockPolicy::Shared => "shared",
            LockPolicy::Serialized => "serialized",
        }
    }
}

/// Construction-time options for a [`RegionDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionDecoderConfig {
    /// Output pixel format. `None` falls back to the process-wide preference.
    pub pixel_format: Option<PixelFormat>,

    /// Forced lock policy. `None` derives it from the backend's capability.
    pub lock_policy: Option<LockPolicy>,
}

impl RegionDecoderConfig {
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = Some(format);
        self
    }

    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = Some(policy);
        self
    }
}

// =============================================================================
// State
// =============================================================================

struct ReadyRegion<H> {
    handle: H,
    dimensions: Dimensions,
}

enum RegionState<H> {
    Uninitialized,
    Ready(ReadyRegion<H>),
    Recycled,
}

impl<H: RegionHandle> RegionState<H> {
    fn decode(&self, rect: Rect, sample_size: u32, format: PixelFormat) -> Result<DecodedImage, DecoderError> {
        match self {
            RegionState::Ready(ready) => ready
                .handle
                .decode_region(rect, sample_size, format)
                .ok_or_else(|| {
                    DecoderError::decode(format!(
                        "region decoder returned no pixels for {:?} at sample size {} - image format may not be supported",
                        rect, sample_size
                    ))
                }),
            RegionState::Uninitialized => Err(DecoderError::illegal_state(
                "Cannot decode region before decoder has been initialized",
            )),
            RegionState::Recycled => Err(DecoderError::illegal_state(
                "Cannot decode region after decoder has been recycled",
            )),
        }
    }
}

/// Either half of the state lock, owned so it can move into a blocking task.
enum StateGuard<H> {
    Shared(OwnedRwLockReadGuard<RegionState<H>>),
    Exclusive(OwnedRwLockWriteGuard<RegionState<H>>),
}

impl<H> Deref for StateGuard<H> {
    type Target = RegionState<H>;

    fn deref(&self) -> &Self::Target {
        match self {
            StateGuard::Shared(guard) => guard,
            StateGuard::Exclusive(guard) => guard,
        }
    }
}

// =============================================================================
// RegionDecoder
// =============================================================================

/// Shared, lifecycle-aware region decoder over a native backend.
///
/// # Example
///
/// ```ignore
/// use region_decode::decoder::{ImageRegionDecoder, Rect, RegionDecoder};
/// use region_decode::source::LocalContext;
///
/// let context = LocalContext::new("com.example").with_assets("assets");
/// let decoder = RegionDecoder::default();
///
/// let dims = decoder.init(&context, "file:///android_asset/paper.png").await?;
/// let tile = decoder.decode_region(Rect::new(0, 0, 512, 512), 4).await?;
/// decoder.recycle().await;
/// ```
pub struct RegionDecoder<B: RegionBackend = RasterBackend> {
    backend: Arc<B>,
    pixel_format: PixelFormat,
    policy: LockPolicy,
    state: Arc<RwLock<RegionState<B::Handle>>>,
}

impl<B: RegionBackend> RegionDecoder<B> {
    /// Create a decoder with default options.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, RegionDecoderConfig::default())
    }

    /// Create a decoder producing `pixel_format` (or the process default).
    pub fn with_pixel_format(backend: B, pixel_format: Option<PixelFormat>) -> Self {
        Self::with_config(
            backend,
            RegionDecoderConfig {
                pixel_format,
                lock_policy: None,
            },
        )
    }

    /// Create a decoder from explicit options.
    ///
    /// The lock policy is fixed here and never re-evaluated.
    pub fn with_config(backend: B, config: RegionDecoderConfig) -> Self {
        let policy = config
            .lock_policy
            .unwrap_or_else(|| LockPolicy::from_capability(backend.is_internally_synchronized()));
        let pixel_format = PixelFormat::resolve(config.pixel_format);

        debug!(
            backend = backend.name(),
            policy = policy.name(),
            pixel_format = %pixel_format,
            "Created region decoder"
        );

        Self {
            backend: Arc::new(backend),
            pixel_format,
            policy,
            state: Arc::new(RwLock::new(RegionState::Uninitialized)),
        }
    }

    /// Output pixel format of every decoded region.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    /// Locking policy chosen at construction.
    pub fn lock_policy(&self) -> LockPolicy {
        self.policy
    }

    /// The backend this decoder opens handles with.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Full image size while ready, `None` otherwise.
    pub async fn dimensions(&self) -> Option<Dimensions> {
        match &*self.state.read().await {
            RegionState::Ready(ready) => Some(ready.dimensions),
            _ => None,
        }
    }

    async fn decode_guard(&self) -> StateGuard<B::Handle> {
        match self.policy {
            LockPolicy::Shared => StateGuard::Shared(self.state.clone().read_owned().await),
            LockPolicy::Serialized => StateGuard::Exclusive(self.state.clone().write_owned().await),
        }
    }
}

impl Default for RegionDecoder<RasterBackend> {
    fn default() -> Self {
        Self::new(RasterBackend)
    }
}

fn task_error(err: tokio::task::JoinError) -> DecoderError {
    DecoderError::Task {
        message: err.to_string(),
    }
}

#[async_trait]
impl<B: RegionBackend> ImageRegionDecoder for RegionDecoder<B> {
    async fn init(&self, context: &dyn SourceContext, uri: &str) -> Result<Dimensions, DecoderError> {
        {
            let state = self.state.read().await;
            match &*state {
                RegionState::Uninitialized => {}
                RegionState::Ready(_) => {
                    return Err(DecoderError::illegal_state("Decoder is already initialized"))
                }
                RegionState::Recycled => {
                    return Err(DecoderError::illegal_state(
                        "Cannot initialize a decoder that has been recycled",
                    ))
                }
            }
        }

        let source = SourceRef::parse(uri);
        let stream = open_source(context, &source, AccessMode::Random).await?;

        let backend = self.backend.clone();
        let handle = tokio::task::spawn_blocking(move || backend.open(stream))
            .await
            .map_err(task_error)??;
        let dimensions = handle.dimensions();

        let mut state = self.state.write().await;
        if matches!(*state, RegionState::Ready(_)) {
            return Err(DecoderError::illegal_state(
                "Decoder was initialized concurrently",
            ));
        }
        if matches!(*state, RegionState::Recycled) {
            return Err(DecoderError::illegal_state(
                "Decoder was recycled while initializing",
            ));
        }

        *state = RegionState::Ready(ReadyRegion { handle, dimensions });
        info!(
            source = %source,
            width = dimensions.width,
            height = dimensions.height,
            policy = self.policy.name(),
            "Region decoder ready"
        );
        Ok(dimensions)
    }

    async fn is_ready(&self) -> bool {
        matches!(&*self.state.read().await, RegionState::Ready(_))
    }

    async fn decode_region(&self, rect: Rect, sample_size: u32) -> Result<DecodedImage, DecoderError> {
        let guard = self.decode_guard().await;

        // Reject without a blocking task when there is nothing to decode.
        if !matches!(&*guard, RegionState::Ready(_)) {
            return guard.decode(rect, sample_size, self.pixel_format);
        }

        let format = self.pixel_format;
        let result = tokio::task::spawn_blocking(move || guard.decode(rect, sample_size, format))
            .await
            .map_err(task_error)?;

        if let Err(ref e) = result {
            debug!(?rect, sample_size, error = %e, "Region decode failed");
        }
        result
    }

    async fn recycle(&self) {
        let mut state = self.state.write().await;
        match std::mem::replace(&mut *state, RegionState::Recycled) {
            RegionState::Ready(ready) => {
                // Drop the handle while the write lock is still held.
                drop(ready);
                info!(backend = self.backend.name(), "Region decoder recycled");
            }
            RegionState::Uninitialized => {
                debug!("Recycled a region decoder that was never initialized");
            }
            RegionState::Recycled => {
                warn!("recycle() called on an already recycled region decoder");
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
