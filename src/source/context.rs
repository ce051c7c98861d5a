//! Host platform seam and source opening.
//!
//! The decoders never touch the filesystem, packaged resources or content
//! providers directly. They go through a [`SourceContext`], which plays the
//! role of the host platform, and receive a [`SourceStream`] back.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::SourceError;

use super::uri::{ResourceTarget, SourceRef, DRAWABLE, NO_RESOURCE_ID};

// =============================================================================
// Streams
// =============================================================================

/// How a caller intends to read an opened asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read front to back once.
    #[default]
    Streaming,

    /// Seekable access; hosts may hand out a path the decoder opens itself.
    Random,
}

/// An opened source, ready to be handed to a native decoder.
///
/// Streams are single use. Whatever OS resources back them are released when
/// the value is dropped, which always happens before the opening decoder
/// call returns.
#[derive(Debug, Clone)]
pub enum SourceStream {
    /// The complete encoded bytes.
    Bytes(Bytes),

    /// A path the native decoder opens and reads itself.
    Path(PathBuf),
}

impl SourceStream {
    /// Read the whole stream into memory.
    pub async fn into_bytes(self) -> Result<Bytes, SourceError> {
        match self {
            SourceStream::Bytes(bytes) => Ok(bytes),
            SourceStream::Path(path) => tokio::fs::read(&path)
                .await
                .map(Bytes::from)
                .map_err(|e| SourceError::io(path.display().to_string(), e)),
        }
    }

    /// Human readable description for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            SourceStream::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            SourceStream::Path(path) => path.display().to_string(),
        }
    }
}

// =============================================================================
// Host traits
// =============================================================================

/// A package's resource table.
#[async_trait]
pub trait ResourceTable: Send + Sync {
    /// Look up the id of resource `name` of type `kind`.
    ///
    /// Returns [`NO_RESOURCE_ID`] when no such resource exists.
    fn identifier(&self, name: &str, kind: &str) -> u32;

    /// Open the raw bytes of resource `id`.
    async fn open_raw(&self, id: u32) -> Result<SourceStream, SourceError>;
}

/// The host platform the decoders resolve sources against.
#[async_trait]
pub trait SourceContext: Send + Sync {
    /// The package this context belongs to.
    fn package_name(&self) -> &str;

    /// Resource table of this context's own package.
    fn resources(&self) -> Arc<dyn ResourceTable>;

    /// Resource table of another installed package.
    fn resources_for_package(&self, package: &str) -> Result<Arc<dyn ResourceTable>, SourceError>;

    /// Open a bundled asset by its path relative to the asset root.
    async fn open_asset(&self, path: &str, mode: AccessMode) -> Result<SourceStream, SourceError>;

    /// Open a generic content URI.
    async fn open_content(&self, uri: &str) -> Result<SourceStream, SourceError>;

    /// Open an absolute filesystem path. Decoders read the file themselves.
    fn open_file(&self, path: &str) -> Result<SourceStream, SourceError> {
        Ok(SourceStream::Path(PathBuf::from(path)))
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Pick the resource table for `package`, preferring the context's own.
pub fn resources_for(
    context: &dyn SourceContext,
    package: &str,
) -> Result<Arc<dyn ResourceTable>, SourceError> {
    if context.package_name() == package {
        Ok(context.resources())
    } else {
        context.resources_for_package(package)
    }
}

/// Resolve a resource target to a numeric id within `table`.
pub fn resolve_resource_id(table: &dyn ResourceTable, target: &ResourceTarget) -> u32 {
    match target {
        ResourceTarget::Named(name) => table.identifier(name, DRAWABLE),
        ResourceTarget::Id(id) => *id,
    }
}

/// Open a classified source through the host.
///
/// Resource lookups that end at id 0 fail with
/// [`SourceError::ResourceNotFound`].
pub async fn open_source(
    context: &dyn SourceContext,
    source: &SourceRef,
    mode: AccessMode,
) -> Result<SourceStream, SourceError> {
    debug!(kind = source.kind(), source = %source, "Opening source");

    match source {
        SourceRef::Resource { package, target } => {
            let table = resources_for(context, package)?;
            let id = resolve_resource_id(table.as_ref(), target);
            if id == NO_RESOURCE_ID {
                return Err(SourceError::ResourceNotFound {
                    package: package.clone(),
                    id,
                });
            }
            table.open_raw(id).await
        }
        SourceRef::Asset(path) => context.open_asset(path, mode).await,
        SourceRef::File(path) => context.open_file(path),
        SourceRef::Generic(uri) => context.open_content(uri).await,
    }
}

// =============================================================================
// Tests
// =============================================================================
