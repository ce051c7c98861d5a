//! Filesystem-backed host.
//!
//! [`LocalContext`] implements [`SourceContext`] on top of plain directories,
//! which is what the CLI and the integration tests use:
//!
//! ```text
//! <res_dir>/drawable/<name>.<ext>   packaged resources
//! <assets_dir>/<relative path>      bundled assets
//! <content root>/<path>             content://<authority>/<path>
//! ```

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::SourceError;

use super::context::{AccessMode, ResourceTable, SourceContext, SourceStream};
use super::uri::{DRAWABLE, NO_RESOURCE_ID};

/// Id assigned to the first drawable of a scanned resource directory.
pub const FIRST_DRAWABLE_ID: u32 = 0x7f02_0000;

/// Scheme handled by [`LocalContext::open_content`].
pub const CONTENT_SCHEME: &str = "content";

// =============================================================================
// DirectoryResources
// =============================================================================

/// A resource table built from a `drawable/` directory.
///
/// Ids are assigned from [`FIRST_DRAWABLE_ID`] upwards in sorted name order,
/// so the same directory always yields the same ids.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResources {
    package: String,
    ids: HashMap<String, u32>,
    paths: HashMap<u32, PathBuf>,
}

impl DirectoryResources {
    /// A table with no resources.
    pub fn empty(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    /// Scan `<res_dir>/drawable` for resources.
    ///
    /// A missing `drawable` directory yields an empty table.
    pub fn scan(package: impl Into<String>, res_dir: &Path) -> Result<Self, SourceError> {
        let mut table = Self::empty(package);
        let drawable_dir = res_dir.join(DRAWABLE);
        if !drawable_dir.is_dir() {
            return Ok(table);
        }

        let entries = std::fs::read_dir(&drawable_dir)
            .map_err(|e| SourceError::io(drawable_dir.display().to_string(), e))?;

        let mut files: Vec<(String, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();
        files.sort();

        let mut next_id = FIRST_DRAWABLE_ID;
        for (name, path) in files {
            // First file wins when two share a stem (page.png, page.jpg).
            if table.ids.contains_key(&name) {
                continue;
            }
            table.ids.insert(name, next_id);
            table.paths.insert(next_id, path);
            next_id += 1;
        }

        debug!(
            package = %table.package,
            count = table.ids.len(),
            "Scanned drawable resources"
        );
        Ok(table)
    }

    /// Number of resources in the table.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when the table holds no resources.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Package owning this table.
    pub fn package(&self) -> &str {
        &self.package
    }
}

#[async_trait]
impl ResourceTable for DirectoryResources {
    fn identifier(&self, name: &str, kind: &str) -> u32 {
        if kind != DRAWABLE {
            return NO_RESOURCE_ID;
        }
        self.ids.get(name).copied().unwrap_or(NO_RESOURCE_ID)
    }

    async fn open_raw(&self, id: u32) -> Result<SourceStream, SourceError> {
        let path = self
            .paths
            .get(&id)
            .ok_or_else(|| SourceError::ResourceNotFound {
                package: self.package.clone(),
                id,
            })?;

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| SourceError::io(path.display().to_string(), e))?;
        Ok(SourceStream::Bytes(Bytes::from(data)))
    }
}

// =============================================================================
// LocalContext
// =============================================================================

/// A [`SourceContext`] backed by local directories.
#[derive(Debug, Clone)]
pub struct LocalContext {
    package: String,
    resources: Arc<DirectoryResources>,
    packages: HashMap<String, Arc<DirectoryResources>>,
    assets_dir: Option<PathBuf>,
    content_roots: HashMap<String, PathBuf>,
}

impl LocalContext {
    /// Create a context for `package` with no resources, assets or content.
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        Self {
            resources: Arc::new(DirectoryResources::empty(package.clone())),
            package,
            packages: HashMap::new(),
            assets_dir: None,
            content_roots: HashMap::new(),
        }
    }

    /// Load this package's resources from `res_dir`.
    pub fn with_resources(mut self, res_dir: &Path) -> Result<Self, SourceError> {
        self.resources = Arc::new(DirectoryResources::scan(self.package.clone(), res_dir)?);
        Ok(self)
    }

    /// Register another package's resources.
    pub fn with_package(
        mut self,
        package: impl Into<String>,
        res_dir: &Path,
    ) -> Result<Self, SourceError> {
        let package = package.into();
        let table = DirectoryResources::scan(package.clone(), res_dir)?;
        self.packages.insert(package, Arc::new(table));
        Ok(self)
    }

    /// Serve bundled assets from `assets_dir`.
    pub fn with_assets(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(assets_dir.into());
        self
    }

    /// Map `content://<authority>/...` to files under `root`.
    pub fn with_content_root(mut self, authority: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.content_roots.insert(authority.into(), root.into());
        self
    }

    /// Resolve a content URI to a file path.
    fn content_path(&self, uri: &str) -> Result<PathBuf, SourceError> {
        let url = Url::parse(uri).map_err(|e| SourceError::Unsupported(format!("{}: {}", uri, e)))?;
        if url.scheme() != CONTENT_SCHEME {
            return Err(SourceError::Unsupported(uri.to_string()));
        }

        let authority = url.host_str().unwrap_or_default();
        let root = self
            .content_roots
            .get(authority)
            .ok_or_else(|| SourceError::Unsupported(format!("no content provider for {}", uri)))?;

        let relative: PathBuf = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .map(|s| {
                urlencoding::decode(s)
                    .map(|d| d.into_owned())
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect();

        confined_join(root, &relative).ok_or_else(|| SourceError::Unsupported(uri.to_string()))
    }
}

#[async_trait]
impl SourceContext for LocalContext {
    fn package_name(&self) -> &str {
        &self.package
    }

    fn resources(&self) -> Arc<dyn ResourceTable> {
        self.resources.clone()
    }

    fn resources_for_package(&self, package: &str) -> Result<Arc<dyn ResourceTable>, SourceError> {
        self.packages
            .get(package)
            .map(|table| table.clone() as Arc<dyn ResourceTable>)
            .ok_or_else(|| SourceError::PackageNotFound(package.to_string()))
    }

    async fn open_asset(&self, path: &str, mode: AccessMode) -> Result<SourceStream, SourceError> {
        let assets_dir = self
            .assets_dir
            .as_ref()
            .ok_or_else(|| SourceError::Unsupported("no asset directory configured".to_string()))?;

        let full = confined_join(assets_dir, Path::new(path))
            .ok_or_else(|| SourceError::Unsupported(format!("asset path escapes root: {}", path)))?;

        match mode {
            AccessMode::Random => {
                tokio::fs::metadata(&full)
                    .await
                    .map_err(|e| SourceError::io(full.display().to_string(), e))?;
                Ok(SourceStream::Path(full))
            }
            AccessMode::Streaming => {
                let data = tokio::fs::read(&full)
                    .await
                    .map_err(|e| SourceError::io(full.display().to_string(), e))?;
                Ok(SourceStream::Bytes(Bytes::from(data)))
            }
        }
    }

    async fn open_content(&self, uri: &str) -> Result<SourceStream, SourceError> {
        let path = self.content_path(uri)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| SourceError::io(uri, e))?;
        Ok(SourceStream::Bytes(Bytes::from(data)))
    }
}

/// Join `relative` onto `root`, refusing absolute paths and `..`.
fn confined_join(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut joined = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => joined.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(joined)
}

// =============================================================================
// Tests
// =============================================================================
