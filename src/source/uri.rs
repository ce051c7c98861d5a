//! Source URI classification.
//!
//! Every image handed to a decoder is addressed by a URI string. This module
//! turns that string into a [`SourceRef`] without touching any I/O. The
//! grammar recognises four prefixes, checked in this order:
//!
//! | Prefix                     | Kind                   |
//! |----------------------------|------------------------|
//! | `android.resource://`      | packaged resource      |
//! | `file:///android_asset/`   | bundled asset          |
//! | `file://`                  | filesystem path        |
//! | anything else              | generic content URI    |
//!
//! Resource URIs name their target either as `drawable/<name>` or as a single
//! decimal id segment. Parse failures never surface as errors here: an
//! unparseable id resolves to id `0`, which the host treats as "no such
//! resource" when the source is opened.

use std::fmt;

use tracing::debug;
use url::Url;

/// Prefix for filesystem URIs.
pub const FILE_PREFIX: &str = "file://";

/// Prefix for bundled assets. Must be checked before [`FILE_PREFIX`].
pub const ASSET_PREFIX: &str = "file:///android_asset/";

/// Scheme used for packaged resources.
pub const RESOURCE_SCHEME: &str = "android.resource";

/// Prefix for packaged resources.
pub const RESOURCE_PREFIX: &str = "android.resource://";

/// Resource type segment used for by-name lookups.
pub const DRAWABLE: &str = "drawable";

/// The identifier used when a resource URI does not yield a valid id.
pub const NO_RESOURCE_ID: u32 = 0;

// =============================================================================
// SourceRef
// =============================================================================

/// How a resource URI addresses its target inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceTarget {
    /// `drawable/<name>`: looked up in the package's resource table.
    Named(String),

    /// A numeric id, or [`NO_RESOURCE_ID`] when the URI did not carry one.
    Id(u32),
}

/// Parsed, immutable description of where image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A packaged resource owned by `package`.
    Resource {
        package: String,
        target: ResourceTarget,
    },

    /// A bundled asset, addressed relative to the asset root.
    Asset(String),

    /// An absolute filesystem path.
    File(String),

    /// Any other URI, opened through the host's content resolver.
    Generic(String),
}

impl SourceRef {
    /// Classify a URI string.
    ///
    /// The asset and file prefixes are stripped verbatim, without percent
    /// decoding. Resource path segments are percent decoded.
    pub fn parse(uri: &str) -> Self {
        if uri.starts_with(RESOURCE_PREFIX) {
            parse_resource(uri)
        } else if let Some(asset) = uri.strip_prefix(ASSET_PREFIX) {
            SourceRef::Asset(asset.to_string())
        } else if let Some(path) = uri.strip_prefix(FILE_PREFIX) {
            SourceRef::File(path.to_string())
        } else {
            SourceRef::Generic(uri.to_string())
        }
    }

    /// Short name of the source kind, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            SourceRef::Resource { .. } => "resource",
            SourceRef::Asset(_) => "asset",
            SourceRef::File(_) => "file",
            SourceRef::Generic(_) => "generic",
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Resource {
                package,
                target: ResourceTarget::Named(name),
            } => write!(f, "{}{}/{}/{}", RESOURCE_PREFIX, package, DRAWABLE, name),
            SourceRef::Resource {
                package,
                target: ResourceTarget::Id(id),
            } => write!(f, "{}{}/{}", RESOURCE_PREFIX, package, id),
            SourceRef::Asset(path) => write!(f, "{}{}", ASSET_PREFIX, path),
            SourceRef::File(path) => write!(f, "{}{}", FILE_PREFIX, path),
            SourceRef::Generic(uri) => f.write_str(uri),
        }
    }
}

// =============================================================================
// Resource URIs
// =============================================================================

fn parse_resource(uri: &str) -> SourceRef {
    let (package, segments) = match Url::parse(uri) {
        Ok(url) => {
            let package = url.host_str().unwrap_or_default().to_string();
            let segments = url
                .path_segments()
                .map(|segments| segments.map(decode_segment).collect())
                .unwrap_or_default();
            (package, segments)
        }
        Err(e) => {
            debug!(uri = uri, error = %e, "Falling back to manual resource URI split");
            split_resource(uri)
        }
    };

    let segments: Vec<String> = segments.into_iter().filter(|s| !s.is_empty()).collect();

    SourceRef::Resource {
        package,
        target: resource_target(&segments),
    }
}

/// Split `android.resource://<authority>/<path>` without a URL parser.
fn split_resource(uri: &str) -> (String, Vec<String>) {
    let rest = &uri[RESOURCE_PREFIX.len()..];
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let segments = path.split('/').map(decode_segment).collect();
    (authority.to_string(), segments)
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

/// Pick the resource target from non-empty path segments.
fn resource_target(segments: &[String]) -> ResourceTarget {
    match segments {
        [kind, name] if kind == DRAWABLE => ResourceTarget::Named(name.clone()),
        [id] if id.bytes().all(|b| b.is_ascii_digit()) => ResourceTarget::Id(parse_resource_id(id)),
        _ => ResourceTarget::Id(NO_RESOURCE_ID),
    }
}

/// Parse a decimal resource id as a 32-bit signed integer would be parsed.
///
/// Overflowing or malformed ids resolve to [`NO_RESOURCE_ID`].
pub fn parse_resource_id(segment: &str) -> u32 {
    segment
        .parse::<i32>()
        .ok()
        .and_then(|id| u32::try_from(id).ok())
        .unwrap_or(NO_RESOURCE_ID)
}

// =============================================================================
// Tests
// =============================================================================
