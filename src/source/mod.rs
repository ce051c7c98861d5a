//! Source Locator.
//!
//! Turns a URI string into bytes (or a path) a native decoder can consume.
//!
//! ```text
//! "android.resource://pkg/drawable/page"
//!                │
//!                ▼
//! ┌─────────────────────────────────────────┐
//! │        SourceRef::parse (uri)           │
//! │  Resource | Asset | File | Generic      │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │       open_source (context)             │
//! │  SourceContext trait = host platform    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//!            SourceStream (bytes | path)
//! ```

mod context;
mod local;
mod uri;

pub use context::{
    open_source, resolve_resource_id, resources_for, AccessMode, ResourceTable, SourceContext,
    SourceStream,
};
pub use local::{DirectoryResources, LocalContext, CONTENT_SCHEME, FIRST_DRAWABLE_ID};
pub use uri::{
    parse_resource_id, ResourceTarget, SourceRef, ASSET_PREFIX, DRAWABLE, FILE_PREFIX,
    NO_RESOURCE_ID, RESOURCE_PREFIX, RESOURCE_SCHEME,
};
