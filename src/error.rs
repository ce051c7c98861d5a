use thiserror::Error;

/// Errors that can occur when resolving a source URI to readable bytes
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The URI addresses a package the host does not know about
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// No resource exists for the resolved identifier (id 0 means "not found")
    #[error("Resource not found: id {id} in package {package}")]
    ResourceNotFound { package: String, id: u32 },

    /// The host cannot open this kind of URI
    #[error("Unsupported source: {0}")]
    Unsupported(String),

    /// Reading the underlying file, asset or content stream failed
    #[error("I/O error reading {target}: {message}")]
    Io { target: String, message: String },
}

impl SourceError {
    /// Build an I/O error for `target` from a `std::io::Error`.
    pub fn io(target: impl Into<String>, err: std::io::Error) -> Self {
        SourceError::Io {
            target: target.into(),
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by decoders and decoder factories
#[derive(Debug, Clone, Error)]
pub enum DecoderError {
    /// The source URI could not be resolved or opened
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A factory could not build the requested decoder kind
    #[error("Cannot construct decoder '{kind}': {reason}")]
    Construction { kind: String, reason: String },

    /// The native decoder produced no usable image
    #[error("Decode failed: {message}")]
    Decode { message: String },

    /// The operation is not valid in the decoder's current lifecycle state
    #[error("Illegal decoder state: {message}")]
    IllegalState { message: String },

    /// A blocking decode task panicked or was aborted
    #[error("Decode task failed: {message}")]
    Task { message: String },
}

impl DecoderError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        DecoderError::Decode {
            message: message.into(),
        }
    }

    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        DecoderError::IllegalState {
            message: message.into(),
        }
    }

    /// True for errors caused by using a decoder outside its Ready state.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, DecoderError::IllegalState { .. })
    }
}
