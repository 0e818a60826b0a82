//! Error types for the cascade configuration system

use thiserror::Error;

/// Main error type for cascade resolution
///
/// Coercion problems never show up here: a tagged value that cannot be
/// converted degrades in place instead of aborting the cascade.
#[derive(Error, Debug)]
pub enum CascadeError {
    /// Source location does not exist
    #[error("Source not found: {path}")]
    NotFound { path: String },

    /// Content exists but is not valid for its declared format
    #[error("Parse error in {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// Filesystem failure other than a missing location
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Transport or store failure from a remote source
    #[error("Upstream error: {service}: {message}")]
    Upstream { service: String, message: String },

    /// Invalid cascade manifest
    #[error("Manifest error: {0}")]
    Manifest(String),
}

/// Result type alias for cascade operations
pub type Result<T> = std::result::Result<T, CascadeError>;

/// Remote document store specific errors
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Request never produced a response
    #[error("Connection to document store {store} failed: {message}")]
    ConnectionFailed { store: String, message: String },

    /// Non-success HTTP status other than 404
    #[error("HTTP error from document store {store}: {status}")]
    HttpError { store: String, status: u16 },

    /// Body was not a JSON document
    #[error("Invalid document from {store}: {message}")]
    InvalidDocument { store: String, message: String },
}

impl CascadeError {
    /// Build a parse error for the given source
    pub fn parse(source_name: impl Into<String>, message: impl ToString) -> Self {
        CascadeError::Parse {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Classify an `io::Error` for `path`, mapping `NotFound` to its own variant
    pub fn from_io(path: impl Into<String>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            CascadeError::NotFound { path }
        } else {
            CascadeError::Io {
                path,
                message: err.to_string(),
            }
        }
    }

    /// Whether this error reports a missing source location
    pub fn is_not_found(&self) -> bool {
        matches!(self, CascadeError::NotFound { .. })
    }
}

impl From<DocumentError> for CascadeError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::ConnectionFailed { store, message } => {
                CascadeError::Upstream { service: store, message }
            }
            DocumentError::HttpError { store, status } => CascadeError::Upstream {
                service: store,
                message: format!("HTTP error: {}", status),
            },
            DocumentError::InvalidDocument { store, message } => CascadeError::Upstream {
                service: store,
                message: format!("Invalid document: {}", message),
            },
        }
    }
}
