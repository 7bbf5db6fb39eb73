//! Error types for the transformation service.
//!
//! [`ServiceError`] is everything a transform request can end in; its
//! [`status`](ServiceError::status) is the HTTP status the response carries.

use imgshift_core::{ErrorKind, TransformError};
use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Object storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("storage I/O error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Request-level failures.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No image record with the requested id
    #[error("Image {0} not found")]
    NotFound(u64),

    /// The requester does not own the image
    #[error("Unauthorized")]
    Forbidden,

    /// The body is not a JSON object of the expected shape
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// HTTP status code for the error response.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::Forbidden => 403,
            ServiceError::InvalidBody(_) => 422,
            ServiceError::Transform(e) => match e.kind() {
                ErrorKind::Validation => 422,
                ErrorKind::UnsupportedFormat => 400,
                ErrorKind::Processing => 500,
            },
            ServiceError::Storage(_) => 500,
        }
    }
}
