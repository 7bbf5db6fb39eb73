//! imgshift - image transformation service
//!
//! Wraps the `imgshift-core` pipeline with everything a deployment needs
//! around it: configuration, logging, object storage, image records with
//! ownership checks, and a watermark fetcher guarded against server-side
//! request forgery. [`handler::TransformHandler`] ties them together.

pub mod config;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod logging;
pub mod records;
pub mod ssrf;
pub mod storage;

pub use config::Config;
pub use error::{ConfigError, ServiceError, StorageError};
pub use fetch::HttpFetcher;
pub use handler::{Response, TransformHandler, TransformRequest, TransformResponse, SUCCESS_MESSAGE};
pub use records::{ImageRecord, ImageRepository, InMemoryImageRepository};
pub use storage::{FsStorage, MemoryStorage, ObjectStorage};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
