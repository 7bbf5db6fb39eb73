//! imgshift core - raster transformation pipeline
//!
//! This crate decodes a stored image, applies the requested geometric and
//! photometric stages in a fixed order, composites an optional watermark and
//! re-encodes the result in memory. It performs no I/O of its own; the
//! watermark bytes come from a caller-supplied [`WatermarkFetcher`].

pub mod decode;
pub mod encode;
pub mod error;
pub mod filter;
pub mod luminance;
pub mod options;
pub mod pipeline;
pub mod transform;
pub mod watermark;

pub use decode::{DecodeLimits, DecodeOptions, RasterImage};
pub use encode::{OutputFormat, DEFAULT_QUALITY};
pub use error::{ErrorKind, TransformError};
pub use filter::ColorFilter;
pub use options::{TransformOptions, Transformations};
pub use pipeline::{transformed_name, Pipeline, PipelineConfig, PipelineOutput};
pub use transform::InterpolationFilter;
pub use watermark::{FetchError, WatermarkFetcher, WatermarkSpec};
