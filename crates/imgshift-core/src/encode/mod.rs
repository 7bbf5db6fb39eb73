//! Image encoding for imgshift.
//!
//! This module provides functionality for:
//! - Parsing requested output formats (`jpeg`/`jpg`, `png`, `gif`)
//! - Mapping the request's 0-100 quality knob onto each codec's parameter
//! - Encoding a [`RasterImage`](crate::decode::RasterImage) into an in-memory byte buffer
//!
//! # Quality Semantics
//!
//! | Format | Parameter                                   |
//! |--------|---------------------------------------------|
//! | JPEG   | quality used directly (0 is clamped to 1)   |
//! | PNG    | `round((100 - quality) * 9 / 100)` zlib level |
//! | GIF    | ignored                                     |

mod format;
mod writer;

pub use format::{png_compression_level, OutputFormat, DEFAULT_QUALITY};
pub use writer::{encode, EncodeError};
