//! Image decoding for imgshift.
//!
//! This module provides functionality for:
//! - Sniffing and decoding JPEG, PNG and GIF byte streams
//! - Enforcing input size and dimension ceilings on untrusted data
//! - Optional EXIF orientation correction for JPEG input
//!
//! Every decoded image is normalized to 8-bit RGBA so downstream stages only
//! deal with a single pixel layout.
//!
//! # Examples
//!
//! ```ignore
//! use imgshift_core::decode::{decode, DecodeOptions};
//!
//! let bytes = std::fs::read("photo.png")?;
//! let image = decode(&bytes, &DecodeOptions::default())?;
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod reader;
mod types;

pub use reader::{decode, get_orientation, DecodeOptions};
pub use types::{DecodeError, DecodeLimits, FilterType, Orientation, RasterImage, CHANNELS};
pub(crate) use types::buffer_len;
