//! Rectangular cropping in pixel coordinates.
//!
//! # Coordinate System
//!
//! - (0, 0) = top-left corner
//! - The region is `[x, x + width) x [y, y + height)`
//! - The region must lie entirely inside the image; nothing is clamped

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{RasterImage, CHANNELS};

/// A crop region in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Errors produced by [`crop`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CropError {
    /// The region has no area.
    #[error("crop region {width}x{height} is empty")]
    EmptyRegion { width: u32, height: u32 },

    /// The region extends past the image edge.
    #[error(
        "crop region {width}x{height}+{x}+{y} exceeds image bounds {image_width}x{image_height}"
    )]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
}

/// Extract a sub-rectangle of an image.
///
/// Consumes the input; on success the returned image holds a fresh buffer
/// of exactly `rect.width * rect.height` pixels and the source is freed.
///
/// # Errors
///
/// * `CropError::EmptyRegion` if the width or height is zero
/// * `CropError::OutOfBounds` if any part of the region is outside the image
///
/// # Example
///
/// ```
/// use imgshift_core::decode::RasterImage;
/// use imgshift_core::transform::{crop, CropRect};
///
/// let image = RasterImage::filled(100, 100, [128, 128, 128, 255]);
/// let cropped = crop(image, CropRect { x: 25, y: 25, width: 50, height: 50 }).unwrap();
/// assert_eq!((cropped.width, cropped.height), (50, 50));
/// ```
pub fn crop(image: RasterImage, rect: CropRect) -> Result<RasterImage, CropError> {
    if rect.width == 0 || rect.height == 0 {
        return Err(CropError::EmptyRegion {
            width: rect.width,
            height: rect.height,
        });
    }

    let right = rect.x.checked_add(rect.width);
    let bottom = rect.y.checked_add(rect.height);
    let contained = matches!(
        (right, bottom),
        (Some(r), Some(b)) if r <= image.width && b <= image.height
    );
    if !contained {
        return Err(CropError::OutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            image_width: image.width,
            image_height: image.height,
        });
    }

    // Full-frame crop keeps the existing buffer
    if rect.width == image.width && rect.height == image.height {
        return Ok(image);
    }

    let row_bytes = rect.width as usize * CHANNELS;
    let mut output = Vec::with_capacity(row_bytes * rect.height as usize);

    for y in rect.y..rect.y + rect.height {
        let start = image.index(rect.x, y);
        output.extend_from_slice(&image.pixels[start..start + row_bytes]);
    }

    Ok(RasterImage {
        width: rect.width,
        height: rect.height,
        pixels: output,
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================
