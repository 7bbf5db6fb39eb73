//! Aspect-preserving downscale.
//!
//! The target box is clamped to the current size first (upscaling is never
//! performed), then one side is shrunk so the box matches the source aspect
//! ratio, then both sides are truncated toward zero.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{FilterType, RasterImage};

/// Requested bounding box for a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeTarget {
    pub width: u32,
    pub height: u32,
}

/// Errors produced by [`resize`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResizeError {
    /// Truncation collapsed one side of the output to zero pixels.
    #[error("resize to {requested_width}x{requested_height} gives a {width}x{height} image")]
    DegenerateOutput {
        requested_width: u32,
        requested_height: u32,
        width: u32,
        height: u32,
    },

    /// The source buffer does not match its declared dimensions.
    #[error("source buffer does not match {width}x{height}")]
    InvalidBuffer { width: u32, height: u32 },
}

/// Compute output dimensions for fitting `orig` into `target`.
///
/// The result may contain a zero for extreme aspect ratios; [`resize`]
/// rejects that case.
pub fn fit_dimensions(orig_width: u32, orig_height: u32, target: ResizeTarget) -> (u32, u32) {
    let mut width = target.width.min(orig_width) as f64;
    let mut height = target.height.min(orig_height) as f64;

    let orig_ratio = orig_width as f64 / orig_height as f64;
    if width / height > orig_ratio {
        width = height * orig_ratio;
    } else {
        height = width / orig_ratio;
    }

    (width as u32, height as u32)
}

/// Downscale an image to fit inside `target`, preserving aspect ratio.
///
/// Consumes the input. If the computed size equals the current size the
/// input is returned untouched.
///
/// # Errors
///
/// `ResizeError::DegenerateOutput` if either output side truncates to zero.
pub fn resize(
    image: RasterImage,
    target: ResizeTarget,
    filter: FilterType,
) -> Result<RasterImage, ResizeError> {
    let (width, height) = fit_dimensions(image.width, image.height, target);
    if width == 0 || height == 0 {
        return Err(ResizeError::DegenerateOutput {
            requested_width: target.width,
            requested_height: target.height,
            width,
            height,
        });
    }

    if width == image.width && height == image.height {
        return Ok(image);
    }

    let (src_width, src_height) = (image.width, image.height);
    let rgba = image.into_rgba_image().ok_or(ResizeError::InvalidBuffer {
        width: src_width,
        height: src_height,
    })?;

    let resized = image::imageops::resize(&rgba, width, height, filter.to_image_filter());

    Ok(RasterImage::from_rgba_image(resized))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
