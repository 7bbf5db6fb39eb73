//! Geometry stages: resize, crop and rotation.
//!
//! Each stage takes a [`RasterImage`](crate::decode::RasterImage) by value
//! and returns a new one, so the consumed buffer is released when the stage
//! returns, on success and on error alike.
//!
//! # Stage Order
//!
//! The pipeline runs the geometry stages in this order:
//! 1. Resize (downscale only)
//! 2. Crop
//! 3. Rotation
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, y grows downward
//! - Crop coordinates are absolute pixels in the resized image
//! - Rotation angles are in degrees, positive = counter-clockwise

mod crop;
mod resize;
mod rotation;

pub use crop::{crop, CropError, CropRect};
pub use resize::{fit_dimensions, resize, ResizeError, ResizeTarget};
pub use rotation::{
    compute_rotated_bounds, rotate, InterpolationFilter, RotateError, MAX_CANVAS_DIMENSION,
    ROTATION_BACKGROUND,
};
