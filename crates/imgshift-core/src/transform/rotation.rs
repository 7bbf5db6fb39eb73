//! Arbitrary-angle rotation about the image center.
//!
//! Positive angles rotate counter-clockwise as seen on screen (y axis
//! pointing down). The output canvas is the bounding box of the rotated
//! image, and every output pixel not covered by the source is filled with
//! opaque black.
//!
//! Multiples of 90 degrees are performed as exact pixel permutations. Every
//! other angle uses inverse mapping: for each output pixel center we find the
//! source position and interpolate.
//!
//! For a counter-clockwise rotation by θ the inverse transform is:
//! ```text
//! src_x =  dx * cos(θ) - dy * sin(θ) + src_cx
//! src_y =  dx * sin(θ) + dy * cos(θ) + src_cy
//! ```
//! where `(dx, dy)` is the output pixel center relative to the canvas center.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{RasterImage, CHANNELS};

/// Fill color for canvas area not covered by the rotated image.
pub const ROTATION_BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Largest width or height a rotated canvas may have.
pub const MAX_CANVAS_DIMENSION: u32 = 1 << 16;

const ANGLE_EPSILON: f64 = 0.001;

/// Kernel used for angles that are not multiples of 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationFilter {
    /// Bilinear interpolation over the 2x2 neighborhood.
    #[default]
    Bilinear,
    /// Lanczos3 interpolation over the 6x6 neighborhood.
    Lanczos3,
}

/// Errors produced by [`rotate`].
#[derive(Debug, Error, PartialEq)]
pub enum RotateError {
    /// NaN or infinite angle.
    #[error("rotation angle {0} is not a finite number")]
    NonFiniteAngle(f64),

    /// The rotated bounding box is too large to allocate.
    #[error("rotated canvas {width}x{height} exceeds {max}x{max}")]
    CanvasTooLarge { width: u64, height: u64, max: u32 },

    /// The source buffer does not match its declared dimensions.
    #[error("source buffer does not match {width}x{height}")]
    InvalidBuffer { width: u32, height: u32 },
}

/// Canvas size needed to hold a `width` x `height` image turned by
/// `angle_degrees`.
///
/// # Example
///
/// ```
/// use imgshift_core::transform::compute_rotated_bounds;
///
/// assert_eq!(compute_rotated_bounds(100, 50, 90.0), (50, 100));
/// assert_eq!(compute_rotated_bounds(100, 50, 0.0), (100, 50));
/// ```
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    let (w, h) = rotated_bounds_f64(width, height, angle_degrees);
    (w as u32, h as u32)
}

fn rotated_bounds_f64(width: u32, height: u32, angle_degrees: f64) -> (f64, f64) {
    match right_angle_turns(angle_degrees) {
        Some(0) | Some(2) => return (width as f64, height as f64),
        Some(_) => return (height as f64, width as f64),
        None => {}
    }

    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (w, h) = (width as f64, height as f64);

    (
        (w * cos + h * sin).round().max(1.0),
        (w * sin + h * cos).round().max(1.0),
    )
}

/// Number of counter-clockwise quarter turns if the angle is a multiple of 90
/// degrees (within tolerance), otherwise `None`.
fn right_angle_turns(angle_degrees: f64) -> Option<u8> {
    let normalized = angle_degrees.rem_euclid(360.0);
    let quarter = (normalized / 90.0).round();
    if (normalized - quarter * 90.0).abs() < ANGLE_EPSILON {
        Some((quarter as u8) % 4)
    } else {
        None
    }
}

/// Rotate an image about its center.
///
/// Consumes the input. Angles within 0.001° of a multiple of 360 return the
/// input unchanged.
///
/// `filter` only matters when the angle is not a multiple of 90 degrees.
///
/// # Errors
///
/// * `RotateError::NonFiniteAngle` for NaN or infinite angles
/// * `RotateError::CanvasTooLarge` if the bounding box exceeds [`MAX_CANVAS_DIMENSION`]
pub fn rotate(
    image: RasterImage,
    angle_degrees: f64,
    filter: InterpolationFilter,
) -> Result<RasterImage, RotateError> {
    if !angle_degrees.is_finite() {
        return Err(RotateError::NonFiniteAngle(angle_degrees));
    }

    if let Some(turns) = right_angle_turns(angle_degrees) {
        return rotate_quarter_turns(image, turns);
    }

    let canvas = checked_canvas(image.width, image.height, angle_degrees)?;
    Ok(rotate_resampled(&image, angle_degrees, filter, canvas))
}

fn checked_canvas(width: u32, height: u32, angle_degrees: f64) -> Result<(u32, u32), RotateError> {
    let (w, h) = rotated_bounds_f64(width, height, angle_degrees);
    if w > MAX_CANVAS_DIMENSION as f64 || h > MAX_CANVAS_DIMENSION as f64 {
        return Err(RotateError::CanvasTooLarge {
            width: w as u64,
            height: h as u64,
            max: MAX_CANVAS_DIMENSION,
        });
    }
    Ok((w as u32, h as u32))
}

fn rotate_quarter_turns(image: RasterImage, turns: u8) -> Result<RasterImage, RotateError> {
    if turns == 0 {
        return Ok(image);
    }

    let (width, height) = (image.width, image.height);
    let rgba = image
        .into_rgba_image()
        .ok_or(RotateError::InvalidBuffer { width, height })?;

    // imageops rotates clockwise
    let rotated = match turns {
        1 => image::imageops::rotate270(&rgba),
        2 => image::imageops::rotate180(&rgba),
        _ => image::imageops::rotate90(&rgba),
    };

    Ok(RasterImage::from_rgba_image(rotated))
}

/// Rotate by inverse mapping onto a canvas of the given size.
fn rotate_resampled(
    image: &RasterImage,
    angle_degrees: f64,
    filter: InterpolationFilter,
    (canvas_w, canvas_h): (u32, u32),
) -> RasterImage {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let src_center = (image.width as f64 / 2.0, image.height as f64 / 2.0);
    let canvas_center = (canvas_w as f64 / 2.0, canvas_h as f64 / 2.0);

    let mut pixels = Vec::with_capacity(canvas_w as usize * canvas_h as usize * CHANNELS);
    for row in 0..canvas_h {
        let dy = row as f64 + 0.5 - canvas_center.1;
        for col in 0..canvas_w {
            let dx = col as f64 + 0.5 - canvas_center.0;
            // Pixel-center coordinates in the source
            let sx = dx * cos - dy * sin + src_center.0 - 0.5;
            let sy = dx * sin + dy * cos + src_center.1 - 0.5;
            pixels.extend_from_slice(&sample(image, sx, sy, filter));
        }
    }

    RasterImage {
        width: canvas_w,
        height: canvas_h,
        pixels,
    }
}

/// Source rows or columns contributing along one axis, with their weights.
#[derive(Debug, Clone, Copy)]
struct Taps {
    index: [u32; 6],
    weight: [f64; 6],
    len: usize,
}

impl Taps {
    fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.index[..self.len]
            .iter()
            .copied()
            .zip(self.weight[..self.len].iter().copied())
    }
}

/// Two taps around `pos`, which is clamped into `[0, extent - 1]` first.
fn linear_taps(pos: f64, extent: u32) -> Taps {
    let last = extent - 1;
    let pos = pos.clamp(0.0, last as f64);
    let lo = pos.floor() as u32;
    let frac = pos - lo as f64;

    let mut taps = Taps {
        index: [0; 6],
        weight: [0.0; 6],
        len: 2,
    };
    taps.index[..2].copy_from_slice(&[lo, (lo + 1).min(last)]);
    taps.weight[..2].copy_from_slice(&[1.0 - frac, frac]);
    taps
}

/// Six Lanczos taps around `pos`, or `None` when the window would leave
/// the image.
fn lanczos_taps(pos: f64, extent: u32) -> Option<Taps> {
    if pos < 2.0 || pos >= extent as f64 - 3.0 {
        return None;
    }
    let base = pos.floor() as u32 - 2;

    let mut taps = Taps {
        index: [0; 6],
        weight: [0.0; 6],
        len: 6,
    };
    for k in 0..6 {
        let index = base + k as u32;
        taps.index[k] = index;
        taps.weight[k] = lanczos_weight(pos - index as f64, 3.0);
    }
    Some(taps)
}

/// Interpolated color at a source position.
///
/// Positions inside the outer half-pixel border are clamped to the edge
/// pixels; positions beyond it are background. Lanczos3 degrades to
/// bilinear within three pixels of the edge.
fn sample(image: &RasterImage, x: f64, y: f64, filter: InterpolationFilter) -> [u8; 4] {
    if x < -0.5 || y < -0.5 || x > image.width as f64 - 0.5 || y > image.height as f64 - 0.5 {
        return ROTATION_BACKGROUND;
    }

    let lanczos = match filter {
        InterpolationFilter::Lanczos3 => {
            lanczos_taps(x, image.width).zip(lanczos_taps(y, image.height))
        }
        InterpolationFilter::Bilinear => None,
    };
    let (cols, rows) = match lanczos {
        Some(taps) => taps,
        None => (linear_taps(x, image.width), linear_taps(y, image.height)),
    };

    let mut acc = [0.0f64; CHANNELS];
    let mut total = 0.0;
    for (py, wy) in rows.iter() {
        for (px, wx) in cols.iter() {
            let weight = wx * wy;
            let texel = image.pixel(px, py);
            for (sum, channel) in acc.iter_mut().zip(texel) {
                *sum += channel as f64 * weight;
            }
            total += weight;
        }
    }

    if total <= 0.0 {
        return [0; 4];
    }
    acc.map(|sum| (sum / total).clamp(0.0, 255.0).round() as u8)
}

/// `sinc(x) * sinc(x / a)` on `(-a, a)`, zero outside.
fn lanczos_weight(x: f64, a: f64) -> f64 {
    if x.abs() >= a {
        return 0.0;
    }
    if x == 0.0 {
        return 1.0;
    }
    let t = std::f64::consts::PI * x;
    a * t.sin() * (t / a).sin() / (t * t)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Output buffers always match their dimensions and cover the source.
        #[test]
        fn prop_canvas_bounds_source(
            (w, h) in (1u32..=40, 1u32..=40),
            angle in -720.0f64..720.0,
        ) {
            let img = RasterImage::filled(w, h, [10, 20, 30, 255]);
            let out = rotate(img, angle, InterpolationFilter::Bilinear).unwrap();

            prop_assert_eq!(out.pixels.len(), (out.width * out.height * 4) as usize);
            // The exact bounding box has at least the source area; each side
            // loses at most half a pixel to rounding
            let area = (out.width as f64 + 0.5) * (out.height as f64 + 0.5);
            prop_assert!(area >= (w * h) as f64);
        }

        /// Property: Rotation never produces transparent pixels from an opaque source.
        #[test]
        fn prop_opaque_stays_opaque(
            (w, h) in (2u32..=30, 2u32..=30),
            angle in -180.0f64..180.0,
        ) {
            let img = RasterImage::filled(w, h, [200, 10, 10, 255]);
            let out = rotate(img, angle, InterpolationFilter::Bilinear).unwrap();
            prop_assert!(out.pixels.chunks_exact(4).all(|p| p[3] == 255));
        }
    }
}
