//! Photometric stage: grayscale and sepia.
//!
//! Both filters rewrite the color channels in place on the owned buffer and
//! never touch alpha.

use serde::{Deserialize, Serialize};

use crate::decode::RasterImage;
use crate::luminance::luma_u8;

/// Offsets added to the gray value by [`sepia`], in R, G, B order.
pub const SEPIA_TINT: [u8; 3] = [90, 60, 40];

/// The single color filter a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
}

impl ColorFilter {
    /// Resolve the request flags. Sepia wins when both are set, since it
    /// already includes the grayscale pass.
    pub fn from_flags(grayscale: bool, sepia: bool) -> Self {
        match (grayscale, sepia) {
            (_, true) => ColorFilter::Sepia,
            (true, false) => ColorFilter::Grayscale,
            (false, false) => ColorFilter::None,
        }
    }

    /// Apply the filter, returning the input untouched for `None`.
    pub fn apply(self, image: RasterImage) -> RasterImage {
        match self {
            ColorFilter::None => image,
            ColorFilter::Grayscale => grayscale(image),
            ColorFilter::Sepia => sepia(image),
        }
    }
}

/// Replace every pixel's color with its BT.601 luma. Alpha is unchanged.
pub fn grayscale(mut image: RasterImage) -> RasterImage {
    for px in image.pixels.chunks_exact_mut(4) {
        let g = luma_u8(px[0], px[1], px[2]);
        px[0] = g;
        px[1] = g;
        px[2] = g;
    }
    image
}

/// Grayscale followed by a warm tint of [`SEPIA_TINT`], saturating at 255.
pub fn sepia(image: RasterImage) -> RasterImage {
    let mut image = grayscale(image);
    for px in image.pixels.chunks_exact_mut(4) {
        for (channel, offset) in px[..3].iter_mut().zip(SEPIA_TINT) {
            *channel = channel.saturating_add(offset);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(ColorFilter::from_flags(false, false), ColorFilter::None);
        assert_eq!(ColorFilter::from_flags(true, false), ColorFilter::Grayscale);
        assert_eq!(ColorFilter::from_flags(false, true), ColorFilter::Sepia);
        assert_eq!(ColorFilter::from_flags(true, true), ColorFilter::Sepia);
    }

    #[test]
    fn test_none_is_identity() {
        let img = RasterImage::filled(3, 3, [10, 200, 30, 77]);
        assert_eq!(ColorFilter::None.apply(img.clone()), img);
    }

    #[test]
    fn test_grayscale_red() {
        let img = RasterImage::filled(1, 1, [255, 0, 0, 128]);
        assert_eq!(grayscale(img).pixel(0, 0), [76, 76, 76, 128]);
    }

    #[test]
    fn test_sepia_known_gray() {
        let img = RasterImage::filled(1, 1, [100, 100, 100, 255]);
        assert_eq!(sepia(img).pixel(0, 0), [190, 160, 140, 255]);
    }

    #[test]
    fn test_sepia_clamps() {
        let img = RasterImage::filled(1, 1, [200, 200, 200, 9]);
        assert_eq!(sepia(img).pixel(0, 0), [255, 255, 240, 9]);
    }

    #[test]
    fn test_sepia_and_grayscale_request_equals_sepia() {
        let img = RasterImage::filled(2, 2, [12, 140, 220, 255]);
        let both = ColorFilter::from_flags(true, true).apply(img.clone());
        assert_eq!(both, sepia(img));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
