//! Raster buffer, decode limits and the small enums shared by the stages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of bytes per pixel in a [`RasterImage`] (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Why an input byte stream could not become a [`RasterImage`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not JPEG, PNG or GIF.
    #[error("not a JPEG, PNG or GIF image")]
    InvalidFormat,

    /// Recognized container, unreadable content.
    #[error("image data is damaged or truncated: {0}")]
    CorruptedFile(String),

    #[error("decode limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("no image data")]
    Empty,
}

/// Resampling kernel used by the resize stage. Both kernels average every
/// source pixel under the output footprint when downscaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Triangle kernel, stretched over the scale factor when downscaling.
    #[default]
    Bilinear,
    Lanczos3,
}

impl FilterType {
    /// The matching `image::imageops` kernel.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        use image::imageops::FilterType as Kernel;
        match self {
            Self::Bilinear => Kernel::Triangle,
            Self::Lanczos3 => Kernel::Lanczos3,
        }
    }
}

/// How a JPEG's pixels must be reoriented to appear upright, from the
/// EXIF `Orientation` tag (values 1 to 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Upright,
    Mirrored,
    UpsideDown,
    MirroredUpsideDown,
    /// Mirrored across the main diagonal.
    Transposed,
    /// Needs a quarter turn clockwise.
    TurnedLeft,
    /// Mirrored across the anti-diagonal.
    Transversed,
    /// Needs a quarter turn counter-clockwise.
    TurnedRight,
}

impl Orientation {
    /// Map an EXIF tag value; anything outside 2..=8 is upright.
    pub fn from_exif(value: u32) -> Self {
        const TABLE: [Orientation; 7] = [
            Orientation::Mirrored,
            Orientation::UpsideDown,
            Orientation::MirroredUpsideDown,
            Orientation::Transposed,
            Orientation::TurnedLeft,
            Orientation::Transversed,
            Orientation::TurnedRight,
        ];
        value
            .checked_sub(2)
            .and_then(|i| TABLE.get(i as usize).copied())
            .unwrap_or_default()
    }
}

/// Resource ceilings applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum accepted size of the encoded byte stream.
    pub max_input_bytes: usize,
    /// Maximum accepted width or height in pixels.
    pub max_dimension: u32,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 20 * 1024 * 1024,
            max_dimension: 10_000,
        }
    }
}

impl DecodeLimits {
    /// Largest RGBA allocation these limits allow.
    pub fn max_alloc(&self) -> u64 {
        self.max_dimension as u64 * self.max_dimension as u64 * CHANNELS as u64
    }
}

/// A decoded image with RGBA pixel data.
///
/// Owned by exactly one pipeline stage at a time. Stages consume the value
/// and return a new one, so the previous buffer is freed as soon as the
/// stage that replaced it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    /// Length is always width * height * 4.
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Create a new RasterImage with the given dimensions and pixel data.
    ///
    /// Returns `None` if a dimension is zero or the buffer length does not
    /// match `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != buffer_len(width, height) {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create an image filled with a single RGBA color.
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(buffer_len(width, height))
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a RasterImage from an image::RgbaImage without copying.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Convert into an image::RgbaImage, handing over the buffer.
    pub fn into_rgba_image(self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels)
    }

    /// Borrow the RGBA sample at (x, y).
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = self.index(x, y);
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Byte offset of the pixel at (x, y).
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Expected buffer length for the given dimensions.
#[inline]
pub(crate) fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}
