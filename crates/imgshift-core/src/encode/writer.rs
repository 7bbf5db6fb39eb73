//! Encoding of RGBA rasters to JPEG, PNG and GIF bytes.
//!
//! All output is produced in memory; nothing touches the filesystem.

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ExtendedColorType, Frame, ImageEncoder};
use thiserror::Error;

use super::{png_compression_level, OutputFormat};
use crate::decode::{buffer_len, RasterImage};

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("raster holds {actual} bytes, {expected} expected for its size")]
    InvalidPixelData { expected: usize, actual: usize },

    #[error("cannot encode an empty {width}x{height} raster")]
    InvalidDimensions { width: u32, height: u32 },

    /// The codec rejected the image.
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// Encode an RGBA raster to the requested format.
///
/// `quality` is 0 to 100 and read per format. JPEG uses it directly, with 0
/// clamped to the codec's minimum of 1. PNG maps it to a zlib level through
/// [`png_compression_level`]. GIF ignores it.
///
/// JPEG output drops the alpha channel. PNG keeps it. GIF quantizes to a
/// 256-color palette.
pub fn encode(
    image: &RasterImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (image.width, image.height);
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = buffer_len(width, height);
    if image.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: image.pixels.len(),
        });
    }

    let failed = |e: image::ImageError| EncodeError::EncodingFailed {
        format,
        message: e.to_string(),
    };

    let mut buffer = Vec::new();
    match format {
        OutputFormat::Jpeg => {
            let rgb = strip_alpha(&image.pixels);
            JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(failed)?;
        }
        OutputFormat::Png => {
            let compression = match png_compression_level(quality) {
                0 => CompressionType::Uncompressed,
                level => CompressionType::Level(level),
            };
            PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive)
                .write_image(&image.pixels, width, height, ExtendedColorType::Rgba8)
                .map_err(failed)?;
        }
        OutputFormat::Gif => {
            let rgba = image::RgbaImage::from_raw(width, height, image.pixels.clone()).ok_or(
                EncodeError::InvalidPixelData {
                    expected,
                    actual: image.pixels.len(),
                },
            )?;
            // The trailer is written when the encoder is dropped
            let mut encoder = GifEncoder::new(&mut buffer);
            encoder.encode_frame(Frame::new(rgba)).map_err(failed)?;
            drop(encoder);
        }
    }

    Ok(buffer)
}

fn strip_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, DecodeOptions};

    fn gradient(width: u32, height: u32) -> RasterImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width) as u8);
                pixels.push((y * 255 / height) as u8);
                pixels.push(128);
                pixels.push(255);
            }
        }
        RasterImage::new(width, height, pixels).unwrap()
    }

    #[test]
    fn test_encode_jpeg_markers() {
        let jpeg = encode(&gradient(100, 100), OutputFormat::Jpeg, 90).unwrap();

        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        let len = jpeg.len();
        assert_eq!(&jpeg[len - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_jpeg_quality_zero_is_clamped() {
        let result = encode(&gradient(10, 10), OutputFormat::Jpeg, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn test_encode_jpeg_quality_affects_size() {
        let img = gradient(64, 64);
        let low = encode(&img, OutputFormat::Jpeg, 10).unwrap();
        let high = encode(&img, OutputFormat::Jpeg, 100).unwrap();
        assert!(high.len() > low.len());
    }

    #[test]
    fn test_encode_png_signature_and_alpha() {
        let mut img = gradient(8, 8);
        img.pixels[3] = 17;
        let png = encode(&img, OutputFormat::Png, 90).unwrap();

        assert_eq!(
            &png[0..8],
            &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]
        );
        let decoded = decode(&png, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_encode_png_uncompressed_is_largest() {
        let img = RasterImage::filled(64, 64, [10, 20, 30, 255]);
        let stored = encode(&img, OutputFormat::Png, 100).unwrap();
        let best = encode(&img, OutputFormat::Png, 0).unwrap();
        assert!(stored.len() > best.len());
    }

    #[test]
    fn test_encode_gif_signature() {
        let gif = encode(&gradient(12, 12), OutputFormat::Gif, 0).unwrap();
        assert_eq!(&gif[0..3], b"GIF");
        assert_eq!(*gif.last().unwrap(), 0x3B);
    }

    #[test]
    fn test_encode_gif_ignores_quality() {
        let img = gradient(12, 12);
        let a = encode(&img, OutputFormat::Gif, 0).unwrap();
        let b = encode(&img, OutputFormat::Gif, 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_invalid_pixel_data() {
        let img = RasterImage {
            width: 10,
            height: 10,
            pixels: vec![0u8; 10 * 10 * 3],
        };
        let result = encode(&img, OutputFormat::Png, 90);
        assert!(matches!(result, Err(EncodeError::InvalidPixelData { .. })));
    }

    #[test]
    fn test_encode_zero_dimensions() {
        let img = RasterImage {
            width: 0,
            height: 10,
            pixels: vec![],
        };
        let result = encode(&img, OutputFormat::Jpeg, 90);
        assert!(matches!(result, Err(EncodeError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_strip_alpha() {
        assert_eq!(
            strip_alpha(&[1, 2, 3, 4, 5, 6, 7, 8]),
            vec![1, 2, 3, 5, 6, 7]
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: Every format encodes any valid raster.
        #[test]
        fn prop_valid_input_encodes(
            (width, height) in (1u32..=24, 1u32..=24),
            quality in 0u8..=100,
            format in prop_oneof![
                Just(OutputFormat::Jpeg),
                Just(OutputFormat::Png),
                Just(OutputFormat::Gif),
            ],
        ) {
            let img = RasterImage::filled(width, height, [90, 140, 200, 255]);
            let bytes = encode(&img, format, quality);
            prop_assert!(bytes.is_ok());
            prop_assert!(!bytes.unwrap().is_empty());
        }
    }
}
