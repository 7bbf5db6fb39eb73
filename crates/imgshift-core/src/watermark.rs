//! Watermark compositing.
//!
//! The watermark arrives as encoded bytes from a [`WatermarkFetcher`], is
//! decoded with the same limits as the source image, and is alpha-blended
//! onto the base at a pixel offset. The offset may be negative; anything
//! falling outside the base canvas is clipped and the canvas never grows.
//!
//! # Blending
//!
//! ```text
//! α     = opacity / 100 * wm_alpha / 255
//! out   = base * (1 - α) + wm * α          (R, G, B)
//! out_a = 255 * α + base_a * (1 - α)
//! ```
//!
//! Channels are rounded to nearest. `image::imageops::overlay` truncates
//! instead, so it lands one step darker on half-way mixes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{decode, DecodeError, DecodeOptions, RasterImage, CHANNELS};

/// Failure reported by a [`WatermarkFetcher`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("invalid watermark url: {0}")]
    InvalidUrl(String),

    /// The URL resolves to a destination the egress policy forbids.
    #[error("watermark url not allowed: {0}")]
    Forbidden(String),

    /// The server did not answer within the configured timeout.
    #[error("watermark fetch timed out after {0} ms")]
    Timeout(u64),

    /// The server answered with a non-success status.
    #[error("watermark server returned HTTP {0}")]
    Status(u16),

    /// The body is larger than the configured ceiling.
    #[error("watermark body exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// Any other transport failure.
    #[error("watermark fetch failed: {0}")]
    Transport(String),
}

/// Collaborator that retrieves watermark bytes for a URL.
pub trait WatermarkFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

impl<F> WatermarkFetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>, FetchError>,
{
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self(url)
    }
}

/// Errors produced by the watermark stage.
#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("watermark could not be decoded: {0}")]
    Decode(#[from] DecodeError),
}

/// Validated watermark request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkSpec {
    /// Where to fetch the watermark image from.
    pub url: String,
    /// Horizontal offset of the watermark's top-left corner on the base.
    pub x: i64,
    /// Vertical offset of the watermark's top-left corner on the base.
    pub y: i64,
    /// 0 = invisible, 100 = watermark alpha used as-is.
    pub opacity: u8,
}

/// Fetch, decode and blend a watermark onto `base`.
///
/// The base is consumed and returned modified. On error the base is dropped
/// along with the request.
pub fn apply_watermark(
    base: RasterImage,
    spec: &WatermarkSpec,
    fetcher: &dyn WatermarkFetcher,
    decode_options: &DecodeOptions,
) -> Result<RasterImage, WatermarkError> {
    let bytes = fetcher.fetch(&spec.url)?;
    composite(base, &bytes, spec.x, spec.y, spec.opacity, decode_options)
}

/// Decode `watermark_bytes` and blend them onto `base` at `(x, y)`.
///
/// # Errors
///
/// `WatermarkError::Decode` if the watermark bytes are not a decodable
/// JPEG, PNG or GIF within `decode_options.limits`.
pub fn composite(
    base: RasterImage,
    watermark_bytes: &[u8],
    x: i64,
    y: i64,
    opacity: u8,
    decode_options: &DecodeOptions,
) -> Result<RasterImage, WatermarkError> {
    let overlay = decode(watermark_bytes, decode_options)?;
    Ok(blend(base, &overlay, x, y, opacity))
}

/// Alpha-blend an already decoded overlay onto `base`.
///
/// `opacity` above 100 is treated as 100.
pub fn blend(
    mut base: RasterImage,
    overlay: &RasterImage,
    x: i64,
    y: i64,
    opacity: u8,
) -> RasterImage {
    let opacity = opacity.min(100) as f32 / 100.0;
    if opacity == 0.0 {
        return base;
    }

    // Visible overlay columns and rows after clipping to the base canvas
    let Some((col_start, col_end)) = visible_span(x, overlay.width, base.width) else {
        return base;
    };
    let Some((row_start, row_end)) = visible_span(y, overlay.height, base.height) else {
        return base;
    };

    for oy in row_start..row_end {
        let by = (oy as i64 + y) as u32;
        for ox in col_start..col_end {
            let bx = (ox as i64 + x) as u32;

            let src = overlay.index(ox, oy);
            let dst = base.index(bx, by);
            let wm = &overlay.pixels[src..src + CHANNELS];

            let alpha = opacity * wm[3] as f32 / 255.0;
            if alpha == 0.0 {
                continue;
            }
            let inv = 1.0 - alpha;

            let px = &mut base.pixels[dst..dst + CHANNELS];
            for c in 0..3 {
                px[c] = mix(px[c] as f32 * inv + wm[c] as f32 * alpha);
            }
            px[3] = mix(255.0 * alpha + px[3] as f32 * inv);
        }
    }

    base
}

#[inline]
fn mix(v: f32) -> u8 {
    v.clamp(0.0, 255.0).round() as u8
}

/// Range of overlay coordinates `[start, end)` that land inside
/// `[0, base_len)` when the overlay starts at `offset`.
fn visible_span(offset: i64, overlay_len: u32, base_len: u32) -> Option<(u32, u32)> {
    let start = offset.saturating_neg().clamp(0, overlay_len as i64);
    let end = (base_len as i64)
        .saturating_sub(offset)
        .clamp(0, overlay_len as i64);
    (start < end).then_some((start as u32, end as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn png_bytes(img: &RasterImage) -> Vec<u8> {
        let rgba =
            image::RgbaImage::from_raw(img.width, img.height, img.pixels.clone()).unwrap();
        let mut buffer = Cursor::new(Vec::new());
        rgba.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_full_opacity_replaces() {
        let base = RasterImage::filled(4, 4, WHITE);
        let overlay = RasterImage::filled(2, 2, BLUE);
        let out = blend(base, &overlay, 1, 1, 100);

        assert_eq!(out.pixel(0, 0), WHITE);
        assert_eq!(out.pixel(1, 1), BLUE);
        assert_eq!(out.pixel(2, 2), BLUE);
        assert_eq!(out.pixel(3, 3), WHITE);
    }

    #[test]
    fn test_zero_opacity_is_identity() {
        let base = RasterImage::filled(4, 4, [10, 20, 30, 40]);
        let overlay = RasterImage::filled(4, 4, BLUE);
        let out = blend(base.clone(), &overlay, 0, 0, 0);
        assert_eq!(out, base);
    }

    #[test]
    fn test_half_opacity() {
        let base = RasterImage::filled(1, 1, [0, 0, 0, 255]);
        let overlay = RasterImage::filled(1, 1, WHITE);
        let out = blend(base, &overlay, 0, 0, 50);
        // 255 * 0.5 = 127.5 rounds up
        assert_eq!(out.pixel(0, 0), [128, 128, 128, 255]);
    }

    #[test]
    fn test_rounds_where_imageops_overlay_truncates() {
        let gray = [100, 100, 100, 255];
        let out = blend(
            RasterImage::filled(1, 1, gray),
            &RasterImage::filled(1, 1, WHITE),
            0,
            0,
            50,
        );
        // 100 * 0.5 + 255 * 0.5 = 177.5
        assert_eq!(out.pixel(0, 0), [178, 178, 178, 255]);

        // Opacity folded into the overlay alpha, then composited by `image`
        let mut bottom = image::RgbaImage::from_pixel(1, 1, image::Rgba(gray));
        let half = (255.0 * 0.5) as u8;
        let top = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, half]));
        image::imageops::overlay(&mut bottom, &top, 0, 0);
        assert_eq!(bottom.get_pixel(0, 0).0, [177, 177, 177, 255]);
    }

    #[test]
    fn test_watermark_alpha_scales_opacity() {
        let base = RasterImage::filled(1, 1, [0, 0, 0, 255]);
        let overlay = RasterImage::filled(1, 1, [255, 255, 255, 0]);
        let out = blend(base.clone(), &overlay, 0, 0, 100);
        assert_eq!(out, base);
    }

    #[test]
    fn test_transparent_base_gains_alpha() {
        let base = RasterImage::filled(1, 1, [0, 0, 0, 0]);
        let overlay = RasterImage::filled(1, 1, BLUE);
        let out = blend(base, &overlay, 0, 0, 100);
        assert_eq!(out.pixel(0, 0), BLUE);
    }

    #[test]
    fn test_negative_offset_clips() {
        let base = RasterImage::filled(3, 3, WHITE);
        let overlay = RasterImage::filled(2, 2, BLUE);
        let out = blend(base, &overlay, -1, -1, 100);

        assert_eq!((out.width, out.height), (3, 3));
        assert_eq!(out.pixel(0, 0), BLUE);
        assert_eq!(out.pixel(1, 0), WHITE);
        assert_eq!(out.pixel(0, 1), WHITE);
    }

    #[test]
    fn test_overhang_clips_without_growing() {
        let base = RasterImage::filled(3, 3, WHITE);
        let overlay = RasterImage::filled(5, 5, BLUE);
        let out = blend(base, &overlay, 2, 2, 100);

        assert_eq!((out.width, out.height), (3, 3));
        assert_eq!(out.pixel(2, 2), BLUE);
        assert_eq!(out.pixel(1, 2), WHITE);
    }

    #[test]
    fn test_fully_outside_is_identity() {
        let base = RasterImage::filled(3, 3, WHITE);
        let overlay = RasterImage::filled(2, 2, BLUE);
        let offsets = [
            (3, 0),
            (0, 3),
            (-2, 0),
            (0, -2),
            (i64::MAX, 0),
            (i64::MIN, i64::MIN),
        ];
        for (x, y) in offsets {
            assert_eq!(
                blend(base.clone(), &overlay, x, y, 100),
                base,
                "offset {} {}",
                x,
                y
            );
        }
    }

    #[test]
    fn test_visible_span() {
        assert_eq!(visible_span(0, 2, 3), Some((0, 2)));
        assert_eq!(visible_span(-1, 2, 3), Some((1, 2)));
        assert_eq!(visible_span(2, 5, 3), Some((0, 1)));
        assert_eq!(visible_span(3, 2, 3), None);
        assert_eq!(visible_span(-2, 2, 3), None);
    }

    #[test]
    fn test_composite_decodes_bytes() {
        let base = RasterImage::filled(4, 4, WHITE);
        let bytes = png_bytes(&RasterImage::filled(1, 1, BLUE));
        let out = composite(base, &bytes, 3, 0, 100, &DecodeOptions::default()).unwrap();
        assert_eq!(out.pixel(3, 0), BLUE);
    }

    #[test]
    fn test_composite_undecodable_bytes() {
        let base = RasterImage::filled(4, 4, WHITE);
        let err =
            composite(base, b"not an image", 0, 0, 100, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, WatermarkError::Decode(_)));
    }

    #[test]
    fn test_apply_watermark_uses_fetcher() {
        let bytes = png_bytes(&RasterImage::filled(1, 1, BLUE));
        let fetcher = move |url: &str| -> Result<Vec<u8>, FetchError> {
            assert_eq!(url, "https://cdn.example.com/logo.png");
            Ok(bytes.clone())
        };
        let spec = WatermarkSpec {
            url: "https://cdn.example.com/logo.png".to_string(),
            x: 0,
            y: 0,
            opacity: 100,
        };
        let out = apply_watermark(
            RasterImage::filled(2, 2, WHITE),
            &spec,
            &fetcher,
            &DecodeOptions::default(),
        )
        .unwrap();
        assert_eq!(out.pixel(0, 0), BLUE);
        assert_eq!(out.pixel(1, 1), WHITE);
    }

    #[test]
    fn test_apply_watermark_fetch_failure() {
        let fetcher = |_: &str| -> Result<Vec<u8>, FetchError> { Err(FetchError::Status(404)) };
        let spec = WatermarkSpec {
            url: "https://cdn.example.com/missing.png".to_string(),
            x: 0,
            y: 0,
            opacity: 100,
        };
        let err = apply_watermark(
            RasterImage::filled(2, 2, WHITE),
            &spec,
            &fetcher,
            &DecodeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WatermarkError::Fetch(FetchError::Status(404))
        ));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
