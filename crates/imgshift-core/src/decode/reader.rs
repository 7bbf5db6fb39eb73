//! Byte stream decoding with format sniffing, resource limits and optional
//! EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{DecodeError, DecodeLimits, Orientation, RasterImage};

/// Options controlling [`decode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Ceilings for input size and decoded dimensions.
    pub limits: DecodeLimits,
    /// Rotate/flip JPEG input according to its EXIF orientation tag.
    pub apply_exif_orientation: bool,
}

/// Decode JPEG, PNG or GIF bytes into an RGBA raster.
///
/// The container format is detected from the magic bytes, not from a file
/// extension. Animated GIFs decode to their first frame.
///
/// # Errors
///
/// * `DecodeError::Empty` for an empty slice
/// * `DecodeError::LimitExceeded` if the input or its dimensions exceed `options.limits`
/// * `DecodeError::InvalidFormat` if the format is not JPEG, PNG or GIF
/// * `DecodeError::CorruptedFile` if the data cannot be decoded
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<RasterImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() > options.limits.max_input_bytes {
        return Err(DecodeError::LimitExceeded(format!(
            "{} bytes > {} bytes",
            bytes.len(),
            options.limits.max_input_bytes
        )));
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let format = reader.format().ok_or(DecodeError::InvalidFormat)?;
    if !matches!(
        format,
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif
    ) {
        return Err(DecodeError::InvalidFormat);
    }

    let mut limits = image::Limits::default();
    limits.max_image_width = Some(options.limits.max_dimension);
    limits.max_image_height = Some(options.limits.max_dimension);
    limits.max_alloc = Some(options.limits.max_alloc());
    reader.limits(limits);

    let img = reader.decode().map_err(|e| match e {
        image::ImageError::Limits(limit) => DecodeError::LimitExceeded(limit.to_string()),
        other => DecodeError::CorruptedFile(other.to_string()),
    })?;

    let img = if options.apply_exif_orientation && format == ImageFormat::Jpeg {
        apply_orientation(img, get_orientation(bytes))
    } else {
        img
    };

    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::CorruptedFile(
            "image has no pixels".to_string(),
        ));
    }

    Ok(RasterImage::from_rgba_image(img.into_rgba8()))
}

/// Extract the EXIF orientation from encoded bytes.
///
/// Anything without a readable tag is upright.
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from_exif)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Upright => img,
        Orientation::Mirrored => img.fliph(),
        Orientation::UpsideDown => img.rotate180(),
        Orientation::MirroredUpsideDown => img.flipv(),
        Orientation::Transposed => img.rotate90().fliph(),
        Orientation::TurnedLeft => img.rotate90(),
        Orientation::Transversed => img.rotate270().fliph(),
        Orientation::TurnedRight => img.rotate270(),
    }
}
