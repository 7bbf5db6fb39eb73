//! Request-scoped error taxonomy.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::transform::{CropError, ResizeError, RotateError};
use crate::watermark::WatermarkError;

/// Any failure that ends a transformation request.
///
/// No variant is retried; the first one raised aborts the pipeline.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A request field is malformed or out of range.
    #[error("{0}")]
    Validation(String),

    /// The requested output format cannot be produced.
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("The image could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    #[error("The image could not be cropped: {0}")]
    Crop(#[from] CropError),

    #[error("Could not rotate image: {0}")]
    Rotate(#[from] RotateError),

    #[error("Could not apply watermark: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("The image could not be encoded: {0}")]
    Encode(#[from] EncodeError),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before decoding.
    Validation,
    /// Rejected before decoding; the format is well-formed but not offered.
    UnsupportedFormat,
    /// A pipeline stage failed.
    Processing,
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::Validation(_) => ErrorKind::Validation,
            TransformError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            TransformError::Decode(_)
            | TransformError::Crop(_)
            | TransformError::Rotate(_)
            | TransformError::Watermark(_)
            | TransformError::Encode(_) => ErrorKind::Processing,
        }
    }

    /// Name of the pipeline stage that raised the error, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            TransformError::Validation(_) | TransformError::UnsupportedFormat(_) => None,
            TransformError::Decode(_) => Some("decode"),
            TransformError::Crop(_) => Some("crop"),
            TransformError::Rotate(_) => Some("rotate"),
            TransformError::Watermark(_) => Some("watermark"),
            TransformError::Encode(_) => Some("encode"),
        }
    }
}

// A resize that collapses to zero pixels is a bad request, not a processing fault
impl From<ResizeError> for TransformError {
    fn from(err: ResizeError) -> Self {
        TransformError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            TransformError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            TransformError::UnsupportedFormat("bmp".into()).kind(),
            ErrorKind::UnsupportedFormat
        );
        assert_eq!(
            TransformError::from(DecodeError::Empty).kind(),
            ErrorKind::Processing
        );
        assert_eq!(
            TransformError::from(RotateError::NonFiniteAngle(f64::NAN)).kind(),
            ErrorKind::Processing
        );
    }

    #[test]
    fn test_resize_error_is_validation() {
        let err = TransformError::from(ResizeError::DegenerateOutput {
            requested_width: 1,
            requested_height: 1,
            width: 1,
            height: 0,
        });
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_stage_names() {
        let err = TransformError::from(CropError::EmptyRegion {
            width: 0,
            height: 0,
        });
        assert_eq!(err.stage(), Some("crop"));
        let message = err.to_string();
        assert!(message.starts_with("The image could not be cropped"));
    }
}
