//! Transformation requests: the loose wire shape and its validated form.
//!
//! [`Transformations`] mirrors the JSON `transformations` object. Numbers are
//! deserialized wide (`i64`) so out-of-range values reach [`validate`] and
//! produce a field-specific message instead of a generic type error.
//!
//! [`validate`]: Transformations::validate

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encode::OutputFormat;
use crate::error::TransformError;
use crate::filter::ColorFilter;
use crate::transform::{CropRect, ResizeTarget};
use crate::watermark::WatermarkSpec;

/// `transformations.resize`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub width: i64,
    pub height: i64,
}

/// `transformations.crop`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRequest {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// `transformations.filters`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRequest {
    pub grayscale: bool,
    pub sepia: bool,
}

/// `transformations.watermark`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkRequest {
    pub image: String,
    pub x: i64,
    pub y: i64,
    pub opacity: i64,
}

/// The `transformations` object of a request. Absent fields skip their stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transformations {
    #[serde(default)]
    pub resize: Option<ResizeRequest>,
    #[serde(default)]
    pub crop: Option<CropRequest>,
    #[serde(default)]
    pub rotate: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub filters: Option<FilterRequest>,
    #[serde(default)]
    pub compress: Option<i64>,
    #[serde(default)]
    pub watermark: Option<WatermarkRequest>,
}

/// A fully validated request, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub resize: Option<ResizeTarget>,
    pub crop: Option<CropRect>,
    pub rotate: Option<f64>,
    pub filter: ColorFilter,
    pub watermark: Option<WatermarkSpec>,
    pub format: OutputFormat,
    pub quality: u8,
}

impl TransformOptions {
    /// Re-encode only, as JPEG at the given quality.
    pub fn reencode(quality: u8) -> Self {
        Self {
            resize: None,
            crop: None,
            rotate: None,
            filter: ColorFilter::None,
            watermark: None,
            format: OutputFormat::Jpeg,
            quality: quality.min(100),
        }
    }
}

impl Transformations {
    /// Check every field and produce [`TransformOptions`].
    ///
    /// The output format is checked first so an unsupported format is
    /// reported as such even when other fields are also invalid.
    ///
    /// # Errors
    ///
    /// * `TransformError::UnsupportedFormat` for a format other than jpeg, jpg, png or gif
    /// * `TransformError::Validation` for any out-of-range field
    pub fn validate(&self, default_quality: u8) -> Result<TransformOptions, TransformError> {
        let format = match &self.format {
            Some(name) => OutputFormat::from_str(name)?,
            None => OutputFormat::default(),
        };

        let resize = self
            .resize
            .map(|r| {
                Ok::<_, TransformError>(ResizeTarget {
                    width: positive("resize.width", r.width)?,
                    height: positive("resize.height", r.height)?,
                })
            })
            .transpose()?;

        let crop = self
            .crop
            .map(|c| {
                Ok::<_, TransformError>(CropRect {
                    x: non_negative("crop.x", c.x)?,
                    y: non_negative("crop.y", c.y)?,
                    width: positive("crop.width", c.width)?,
                    height: positive("crop.height", c.height)?,
                })
            })
            .transpose()?;

        if let Some(angle) = self.rotate {
            if !angle.is_finite() {
                return Err(invalid("rotate", "must be a finite number"));
            }
        }

        let quality = match self.compress {
            Some(q) => percent("compress", q)?,
            None => default_quality.min(100),
        };

        let watermark = self
            .watermark
            .as_ref()
            .map(|w| -> Result<WatermarkSpec, TransformError> {
                if w.image.trim().is_empty() {
                    return Err(invalid("watermark.image", "must not be empty"));
                }
                Ok(WatermarkSpec {
                    url: w.image.clone(),
                    x: w.x,
                    y: w.y,
                    opacity: percent("watermark.opacity", w.opacity)?,
                })
            })
            .transpose()?;

        let filter = self
            .filters
            .map(|f| ColorFilter::from_flags(f.grayscale, f.sepia))
            .unwrap_or_default();

        Ok(TransformOptions {
            resize,
            crop,
            rotate: self.rotate,
            filter,
            watermark,
            format,
            quality,
        })
    }
}

fn invalid(field: &str, reason: &str) -> TransformError {
    TransformError::Validation(format!("transformations.{} {}", field, reason))
}

fn positive(field: &str, value: i64) -> Result<u32, TransformError> {
    match u32::try_from(value) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(invalid(
            field,
            "must be an integer between 1 and 4294967295",
        )),
    }
}

fn non_negative(field: &str, value: i64) -> Result<u32, TransformError> {
    u32::try_from(value).map_err(|_| {
        invalid(field, "must be an integer between 0 and 4294967295")
    })
}

fn percent(field: &str, value: i64) -> Result<u8, TransformError> {
    match u8::try_from(value) {
        Ok(v) if v <= 100 => Ok(v),
        _ => Err(invalid(field, "must be an integer between 0 and 100")),
    }
}
