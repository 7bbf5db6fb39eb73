//! Pipeline orchestration.
//!
//! Stages run strictly in this order, each skipped when its option is absent:
//!
//! ```text
//! Decode → Resize → Crop → Rotate → Filter → Watermark → Encode
//! ```
//!
//! Exactly one [`RasterImage`] is live at a time (plus the decoded watermark
//! while compositing). Every stage consumes the previous image, so an early
//! `?` return drops whatever buffer was current and nothing partial is
//! encoded.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::decode::{decode, DecodeOptions, FilterType, RasterImage};
use crate::encode::{encode, OutputFormat};
use crate::error::TransformError;
use crate::options::TransformOptions;
use crate::transform::{
    compute_rotated_bounds, crop, resize, rotate, InterpolationFilter, RotateError,
};
use crate::watermark::{apply_watermark, WatermarkFetcher};

/// Tunables shared by every request a [`Pipeline`] runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Limits and orientation handling for both the source and the watermark.
    pub decode: DecodeOptions,
    /// Resampling filter for the resize stage.
    pub resize_filter: FilterType,
    /// Interpolation for rotations that are not multiples of 90°.
    pub rotation_filter: InterpolationFilter,
}

/// Encoded result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub bytes: Vec<u8>,
    /// `transformed_<stem>.<ext>`
    pub file_name: String,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl PipelineOutput {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }
}

/// Runs validated transformation requests.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode `bytes`, apply `options` and encode the result.
    ///
    /// `source_name` is the stored path (or file name) of the original and
    /// only feeds the output name. `fetcher` is called only when a watermark
    /// is requested.
    ///
    /// # Errors
    ///
    /// The first stage failure, as a [`TransformError`]. No later stage runs.
    pub fn run(
        &self,
        source_name: &str,
        bytes: &[u8],
        options: &TransformOptions,
        fetcher: &dyn WatermarkFetcher,
    ) -> Result<PipelineOutput, TransformError> {
        let started = Instant::now();

        let result = self.render(bytes, options, fetcher).and_then(|image| {
            let encoded = encode(&image, options.format, options.quality)?;
            debug!(
                stage = "encode",
                format = %options.format,
                quality = options.quality,
                bytes = encoded.len(),
                "stage complete"
            );
            Ok(PipelineOutput {
                bytes: encoded,
                file_name: transformed_name(source_name, options.format),
                format: options.format,
                width: image.width,
                height: image.height,
            })
        });

        match &result {
            Ok(output) => info!(
                source = source_name,
                output = %output.file_name,
                width = output.width,
                height = output.height,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "image transformed"
            ),
            Err(e) => warn!(
                source = source_name,
                stage = e.stage().unwrap_or("validate"),
                error = %e,
                "transformation failed"
            ),
        }

        result
    }

    fn render(
        &self,
        bytes: &[u8],
        options: &TransformOptions,
        fetcher: &dyn WatermarkFetcher,
    ) -> Result<RasterImage, TransformError> {
        let mut image = decode(bytes, &self.config.decode)?;
        stage_complete("decode", &image);

        if let Some(target) = options.resize {
            image = resize(image, target, self.config.resize_filter)?;
            stage_complete("resize", &image);
        }

        if let Some(rect) = options.crop {
            image = crop(image, rect)?;
            stage_complete("crop", &image);
        }

        if let Some(angle) = options.rotate {
            self.check_canvas(&image, angle)?;
            image = rotate(image, angle, self.config.rotation_filter)?;
            stage_complete("rotate", &image);
        }

        image = options.filter.apply(image);
        stage_complete("filter", &image);

        if let Some(spec) = &options.watermark {
            image = apply_watermark(image, spec, fetcher, &self.config.decode)?;
            stage_complete("watermark", &image);
        }

        Ok(image)
    }

    /// The rotated canvas is held to the same dimension ceiling as decoded input.
    fn check_canvas(&self, image: &RasterImage, angle: f64) -> Result<(), RotateError> {
        if !angle.is_finite() {
            return Err(RotateError::NonFiniteAngle(angle));
        }
        let max = self.config.decode.limits.max_dimension;
        let (w, h) = compute_rotated_bounds(image.width, image.height, angle);
        if w > max || h > max {
            return Err(RotateError::CanvasTooLarge {
                width: w as u64,
                height: h as u64,
                max,
            });
        }
        Ok(())
    }
}

fn stage_complete(stage: &'static str, image: &RasterImage) {
    debug!(
        stage,
        width = image.width,
        height = image.height,
        "stage complete"
    );
}

/// Name for the stored output: `transformed_<stem>.<ext>`.
///
/// The stem is the last path component without its extension, so
/// `images/cat.photo.png` becomes `transformed_cat.photo.jpg` for JPEG.
pub fn transformed_name(source_path: &str, format: OutputFormat) -> String {
    let stem = Path::new(source_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");
    format!("transformed_{}.{}", stem, format.extension())
}
