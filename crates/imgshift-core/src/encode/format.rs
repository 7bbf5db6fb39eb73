//! Output format selection and quality mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Quality used when a request does not specify `compress`.
pub const DEFAULT_QUALITY: u8 = 90;

/// Encodable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Gif,
}

impl OutputFormat {
    /// File extension used when naming stored output.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        }
    }

    /// MIME type of the encoded output.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TransformError;

    /// Parse a requested format name. Names are exact and lowercase; `jpg`
    /// aliases `jpeg`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "gif" => Ok(OutputFormat::Gif),
            _ => Err(TransformError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
        };
        f.write_str(name)
    }
}

/// Map a 0-100 quality onto a 0-9 zlib compression level.
///
/// Quality is inverted: 100 gives level 0 (fastest, largest) and 0 gives
/// level 9. Halves round away from zero, so quality 50 gives level 5.
pub fn png_compression_level(quality: u8) -> u8 {
    let quality = quality.min(100) as f64;
    ((100.0 - quality) * 9.0 / 100.0).round() as u8
}
