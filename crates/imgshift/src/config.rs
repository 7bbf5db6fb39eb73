//! Service configuration.
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! empty file (or no file) yields a working local setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use imgshift_core::decode::FilterType;
use imgshift_core::{DecodeLimits, DecodeOptions, InterpolationFilter, PipelineConfig};

use crate::error::ConfigError;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Object storage settings
    pub storage: StorageConfig,

    /// Decode ceilings for untrusted input
    pub limits: LimitsConfig,

    /// Watermark fetch policy
    pub fetch: FetchConfig,

    /// Pipeline defaults
    pub pipeline: PipelineSettings,

    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory that holds stored objects.
    pub root_dir: PathBuf,
    /// Public URL prefix objects are served under.
    pub base_url: String,
    /// Key prefix for transformed output.
    pub output_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./storage"),
            base_url: "http://localhost:8080/storage".to_string(),
            output_prefix: "images".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted encoded input, source or watermark.
    pub max_input_bytes: usize,
    /// Largest accepted width or height, including the rotated canvas.
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = DecodeLimits::default();
        Self {
            max_input_bytes: limits.max_input_bytes,
            max_image_dimension: limits.max_dimension,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_bytes: u64,
    /// Permit watermark URLs that resolve to private or loopback addresses.
    pub allow_private_ips: bool,
    /// When set, only these hosts (and their subdomains) may be fetched.
    pub allowed_hosts: Option<Vec<String>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_bytes: 5 * 1024 * 1024,
            allow_private_ips: false,
            allowed_hosts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Quality used when a request omits `compress`.
    pub default_quality: u8,
    /// bilinear or lanczos3
    pub resize_filter: FilterType,
    pub rotation_filter: InterpolationFilter,
    /// Honor the EXIF orientation tag of JPEG input before transforming.
    pub apply_exif_orientation: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_quality: imgshift_core::DEFAULT_QUALITY,
            resize_filter: FilterType::default(),
            rotation_filter: InterpolationFilter::default(),
            apply_exif_orientation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.output_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.output_prefix must not be empty".into(),
            ));
        }
        if self.limits.max_input_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_input_bytes must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.timeout_ms must be > 0".into(),
            ));
        }
        if self.fetch.max_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_bytes must be > 0".into(),
            ));
        }
        if self.pipeline.default_quality > 100 {
            return Err(ConfigError::ValidationError(
                "pipeline.default_quality must be between 0 and 100".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(
                "logging.format must be \"pretty\" or \"json\"".into(),
            ));
        }
        Ok(())
    }

    /// Serialize to TOML, e.g. for `imgshift config show`.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Pipeline settings for the core crate.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            decode: DecodeOptions {
                limits: DecodeLimits {
                    max_input_bytes: self.limits.max_input_bytes,
                    max_dimension: self.limits.max_image_dimension,
                },
                apply_exif_orientation: self.pipeline.apply_exif_orientation,
            },
            resize_filter: self.pipeline.resize_filter,
            rotation_filter: self.pipeline.rotation_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.output_prefix, "images");
        assert_eq!(config.limits.max_input_bytes, 20 * 1024 * 1024);
        assert_eq!(config.limits.max_image_dimension, 10_000);
        assert_eq!(config.fetch.timeout_ms, 10_000);
        assert!(!config.fetch.allow_private_ips);
        assert_eq!(config.pipeline.default_quality, 90);
        assert!(!config.pipeline.apply_exif_orientation);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            allowed_hosts = ["cdn.example.com"]

            [pipeline]
            resize_filter = "lanczos3"
            rotation_filter = "lanczos3"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.fetch.allowed_hosts.as_deref(),
            Some(&["cdn.example.com".to_string()][..])
        );
        assert_eq!(config.fetch.timeout_ms, 10_000);
        assert_eq!(config.pipeline.resize_filter, FilterType::Lanczos3);
        assert_eq!(
            config.pipeline.rotation_filter,
            InterpolationFilter::Lanczos3
        );
        assert_eq!(config.pipeline.default_quality, 90);
    }

    #[test]
    fn test_point_sampled_resize_filter_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [pipeline]
            resize_filter = "nearest"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let mut config = Config::default();
        config.limits.max_image_dimension = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_image_dimension"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_quality_over_100() {
        let mut config = Config::default();
        config.pipeline.default_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let mut config = Config::default();
        config.storage.output_prefix = "/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.storage.output_prefix, "images");
    }

    #[test]
    fn test_pipeline_config_carries_limits() {
        let mut config = Config::default();
        config.limits.max_image_dimension = 512;
        config.pipeline.apply_exif_orientation = true;
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.decode.limits.max_dimension, 512);
        assert!(pipeline.decode.apply_exif_orientation);
        assert_eq!(pipeline.resize_filter, FilterType::Bilinear);
    }
}
