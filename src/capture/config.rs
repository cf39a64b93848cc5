//! Capture and compositing configuration.
//!
//! Every section has working defaults so an empty file (or no file at
//! all) yields the canonical behaviour: rear camera, 1920x1080 hint,
//! PNG output, overlay at 70% width on narrow viewports and 40% on wide.

use super::CameraFacing;
use crate::compose::{CaptureFormat, OverlaySizing};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for stream acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Preferred width passed as a hint with every request.
    pub ideal_width: u32,
    /// Preferred height passed as a hint with every request.
    pub ideal_height: u32,
    /// Facing mode used on startup.
    pub initial_facing: CameraFacing,
    /// Device index used for the rear camera (native backend only).
    pub rear_device: u32,
    /// Device index used for the front camera (native backend only).
    pub front_device: u32,
    /// Acquisition timeout in milliseconds (0 waits forever).
    pub acquire_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ideal_width: 1920,
            ideal_height: 1080,
            initial_facing: CameraFacing::Rear,
            rear_device: 0,
            front_device: 1,
            acquire_timeout_ms: 0,
        }
    }
}

impl CaptureConfig {
    /// Acquisition timeout, if one is configured.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        (self.acquire_timeout_ms > 0).then(|| Duration::from_millis(self.acquire_timeout_ms))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        Ok(())
    }
}

/// Compositor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Overlay side as a fraction of output width on narrow viewports.
    pub narrow_fraction: f64,
    /// Overlay side as a fraction of output width on wide viewports.
    pub wide_fraction: f64,
    /// Viewports this wide or narrower use `narrow_fraction`.
    pub narrow_breakpoint: u32,
    /// Encoded output format.
    pub format: CaptureFormat,
    /// JPEG quality (1-100), ignored for PNG.
    pub jpeg_quality: u8,
    /// Overlay asset load timeout in milliseconds (0 waits forever).
    pub overlay_load_timeout_ms: u64,
    /// Directory overlay URIs are resolved against.
    pub asset_root: PathBuf,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            narrow_fraction: 0.7,
            wide_fraction: 0.4,
            narrow_breakpoint: 768,
            format: CaptureFormat::Png,
            jpeg_quality: 100,
            overlay_load_timeout_ms: 0,
            asset_root: PathBuf::from("."),
        }
    }
}

impl CompositorConfig {
    /// Overlay sizing policy built from the configured fractions.
    pub fn sizing(&self) -> OverlaySizing {
        OverlaySizing {
            narrow_fraction: self.narrow_fraction,
            wide_fraction: self.wide_fraction,
        }
    }

    /// Overlay load timeout, if one is configured.
    pub fn overlay_load_timeout(&self) -> Option<Duration> {
        (self.overlay_load_timeout_ms > 0)
            .then(|| Duration::from_millis(self.overlay_load_timeout_ms))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for fraction in [self.narrow_fraction, self.wide_fraction] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ConfigError::InvalidFraction(fraction));
            }
        }
        if self.narrow_fraction == self.wide_fraction {
            return Err(ConfigError::IndistinctFractions);
        }
        if self.narrow_breakpoint == 0 {
            return Err(ConfigError::InvalidBreakpoint);
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

/// Where downloads are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Target directory for downloaded captures.
    pub directory: PathBuf,
    /// File name stem; the extension follows the capture format.
    pub file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_stem: "captured_image".to_string(),
        }
    }
}

/// Metrics exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Port the metrics server listens on.
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

/// An entry in the overlay picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayEntry {
    /// Label shown in the picker.
    pub name: String,
    /// Asset URI handed to the loader.
    pub uri: String,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid resolution hint")]
    InvalidDimensions,
    #[error("overlay fraction {0} must be in (0, 1]")]
    InvalidFraction(f64),
    #[error("narrow and wide overlay fractions must differ")]
    IndistinctFractions,
    #[error("narrow breakpoint must be positive")]
    InvalidBreakpoint,
    #[error("jpeg quality {0} must be in 1-100")]
    InvalidQuality(u8),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub compositor: CompositorConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub overlays: Vec<OverlayEntry>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.compositor.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.initial_facing, CameraFacing::Rear);
        assert!(config.capture.acquire_timeout().is_none());
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.ideal_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_fractions_must_differ() {
        let config = CompositorConfig {
            narrow_fraction: 0.5,
            wide_fraction: 0.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IndistinctFractions)
        ));
    }

    #[test]
    fn test_fraction_out_of_range() {
        let config = CompositorConfig {
            wide_fraction: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFraction(_))
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            initial_facing = "front"
            acquire_timeout_ms = 2500

            [compositor]
            format = "jpeg"
            narrow_fraction = 0.8

            [[overlays]]
            name = "Smile"
            uri = "smile.png"
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.initial_facing, CameraFacing::Front);
        assert_eq!(config.capture.ideal_width, 1920);
        assert_eq!(
            config.capture.acquire_timeout(),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(config.compositor.format, CaptureFormat::Jpeg);
        assert_eq!(config.compositor.sizing().narrow_fraction, 0.8);
        assert_eq!(config.compositor.wide_fraction, 0.4);
        assert_eq!(config.overlays.len(), 1);
        assert_eq!(config.export.file_stem, "captured_image");
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(
            FileConfig::from_toml("[compositor]\njpeg_quality = 0"),
            Err(ConfigError::InvalidQuality(0))
        ));
        assert!(matches!(
            FileConfig::from_toml("capture = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
