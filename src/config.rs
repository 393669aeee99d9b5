//! Capture configuration module.
//!
//! Handles loading, validating, and merging the TOML config file. Stock
//! defaults are the base layer; the user file overrides only the keys it
//! names.
//!
//! ## Config File Location
//!
//! `shot-capture.toml` in the working directory, or any path passed with
//! `--config`. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [camera]
//! width = 640               # Ideal stream width
//! height = 480              # Ideal stream height
//! jpeg_quality = 90         # Captured frame JPEG quality (1-100)
//! source_dir = "camera"     # Hot folder the tethering software writes into
//!
//! [storage]
//! # directory = "shoot"     # Pre-selected save directory (omit to be asked)
//! downloads_dir = "downloads"
//! fallback = true           # Fall back to downloads when the directory fails
//!
//! [preview]
//! spool = true              # Write previews to files an image viewer can open
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::camera::Constraints;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "shot-capture.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Capture configuration.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub camera: CameraConfig,
    pub storage: StorageConfig,
    pub preview: PreviewConfig,
}

impl CaptureConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Validation(
                "camera.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Validation(
                "camera.width and camera.height must be non-zero".into(),
            ));
        }
        if self.storage.downloads_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.downloads_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub jpeg_quality: u8,
    pub source_dir: PathBuf,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            jpeg_quality: 90,
            source_dir: PathBuf::from("camera"),
        }
    }
}

impl CameraConfig {
    pub fn constraints(&self) -> Constraints {
        Constraints {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Save directory chosen up front. `None` means ask on first save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    pub downloads_dir: PathBuf,
    pub fallback: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: None,
            downloads_dir: PathBuf::from("downloads"),
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub spool: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { spool: true }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(CaptureConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<CaptureConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CaptureConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults if it is absent.
pub fn load_config(path: &Path) -> Result<CaptureConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Shot Capture Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Camera
# ---------------------------------------------------------------------------
[camera]
# Ideal stream size. Frames larger than this are scaled down to fit.
width = 640
height = 480

# JPEG quality for captured frames (1 = worst, 100 = best).
jpeg_quality = 90

# Hot folder your tethering software writes into. Each capture takes the
# newest image found here.
source_dir = "camera"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory accepted shots are saved into. Leave unset to be asked on the
# first save of each session.
# directory = "shoot"

# Where shots go when the save directory can't be used. Existing files are
# never overwritten; a clash becomes "name (1).jpg".
downloads_dir = "downloads"

# Set to false to report directory failures instead of falling back.
fallback = true

# ---------------------------------------------------------------------------
# Preview
# ---------------------------------------------------------------------------
[preview]
# Write each capture to a temporary file so an image viewer can open it.
# Files are removed as soon as the shot is accepted or retaken.
spool = true
"##
}
