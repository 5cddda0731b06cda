//! Construction-time configuration
//!
//! ```rust
//! use motionlink::config::SensorConfig;
//! use motionlink::types::DepthImageFormat;
//!
//! let config = SensorConfig::from_yaml_str(
//!     "depth_format: resolution320x240_fps30\noverlay:\n  status_position: { x: 10, y: 10 }\n",
//! )
//! .unwrap();
//! assert_eq!(config.depth_format, DepthImageFormat::Resolution320x240Fps30);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::types::{
    ColorImageFormat, DepthImageFormat, Rect, SensorStatus, StatusMessageTable, Vector2,
};
use crate::{Result, SensorError};

/// Sensor stream formats plus overlay placement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// Format requested when enabling the color stream
    pub color_format: ColorImageFormat,
    /// Format requested when enabling the depth stream; also the pixel space
    /// skeleton joints are projected into
    pub depth_format: DepthImageFormat,
    pub overlay: OverlayConfig,
}

/// Where and what the overlay draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Top-left corner of the status message
    pub status_position: Vector2,
    /// Destination of the skeleton surface; the whole back buffer when unset
    pub skeleton_rect: Option<Rect>,
    /// Replacements for the standard status messages
    pub status_messages: HashMap<SensorStatus, String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            status_position: Vector2::new(4.0, 2.0),
            skeleton_rect: None,
            status_messages: HashMap::new(),
        }
    }
}

impl OverlayConfig {
    /// Message table with this overlay's overrides applied.
    pub fn message_table(&self) -> StatusMessageTable {
        StatusMessageTable::with_overrides(&self.status_messages)
    }
}

impl SensorConfig {
    pub fn new(color_format: ColorImageFormat, depth_format: DepthImageFormat) -> Self {
        Self { color_format, depth_format, overlay: OverlayConfig::default() }
    }

    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SensorConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| SensorError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!(path = %path.display(), ?config, "Loaded sensor configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.overlay.skeleton_rect {
            Some(rect) if rect.is_empty() => Err(SensorError::config_error(
                "overlay.skeleton_rect",
                format!("rectangle {}x{} has no area", rect.width, rect.height),
            )),
            _ => Ok(()),
        }
    }
}
