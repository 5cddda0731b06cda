//! Error types for sensor lifecycle and configuration.
//!
//! Errors raised by a sensor backend never reach the render loop: the
//! [`DeviceManager`](crate::DeviceManager) catches them at the point of
//! occurrence, logs them, and degrades to "no active sensor". They are still
//! typed so that backends and configuration loading can report precise causes.
//!
//! ## Error Categories
//!
//! - **Device Errors**: a sensor is busy, unavailable, or in an invalid state
//! - **Lookup Errors**: a device id does not exist in a registry
//! - **Configuration Errors**: YAML parse failures and file access problems
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use motionlink::SensorError;
//!
//! let error = SensorError::device_busy("sensor-0", "in use by another process");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sensor operations.
pub type Result<T, E = SensorError> = std::result::Result<T, E>;

/// Main error type for sensor operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SensorError {
    #[error("Sensor {device} is busy or unavailable: {reason}")]
    DeviceBusy { device: String, reason: String },

    #[error("Invalid operation '{operation}' on sensor {device}: {reason}")]
    InvalidOperation { device: String, operation: String, reason: String },

    #[error("Sensor {device} not found")]
    DeviceNotFound { device: String },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SensorError {
    /// Returns whether a later attempt may succeed without user intervention.
    ///
    /// Device errors clear up once the sensor changes state, which the
    /// registry reports through a status-change event.
    pub fn is_retryable(&self) -> bool {
        match self {
            SensorError::DeviceBusy { .. } => true,
            SensorError::InvalidOperation { .. } => true,
            SensorError::DeviceNotFound { .. } => false,
            SensorError::Config { .. } => false,
            SensorError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SensorError::DeviceBusy { .. } => vec![
                "Close other applications using the sensor",
                "Unplug and reconnect the sensor",
                "Check the USB controller has enough bandwidth",
            ],
            SensorError::InvalidOperation { .. } => vec![
                "Check the sensor is still plugged in",
                "Wait for the sensor to finish initializing",
                "Verify the sensor has external power",
            ],
            SensorError::DeviceNotFound { .. } => vec![
                "Check the device id spelling",
                "List attached sensors before addressing one",
            ],
            SensorError::Config { .. } => vec![
                "Check the YAML syntax",
                "Verify format names against the supported presets",
                "Remove unknown keys from the configuration",
            ],
            SensorError::File { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for a sensor that cannot be started.
    pub fn device_busy(device: impl Into<String>, reason: impl Into<String>) -> Self {
        SensorError::DeviceBusy { device: device.into(), reason: reason.into() }
    }

    /// Helper constructor for an operation rejected by the device state.
    pub fn invalid_operation(
        device: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SensorError::InvalidOperation {
            device: device.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Helper constructor for unknown device ids.
    pub fn device_not_found(device: impl Into<String>) -> Self {
        SensorError::DeviceNotFound { device: device.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        SensorError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        SensorError::File { path, source }
    }
}

impl From<std::io::Error> for SensorError {
    fn from(err: std::io::Error) -> Self {
        SensorError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for SensorError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        let context = match err.location() {
            Some(location) => format!("line {}, column {}", location.line(), location.column()),
            None => "configuration".to_string(),
        };
        SensorError::Config { context, details: err.to_string() }
    }
}
