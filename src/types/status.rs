//! Sensor connection status and its human-readable messages

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Connection status reported by a sensor or by the registry watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    /// Status code not recognized by the SDK
    #[default]
    Undefined,
    /// No sensor attached
    Disconnected,
    /// Attached, powered and ready for streaming
    Connected,
    /// Attached and still booting
    Initializing,
    /// The device reported a hardware error
    Error,
    /// Attached over USB but without external power
    NotPowered,
    /// Attached but not ready for streaming yet
    NotReady,
    /// Not a genuine device
    DeviceNotGenuine,
    /// A device model the SDK does not support
    DeviceNotSupported,
    /// The USB controller cannot carry the requested streams
    InsufficientBandwidth,
}

impl SensorStatus {
    /// Every status value, in declaration order.
    pub const ALL: [SensorStatus; 10] = [
        SensorStatus::Undefined,
        SensorStatus::Disconnected,
        SensorStatus::Connected,
        SensorStatus::Initializing,
        SensorStatus::Error,
        SensorStatus::NotPowered,
        SensorStatus::NotReady,
        SensorStatus::DeviceNotGenuine,
        SensorStatus::DeviceNotSupported,
        SensorStatus::InsufficientBandwidth,
    ];

    /// Whether the sensor can be configured and started.
    pub fn is_connected(self) -> bool {
        self == SensorStatus::Connected
    }

    /// Standard human-readable message for this status.
    pub fn message(self) -> &'static str {
        match self {
            SensorStatus::Undefined => StatusMessageTable::FALLBACK_MESSAGE,
            SensorStatus::Connected => "",
            SensorStatus::DeviceNotGenuine => "Detected device is not genuine!",
            SensorStatus::DeviceNotSupported => "Detected device is not supported!",
            SensorStatus::Disconnected => "Disconnected/Device required!",
            SensorStatus::Error => "Error in Kinect sensor!",
            SensorStatus::Initializing => "Initialising Kinect sensor...",
            SensorStatus::InsufficientBandwidth => "Insufficient bandwidth for Kinect sensor!",
            SensorStatus::NotPowered => "Detected device is not powered!",
            SensorStatus::NotReady => "Detected device is not ready!",
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Mapping from [`SensorStatus`] to the text shown in the status overlay.
///
/// Immutable once built. Statuses without an entry resolve to
/// [`StatusMessageTable::FALLBACK_MESSAGE`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessageTable {
    messages: HashMap<SensorStatus, String>,
}

impl StatusMessageTable {
    /// Message shown for undefined or unmapped statuses.
    pub const FALLBACK_MESSAGE: &'static str = "UNKNOWN STATUS MESSAGE";

    /// Process-wide table holding the standard messages.
    pub fn standard() -> &'static StatusMessageTable {
        static STANDARD: OnceLock<StatusMessageTable> = OnceLock::new();
        STANDARD.get_or_init(StatusMessageTable::default)
    }

    /// Standard table with some messages replaced.
    pub fn with_overrides(overrides: &HashMap<SensorStatus, String>) -> Self {
        let mut table = Self::default();
        for (status, message) in overrides {
            table.messages.insert(*status, message.clone());
        }
        table
    }

    /// Table holding exactly the given entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (SensorStatus, String)>,
    {
        Self { messages: entries.into_iter().collect() }
    }

    /// Message for `status`, or the fallback when it is not mapped.
    pub fn message(&self, status: SensorStatus) -> &str {
        self.messages.get(&status).map(String::as_str).unwrap_or(Self::FALLBACK_MESSAGE)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for StatusMessageTable {
    fn default() -> Self {
        Self::from_entries(
            SensorStatus::ALL.iter().map(|status| (*status, status.message().to_string())),
        )
    }
}
