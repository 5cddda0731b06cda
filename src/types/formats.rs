//! Sub-stream kinds and image format presets

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the independent data feeds a sensor can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Color,
    Depth,
    Skeleton,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [StreamKind::Color, StreamKind::Depth, StreamKind::Skeleton];
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Color => "color",
            StreamKind::Depth => "depth",
            StreamKind::Skeleton => "skeleton",
        };
        f.write_str(name)
    }
}

/// Request to enable a sub-stream, carrying its format where one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRequest {
    Skeleton,
    Color(ColorImageFormat),
    Depth(DepthImageFormat),
}

impl StreamRequest {
    pub fn kind(self) -> StreamKind {
        match self {
            StreamRequest::Skeleton => StreamKind::Skeleton,
            StreamRequest::Color(_) => StreamKind::Color,
            StreamRequest::Depth(_) => StreamKind::Depth,
        }
    }
}

/// Color stream presets (encoding, resolution and frame rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorImageFormat {
    #[default]
    RgbResolution640x480Fps30,
    RgbResolution1280x960Fps12,
    YuvResolution640x480Fps15,
    RawYuvResolution640x480Fps15,
    InfraredResolution640x480Fps30,
    RawBayerResolution640x480Fps30,
    RawBayerResolution1280x960Fps12,
}

impl ColorImageFormat {
    /// Frame size in pixels as `(width, height)`.
    pub fn resolution(self) -> (u32, u32) {
        match self {
            ColorImageFormat::RgbResolution1280x960Fps12
            | ColorImageFormat::RawBayerResolution1280x960Fps12 => (1280, 960),
            _ => (640, 480),
        }
    }

    /// Nominal frame rate in Hz.
    pub fn fps(self) -> u32 {
        match self {
            ColorImageFormat::RgbResolution1280x960Fps12
            | ColorImageFormat::RawBayerResolution1280x960Fps12 => 12,
            ColorImageFormat::YuvResolution640x480Fps15
            | ColorImageFormat::RawYuvResolution640x480Fps15 => 15,
            _ => 30,
        }
    }
}

/// Depth stream presets. The depth resolution defines the pixel space that
/// skeleton points are mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthImageFormat {
    #[default]
    Resolution640x480Fps30,
    Resolution320x240Fps30,
    Resolution80x60Fps30,
}

impl DepthImageFormat {
    /// Frame size in pixels as `(width, height)`.
    pub fn resolution(self) -> (u32, u32) {
        match self {
            DepthImageFormat::Resolution640x480Fps30 => (640, 480),
            DepthImageFormat::Resolution320x240Fps30 => (320, 240),
            DepthImageFormat::Resolution80x60Fps30 => (80, 60),
        }
    }

    pub fn width(self) -> u32 {
        self.resolution().0
    }

    pub fn height(self) -> u32 {
        self.resolution().1
    }
}
