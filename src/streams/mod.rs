//! Stream managers: per-stream consumers that live as long as a sensor runs
//!
//! The [`DeviceManager`](crate::DeviceManager) builds its stream managers each
//! time a sensor starts and closes them before the sensor is stopped or
//! replaced. The skeleton manager is built in; hosts add their own (a color
//! visualizer, for instance) through [`StreamManagerFactory`].

pub mod skeleton;

use std::sync::Arc;

use crate::config::SensorConfig;
use crate::device::ActiveSensor;
use crate::render::{GraphicsDevice, SpriteBatch};
use crate::sensor::Sensor;

pub use skeleton::{BONES, FrameStats, SkeletonStreamManager, SkeletonTextures, skeleton_to_point};

/// Consumer of one sensor sub-stream.
pub trait StreamManager: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Off-screen pre-pass, run before the frame's main sprite batch.
    fn render_offscreen(&self) {}

    /// Draw the stream's visualization.
    fn draw(&self, batch: &mut dyn SpriteBatch);

    /// Unsubscribe from the sensor. Must be idempotent.
    fn close(&self);
}

/// Everything a factory may need to bind a stream manager to a started sensor.
pub struct StreamContext<'a> {
    pub sensor: &'a Arc<dyn Sensor>,
    pub active: &'a ActiveSensor,
    pub graphics: &'a dyn GraphicsDevice,
    pub config: &'a SensorConfig,
}

/// Builds a host-defined stream manager for a freshly started sensor.
pub type StreamManagerFactory =
    Box<dyn Fn(&StreamContext<'_>) -> Arc<dyn StreamManager> + Send + Sync>;
