//! Device lifecycle and skeleton overlay for motion-sensing cameras.
//!
//! motionlink sits between a depth/skeleton camera and a game's render loop.
//! It keeps exactly one sensor active, recovers from hot-plug events, and
//! turns the sensor's skeleton frames into bone and joint sprites.
//!
//! # Features
//!
//! - **Hot-plug recovery**: every registry status change tears down, records
//!   and rediscovers; no polling
//! - **Bounded hand-off**: one skeleton buffer, paced by the renderer; frames
//!   arriving before the previous one was drawn are dropped
//! - **Backend agnostic**: written against the [`Sensor`] and
//!   [`SensorRegistry`] traits, with an in-process [`simulated`] backend
//! - **Headless rendering**: a software [`Surface`](render::Surface) and a
//!   recording sprite batch for tools and tests
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use motionlink::render::{HeadlessGraphics, RecordingBatch};
//! use motionlink::simulated::{SimulatedRegistry, SimulatedSensor};
//! use motionlink::{DeviceManager, SensorConfig, SensorStatus, SkeletonResources};
//!
//! let registry = Arc::new(SimulatedRegistry::new());
//! registry.attach(Arc::new(SimulatedSensor::new("sensor-0")));
//!
//! let graphics = Arc::new(HeadlessGraphics { width: 640, height: 480 });
//! let devices = DeviceManager::new(registry.clone(), SensorConfig::default(), SkeletonResources::new(graphics));
//! assert_eq!(devices.last_status(), SensorStatus::Connected);
//!
//! // Once per game frame
//! let mut batch = RecordingBatch::new();
//! devices.render_stream_managers();
//! devices.draw_stream_managers(&mut batch);
//! devices.draw_status_message(&mut batch);
//!
//! registry.detach("sensor-0").unwrap();
//! assert_eq!(devices.status_message(), "Disconnected/Device required!");
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Backend seam and the in-process backend
pub mod driver;
pub mod sensor;
pub mod simulated;

// Lifecycle and rendering
pub mod device;
pub mod render;
pub mod streams;

// Core exports
pub use config::{OverlayConfig, SensorConfig};
pub use device::{ActiveSensor, DeviceManager, SkeletonResources};
pub use error::*;
pub use sensor::{Sensor, SensorRegistry, StatusChange, SubscriptionId};
pub use streams::{SkeletonStreamManager, StreamManager};
pub use types::*;
