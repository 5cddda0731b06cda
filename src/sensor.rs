//! Traits for sensor backends
//!
//! A backend supplies two objects: a [`SensorRegistry`] that lists attached
//! devices and raises status-change notifications, and one [`Sensor`] per
//! device. Everything above this module (lifecycle management, skeleton
//! projection, rendering) is written against these traits only.
//!
//! Handlers are invoked on a thread owned by the backend. They must return
//! quickly and must not block on the render thread.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Result;
use crate::types::{
    DepthImageFormat, DepthImagePoint, SensorStatus, SkeletonFrame, SkeletonPoint, StreamKind,
    StreamRequest,
};

/// Callback receiving each skeleton frame produced by a sensor.
pub type SkeletonFrameHandler = Arc<dyn Fn(&SkeletonFrame) + Send + Sync>;

/// Callback receiving registry status changes.
pub type StatusHandler = Arc<dyn Fn(&StatusChange) + Send + Sync>;

/// Token returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SubscriptionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Status-change notification for one device.
#[derive(Clone)]
pub struct StatusChange {
    pub sensor: Arc<dyn Sensor>,
    pub status: SensorStatus,
}

impl fmt::Debug for StatusChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChange")
            .field("sensor", &self.sensor.id())
            .field("status", &self.status)
            .finish()
    }
}

/// One physical motion-sensing device.
///
/// Methods take `&self`: a device handle is shared between the registry that
/// enumerates it and the manager that drives it, so implementations keep
/// their state behind interior mutability.
pub trait Sensor: Send + Sync {
    /// Stable identifier of the device (e.g. its USB path).
    fn id(&self) -> &str;

    /// Current connection status.
    fn status(&self) -> SensorStatus;

    /// Whether the device is started and streaming.
    fn is_running(&self) -> bool;

    /// Enable a sub-stream.
    ///
    /// Returns [`SensorError::InvalidOperation`](crate::SensorError::InvalidOperation)
    /// when the device state does not allow it (e.g. it was unplugged).
    fn enable_stream(&self, request: StreamRequest) -> Result<()>;

    /// Disable a sub-stream. Disabling a disabled stream does nothing.
    fn disable_stream(&self, kind: StreamKind);

    fn is_stream_enabled(&self, kind: StreamKind) -> bool;

    /// Format of the enabled depth stream, `None` when it is disabled.
    fn depth_format(&self) -> Option<DepthImageFormat>;

    /// Start streaming with the enabled sub-streams.
    ///
    /// Returns [`SensorError::DeviceBusy`](crate::SensorError::DeviceBusy)
    /// when the device is in use or otherwise unavailable.
    fn start(&self) -> Result<()>;

    /// Stop streaming. Stopping a stopped device does nothing.
    fn stop(&self);

    /// Map a skeleton-space point into depth-image pixels using the device
    /// calibration.
    fn map_skeleton_point_to_depth(
        &self,
        point: SkeletonPoint,
        format: DepthImageFormat,
    ) -> DepthImagePoint;

    /// Register a frame-ready handler.
    fn subscribe_skeleton_frames(&self, handler: SkeletonFrameHandler) -> SubscriptionId;

    /// Remove a frame-ready handler. No new invocation starts after this
    /// returns; one already in flight may still complete.
    fn unsubscribe_skeleton_frames(&self, id: SubscriptionId);
}

/// Process-wide list of attached sensors.
pub trait SensorRegistry: Send + Sync {
    /// Attached sensors in enumeration order.
    fn sensors(&self) -> Vec<Arc<dyn Sensor>>;

    /// Register a status-change listener.
    fn subscribe_status(&self, handler: StatusHandler) -> SubscriptionId;

    /// Remove a status-change listener. No new invocation starts after this
    /// returns.
    fn unsubscribe_status(&self, id: SubscriptionId);
}
