//! In-process sensor backend
//!
//! [`SimulatedRegistry`] and [`SimulatedSensor`] implement the backend traits
//! without hardware. Tests and the demo binary drive them directly: plug and
//! unplug devices, change their status, inject start and enable failures, and
//! push skeleton frames.
//!
//! Handlers run synchronously on the calling thread, after every internal
//! lock is released, so a handler may call back into the backend.

use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use crate::sensor::{
    Sensor, SensorRegistry, SkeletonFrameHandler, StatusChange, StatusHandler, SubscriptionId,
};
use crate::types::{
    ColorImageFormat, DepthImageFormat, DepthImagePoint, JointTrackingState, JointType,
    SensorStatus, Skeleton, SkeletonFrame, SkeletonPoint, SkeletonTrackingState, StreamKind,
    StreamRequest,
};
use crate::{Result, SensorError};

/// Focal length of the depth camera at 640 pixels across.
const DEPTH_FOCAL_LENGTH_640: f32 = 571.4;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct SensorState {
    status: SensorStatus,
    running: bool,
    enabled: HashSet<StreamKind>,
    color_format: Option<ColorImageFormat>,
    depth_format: Option<DepthImageFormat>,
    busy: Option<String>,
    reject_enable: bool,
    starts: u32,
    stops: u32,
}

/// A sensor whose state is set by the caller.
pub struct SimulatedSensor {
    id: String,
    state: Mutex<SensorState>,
    handlers: Mutex<Vec<(SubscriptionId, SkeletonFrameHandler)>>,
}

impl SimulatedSensor {
    /// A connected, stopped sensor.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_status(id, SensorStatus::Connected)
    }

    pub fn with_status(id: impl Into<String>, status: SensorStatus) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SensorState { status, ..SensorState::default() }),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Change the reported status without notifying anyone.
    ///
    /// Use [`SimulatedRegistry::set_status`] to raise a status-change event.
    pub fn set_status(&self, status: SensorStatus) {
        lock(&self.state).status = status;
    }

    /// Make every subsequent start fail with [`SensorError::DeviceBusy`].
    pub fn set_busy(&self, reason: Option<&str>) {
        lock(&self.state).busy = reason.map(str::to_string);
    }

    /// Make every subsequent stream enable fail with
    /// [`SensorError::InvalidOperation`].
    pub fn set_reject_enable(&self, reject: bool) {
        lock(&self.state).reject_enable = reject;
    }

    pub fn color_format(&self) -> Option<ColorImageFormat> {
        lock(&self.state).color_format
    }

    /// Number of successful starts.
    pub fn start_count(&self) -> u32 {
        lock(&self.state).starts
    }

    /// Number of stops that halted a running sensor.
    pub fn stop_count(&self) -> u32 {
        lock(&self.state).stops
    }

    pub fn skeleton_subscriber_count(&self) -> usize {
        lock(&self.handlers).len()
    }

    /// Deliver `frame` to every skeleton handler. Returns how many ran.
    ///
    /// Frames are only produced while running with the skeleton stream enabled.
    pub fn emit_frame(&self, frame: &SkeletonFrame) -> usize {
        {
            let state = lock(&self.state);
            if !state.running || !state.enabled.contains(&StreamKind::Skeleton) {
                trace!(sensor = %self.id, frame = frame.frame_number, "Skeleton stream idle, dropping");
                return 0;
            }
        }

        let handlers: Vec<SkeletonFrameHandler> =
            lock(&self.handlers).iter().map(|(_, handler)| Arc::clone(handler)).collect();
        for handler in &handlers {
            handler(frame);
        }
        handlers.len()
    }
}

impl std::fmt::Debug for SimulatedSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("SimulatedSensor")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("running", &state.running)
            .finish()
    }
}

impl Sensor for SimulatedSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> SensorStatus {
        lock(&self.state).status
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    fn enable_stream(&self, request: StreamRequest) -> Result<()> {
        let mut state = lock(&self.state);
        if state.reject_enable {
            return Err(SensorError::invalid_operation(
                &self.id,
                format!("enable {}", request.kind()),
                "device rejected the request",
            ));
        }
        if !state.status.is_connected() {
            return Err(SensorError::invalid_operation(
                &self.id,
                format!("enable {}", request.kind()),
                format!("device is {}", state.status),
            ));
        }

        match request {
            StreamRequest::Skeleton => {}
            StreamRequest::Color(format) => state.color_format = Some(format),
            StreamRequest::Depth(format) => state.depth_format = Some(format),
        }
        state.enabled.insert(request.kind());
        debug!(sensor = %self.id, stream = %request.kind(), "Stream enabled");
        Ok(())
    }

    fn disable_stream(&self, kind: StreamKind) {
        let mut state = lock(&self.state);
        if !state.enabled.remove(&kind) {
            return;
        }
        match kind {
            StreamKind::Color => state.color_format = None,
            StreamKind::Depth => state.depth_format = None,
            StreamKind::Skeleton => {}
        }
        debug!(sensor = %self.id, stream = %kind, "Stream disabled");
    }

    fn is_stream_enabled(&self, kind: StreamKind) -> bool {
        lock(&self.state).enabled.contains(&kind)
    }

    fn depth_format(&self) -> Option<DepthImageFormat> {
        lock(&self.state).depth_format
    }

    fn start(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if let Some(reason) = &state.busy {
            return Err(SensorError::device_busy(&self.id, reason.clone()));
        }
        if !state.status.is_connected() {
            return Err(SensorError::device_busy(&self.id, format!("device is {}", state.status)));
        }
        if !state.running {
            state.running = true;
            state.starts += 1;
        }
        Ok(())
    }

    fn stop(&self) {
        let mut state = lock(&self.state);
        if state.running {
            state.running = false;
            state.stops += 1;
        }
    }

    fn map_skeleton_point_to_depth(
        &self,
        point: SkeletonPoint,
        format: DepthImageFormat,
    ) -> DepthImagePoint {
        if point.z <= 0.0 {
            return DepthImagePoint::default();
        }
        let (width, height) = format.resolution();
        let focal = DEPTH_FOCAL_LENGTH_640 * width as f32 / 640.0;
        DepthImagePoint {
            x: (width as f32 / 2.0 + point.x * focal / point.z).round() as i32,
            y: (height as f32 / 2.0 - point.y * focal / point.z).round() as i32,
            depth: (point.z * 1000.0).round() as i32,
        }
    }

    fn subscribe_skeleton_frames(&self, handler: SkeletonFrameHandler) -> SubscriptionId {
        let id = SubscriptionId::next();
        lock(&self.handlers).push((id, handler));
        id
    }

    fn unsubscribe_skeleton_frames(&self, id: SubscriptionId) {
        lock(&self.handlers).retain(|(existing, _)| *existing != id);
    }
}

/// Registry of [`SimulatedSensor`]s in attachment order.
#[derive(Default)]
pub struct SimulatedRegistry {
    sensors: Mutex<Vec<Arc<SimulatedSensor>>>,
    listeners: Mutex<HashMap<SubscriptionId, StatusHandler>>,
}

impl SimulatedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug a sensor in and announce its current status.
    pub fn attach(&self, sensor: Arc<SimulatedSensor>) {
        self.attach_silently(Arc::clone(&sensor));
        let status = sensor.status();
        self.notify(sensor, status);
    }

    /// Plug a sensor in without raising a status change.
    pub fn attach_silently(&self, sensor: Arc<SimulatedSensor>) {
        debug!(sensor = sensor.id(), "Sensor attached");
        lock(&self.sensors).push(sensor);
    }

    /// Unplug a sensor: it becomes [`SensorStatus::Disconnected`] and the
    /// listeners are told so.
    pub fn detach(&self, id: &str) -> Result<Arc<SimulatedSensor>> {
        let sensor = self.detach_silently(id)?;
        sensor.set_status(SensorStatus::Disconnected);
        self.notify(Arc::clone(&sensor), SensorStatus::Disconnected);
        Ok(sensor)
    }

    /// Remove a sensor from enumeration without touching it or raising a
    /// status change.
    pub fn detach_silently(&self, id: &str) -> Result<Arc<SimulatedSensor>> {
        let mut sensors = lock(&self.sensors);
        let position = sensors
            .iter()
            .position(|sensor| sensor.id() == id)
            .ok_or_else(|| SensorError::device_not_found(id))?;
        debug!(sensor = id, "Sensor detached");
        Ok(sensors.remove(position))
    }

    /// Change the status of an attached sensor and raise a status change.
    pub fn set_status(&self, id: &str, status: SensorStatus) -> Result<()> {
        let sensor = self.sensor(id).ok_or_else(|| SensorError::device_not_found(id))?;
        sensor.set_status(status);
        self.notify(sensor, status);
        Ok(())
    }

    pub fn sensor(&self, id: &str) -> Option<Arc<SimulatedSensor>> {
        lock(&self.sensors).iter().find(|sensor| sensor.id() == id).cloned()
    }

    pub fn status_subscriber_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    fn notify(&self, sensor: Arc<SimulatedSensor>, status: SensorStatus) {
        let listeners: Vec<StatusHandler> = lock(&self.listeners).values().cloned().collect();
        trace!(sensor = sensor.id(), %status, listeners = listeners.len(), "Raising status change");
        let change = StatusChange { sensor, status };
        for listener in &listeners {
            listener(&change);
        }
    }
}

impl SensorRegistry for SimulatedRegistry {
    fn sensors(&self) -> Vec<Arc<dyn Sensor>> {
        lock(&self.sensors).iter().map(|sensor| Arc::clone(sensor) as Arc<dyn Sensor>).collect()
    }

    fn subscribe_status(&self, handler: StatusHandler) -> SubscriptionId {
        let id = SubscriptionId::next();
        lock(&self.listeners).insert(id, handler);
        id
    }

    fn unsubscribe_status(&self, id: SubscriptionId) {
        lock(&self.listeners).remove(&id);
    }
}

/// A body standing two metres from the sensor, right arm waving.
///
/// `phase` is in cycles; the arm sweeps through one full wave per unit.
pub fn wave_pose(tracking_id: u32, phase: f32) -> Skeleton {
    let root = SkeletonPoint::new(0.0, 0.0, 2.0);
    let mut skeleton = Skeleton::new(tracking_id, SkeletonTrackingState::Tracked, root);

    let angle = (phase * 2.0 * PI).sin() * 0.6;
    let (forearm_x, forearm_y) = (0.25 * angle.sin(), 0.25 * angle.cos());

    let joints = [
        (JointType::HipCenter, 0.0, 0.0),
        (JointType::Spine, 0.0, 0.25),
        (JointType::ShoulderCenter, 0.0, 0.5),
        (JointType::Head, 0.0, 0.7),
        (JointType::ShoulderLeft, -0.2, 0.45),
        (JointType::ElbowLeft, -0.3, 0.2),
        (JointType::WristLeft, -0.35, -0.05),
        (JointType::HandLeft, -0.37, -0.12),
        (JointType::ShoulderRight, 0.2, 0.45),
        (JointType::ElbowRight, 0.4, 0.45),
        (JointType::WristRight, 0.4 + forearm_x, 0.45 + forearm_y),
        (JointType::HandRight, 0.4 + forearm_x * 1.3, 0.45 + forearm_y * 1.3),
        (JointType::HipLeft, -0.1, -0.05),
        (JointType::KneeLeft, -0.12, -0.45),
        (JointType::AnkleLeft, -0.12, -0.85),
        (JointType::FootLeft, -0.15, -0.92),
        (JointType::HipRight, 0.1, -0.05),
        (JointType::KneeRight, 0.12, -0.45),
        (JointType::AnkleRight, 0.12, -0.85),
        (JointType::FootRight, 0.15, -0.92),
    ];
    for (joint, x, y) in joints {
        skeleton.set_joint(joint, SkeletonPoint::new(x, y, root.z), JointTrackingState::Tracked);
    }
    skeleton
}
