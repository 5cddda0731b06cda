//! Device lifecycle: discovery, start-up, teardown and hot-plug recovery
//!
//! [`DeviceManager`] owns at most one active sensor. It listens to registry
//! status changes and reacts to each one by tearing down what depends on the
//! sensor, recording the new status and rediscovering. There is no polling:
//! a device that failed to start stays inactive until the next status event.
//!
//! Backend errors never escape this module. They are logged and the manager
//! falls back to having no active sensor.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::config::SensorConfig;
use crate::render::{GraphicsDevice, SpriteBatch};
use crate::sensor::{Sensor, SensorRegistry, StatusChange, SubscriptionId};
use crate::streams::{
    SkeletonStreamManager, SkeletonTextures, StreamContext, StreamManager, StreamManagerFactory,
};
use crate::types::{Color, SensorStatus, StatusMessageTable, StreamKind, StreamRequest};
use crate::Result;

/// Shared, non-owning view of the manager's current sensor.
///
/// Stream managers hold one of these instead of a sensor handle so they
/// always see the device the lifecycle manager currently considers active.
#[derive(Clone, Default)]
pub struct ActiveSensor {
    slot: Arc<RwLock<Option<Arc<dyn Sensor>>>>,
}

impl ActiveSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active sensor, if any.
    pub fn current(&self) -> Option<Arc<dyn Sensor>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn replace(&self, sensor: Option<Arc<dyn Sensor>>) -> Option<Arc<dyn Sensor>> {
        std::mem::replace(&mut *self.slot.write().unwrap_or_else(PoisonError::into_inner), sensor)
    }
}

impl std::fmt::Debug for ActiveSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ActiveSensor").field(&self.current().map(|s| s.id().to_string())).finish()
    }
}

/// Render resources the skeleton stream manager is built from.
#[derive(Clone)]
pub struct SkeletonResources {
    pub graphics: Arc<dyn GraphicsDevice>,
    pub textures: SkeletonTextures,
}

impl SkeletonResources {
    pub fn new(graphics: Arc<dyn GraphicsDevice>) -> Self {
        Self { graphics, textures: SkeletonTextures::default() }
    }

    pub fn with_textures(mut self, textures: SkeletonTextures) -> Self {
        self.textures = textures;
        self
    }
}

#[derive(Default)]
struct DeviceState {
    skeleton: Option<Arc<SkeletonStreamManager>>,
    extra: Vec<Arc<dyn StreamManager>>,
}

impl DeviceState {
    fn managers(&self) -> Vec<Arc<dyn StreamManager>> {
        let skeleton = self.skeleton.iter().map(|s| Arc::clone(s) as Arc<dyn StreamManager>);
        skeleton.chain(self.extra.iter().cloned()).collect()
    }
}

struct Inner {
    registry: Arc<dyn SensorRegistry>,
    config: SensorConfig,
    messages: StatusMessageTable,
    resources: SkeletonResources,
    factories: Vec<StreamManagerFactory>,
    active: ActiveSensor,
    state: Mutex<DeviceState>,
    status_tx: watch::Sender<SensorStatus>,
}

/// Owns the active sensor and the stream managers bound to it.
pub struct DeviceManager {
    inner: Arc<Inner>,
    subscription: SubscriptionId,
}

impl DeviceManager {
    /// Subscribe to `registry` status changes, then discover a sensor.
    pub fn new(
        registry: Arc<dyn SensorRegistry>,
        config: SensorConfig,
        resources: SkeletonResources,
    ) -> Self {
        Self::with_stream_managers(registry, config, resources, Vec::new())
    }

    /// Like [`new`](Self::new), additionally building a host stream manager
    /// from each factory whenever a sensor starts.
    pub fn with_stream_managers(
        registry: Arc<dyn SensorRegistry>,
        config: SensorConfig,
        resources: SkeletonResources,
        factories: Vec<StreamManagerFactory>,
    ) -> Self {
        let (status_tx, _) = watch::channel(SensorStatus::Undefined);
        let inner = Arc::new(Inner {
            registry,
            messages: config.overlay.message_table(),
            config,
            resources,
            factories,
            active: ActiveSensor::new(),
            state: Mutex::new(DeviceState::default()),
            status_tx,
        });

        let listener = Arc::downgrade(&inner);
        let subscription = inner.registry.subscribe_status(Arc::new(move |change: &StatusChange| {
            match listener.upgrade() {
                Some(inner) => inner.handle_status_change(change),
                None => {
                    debug!(sensor = change.sensor.id(), "Device manager gone, ignoring status change")
                }
            }
        }));

        let manager = Self { inner, subscription };
        manager.discover();
        manager
    }

    /// Pick the first attached sensor and start it if it is connected.
    pub fn discover(&self) {
        let mut state = self.inner.lock_state();
        self.inner.discover(&mut state);
    }

    /// Tear down stream managers, disable sub-streams and stop the sensor.
    /// Safe to call repeatedly.
    pub fn close(&self) {
        let mut state = self.inner.lock_state();
        self.inner.close(&mut state);
    }

    /// React to a registry status change. Normally invoked by the registry.
    pub fn handle_status_change(&self, change: &StatusChange) {
        self.inner.handle_status_change(change);
    }

    /// The active sensor, if any.
    pub fn sensor(&self) -> Option<Arc<dyn Sensor>> {
        self.inner.active.current()
    }

    pub fn active_sensor(&self) -> ActiveSensor {
        self.inner.active.clone()
    }

    pub fn last_status(&self) -> SensorStatus {
        *self.inner.status_tx.borrow()
    }

    /// Human-readable text for [`last_status`](Self::last_status).
    pub fn status_message(&self) -> &str {
        self.inner.messages.message(self.last_status())
    }

    /// Every recorded status, starting with the current one.
    ///
    /// Statuses recorded faster than the stream is polled are coalesced.
    pub fn status_updates(&self) -> WatchStream<SensorStatus> {
        WatchStream::new(self.inner.status_tx.subscribe())
    }

    /// The skeleton stream manager of the running sensor.
    pub fn skeleton_stream(&self) -> Option<Arc<SkeletonStreamManager>> {
        self.inner.lock_state().skeleton.clone()
    }

    pub fn config(&self) -> &SensorConfig {
        &self.inner.config
    }

    /// Draw the status message at the configured position.
    pub fn draw_status_message(&self, batch: &mut dyn SpriteBatch) {
        let message = self.status_message();
        if message.is_empty() {
            return;
        }
        batch.begin();
        batch.draw_string(message, self.inner.config.overlay.status_position, Color::WHITE);
        batch.end();
    }

    /// Off-screen pre-pass of every stream manager. Runs only while the active
    /// sensor reports [`SensorStatus::Connected`].
    pub fn render_stream_managers(&self) {
        for manager in self.inner.connected_managers() {
            manager.render_offscreen();
        }
    }

    /// Draw every stream manager. Runs only while the active sensor reports
    /// [`SensorStatus::Connected`].
    pub fn draw_stream_managers(&self, batch: &mut dyn SpriteBatch) {
        for manager in self.inner.connected_managers() {
            manager.draw(batch);
        }
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        self.inner.registry.unsubscribe_status(self.subscription);
        self.close();
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_status(&self, status: SensorStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            debug!(%previous, %status, "Sensor status recorded");
        }
    }

    fn handle_status_change(&self, change: &StatusChange) {
        let mut state = self.lock_state();
        info!(sensor = change.sensor.id(), status = %change.status, "Sensor status changed");

        if !change.status.is_connected() {
            self.close_stream_managers(&mut state);
            change.sensor.stop();
        }

        self.record_status(change.status);
        self.discover(&mut state);
    }

    fn discover(&self, state: &mut DeviceState) {
        let Some(sensor) = self.registry.sensors().into_iter().next() else {
            if let Some(previous) = self.active.replace(None) {
                debug!(sensor = previous.id(), "Releasing sensor, none attached");
            }
            self.close_stream_managers(state);
            self.record_status(SensorStatus::Disconnected);
            info!("No sensor attached");
            return;
        };

        if let Some(previous) = self.active.current() {
            if previous.id() != sensor.id() {
                self.close(state);
            }
        }

        self.active.replace(Some(Arc::clone(&sensor)));
        let status = sensor.status();
        self.record_status(status);

        if !status.is_connected() {
            debug!(sensor = sensor.id(), %status, "Sensor found but not connected");
            return;
        }

        if let Err(error) = self.start(sensor.as_ref()) {
            warn!(
                sensor = sensor.id(),
                %error,
                retryable = error.is_retryable(),
                "Failed to start sensor, waiting for next status change"
            );
            self.close(state);
            self.active.replace(None);
            return;
        }

        if sensor.is_running() {
            self.load_stream_managers(state, &sensor);
        }
    }

    fn start(&self, sensor: &dyn Sensor) -> Result<()> {
        sensor.enable_stream(StreamRequest::Skeleton)?;
        sensor.enable_stream(StreamRequest::Color(self.config.color_format))?;
        sensor.enable_stream(StreamRequest::Depth(self.config.depth_format))?;
        sensor.start()?;
        info!(
            sensor = sensor.id(),
            color = ?self.config.color_format,
            depth = ?self.config.depth_format,
            "Sensor started"
        );
        Ok(())
    }

    fn load_stream_managers(&self, state: &mut DeviceState, sensor: &Arc<dyn Sensor>) {
        self.close_stream_managers(state);

        let graphics = self.resources.graphics.as_ref();
        state.skeleton = Some(Arc::new(SkeletonStreamManager::new(
            Some(sensor),
            self.active.clone(),
            graphics,
            self.resources.textures,
            self.config.overlay.skeleton_rect,
        )));

        let context =
            StreamContext { sensor, active: &self.active, graphics, config: &self.config };
        state.extra = self.factories.iter().map(|factory| factory(&context)).collect();

        debug!(sensor = sensor.id(), managers = state.extra.len() + 1, "Stream managers loaded");
    }

    fn close_stream_managers(&self, state: &mut DeviceState) {
        if let Some(skeleton) = state.skeleton.take() {
            skeleton.close();
        }
        for manager in state.extra.drain(..) {
            debug!(manager = manager.name(), "Closing stream manager");
            manager.close();
        }
    }

    fn close(&self, state: &mut DeviceState) {
        self.close_stream_managers(state);

        let Some(sensor) = self.active.current() else {
            return;
        };
        if !sensor.is_running() {
            return;
        }

        for kind in StreamKind::ALL {
            if sensor.is_stream_enabled(kind) {
                sensor.disable_stream(kind);
            }
        }
        sensor.stop();
        info!(sensor = sensor.id(), "Sensor stopped");
    }

    fn connected_managers(&self) -> Vec<Arc<dyn StreamManager>> {
        match self.active.current() {
            Some(sensor) if sensor.status().is_connected() => self.lock_state().managers(),
            _ => Vec::new(),
        }
    }
}
