//! Hot-plug and lifecycle behavior of the device manager against the
//! simulated backend.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use motionlink::render::{DrawCommand, HeadlessGraphics, RecordingBatch};
use motionlink::simulated::{SimulatedRegistry, SimulatedSensor};
use motionlink::streams::{StreamContext, StreamManager, StreamManagerFactory};
use motionlink::{
    ColorImageFormat, DepthImageFormat, DeviceManager, Sensor, SensorConfig, SensorStatus,
    SkeletonResources, StreamKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};

fn resources() -> SkeletonResources {
    SkeletonResources::new(Arc::new(HeadlessGraphics { width: 640, height: 480 }))
}

fn rig() -> (Arc<SimulatedRegistry>, Arc<SimulatedSensor>) {
    let _ = tracing_subscriber::fmt::try_init();
    let registry = Arc::new(SimulatedRegistry::new());
    let sensor = Arc::new(SimulatedSensor::new("sensor-0"));
    registry.attach_silently(Arc::clone(&sensor));
    (registry, sensor)
}

fn manager(registry: &Arc<SimulatedRegistry>) -> DeviceManager {
    DeviceManager::new(registry.clone(), SensorConfig::default(), resources())
}

fn active_id(devices: &DeviceManager) -> Option<String> {
    devices.sensor().map(|sensor| sensor.id().to_string())
}

#[test]
fn zero_devices_means_disconnected() {
    let _ = tracing_subscriber::fmt::try_init();
    let registry = Arc::new(SimulatedRegistry::new());
    let devices = manager(&registry);

    assert!(devices.sensor().is_none());
    assert!(devices.skeleton_stream().is_none());
    assert_eq!(devices.last_status(), SensorStatus::Disconnected);
}

#[test]
fn connected_device_is_configured_and_started() {
    let (registry, sensor) = rig();
    let config = SensorConfig::new(
        ColorImageFormat::RgbResolution1280x960Fps12,
        DepthImageFormat::Resolution320x240Fps30,
    );
    let devices = DeviceManager::new(registry.clone(), config, resources());

    for kind in StreamKind::ALL {
        assert!(sensor.is_stream_enabled(kind), "{kind} should be enabled");
    }
    assert_eq!(sensor.color_format(), Some(ColorImageFormat::RgbResolution1280x960Fps12));
    assert_eq!(sensor.depth_format(), Some(DepthImageFormat::Resolution320x240Fps30));
    assert!(sensor.is_running());
    assert_eq!(active_id(&devices).as_deref(), Some("sensor-0"));
    assert_eq!(devices.last_status(), SensorStatus::Connected);
    assert!(devices.skeleton_stream().is_some());
    assert_eq!(sensor.skeleton_subscriber_count(), 1);
}

#[test]
fn first_sensor_in_enumeration_order_wins() {
    let (registry, first) = rig();
    let second = Arc::new(SimulatedSensor::new("sensor-1"));
    registry.attach_silently(Arc::clone(&second));

    let devices = manager(&registry);
    assert_eq!(active_id(&devices).as_deref(), Some("sensor-0"));
    assert!(first.is_running());
    assert!(!second.is_running());
}

#[test]
fn device_that_is_not_connected_is_held_but_not_started() {
    let registry = Arc::new(SimulatedRegistry::new());
    let sensor = Arc::new(SimulatedSensor::with_status("sensor-0", SensorStatus::NotPowered));
    registry.attach_silently(Arc::clone(&sensor));

    let devices = manager(&registry);
    assert_eq!(active_id(&devices).as_deref(), Some("sensor-0"));
    assert_eq!(devices.last_status(), SensorStatus::NotPowered);
    assert_eq!(devices.status_message(), "Detected device is not powered!");
    assert!(!sensor.is_running());
    assert!(devices.skeleton_stream().is_none());
}

#[test]
fn unplug_tears_down_and_replug_recovers() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);
    let first_stream = devices.skeleton_stream().unwrap();

    registry.detach("sensor-0").unwrap();

    assert!(first_stream.is_closed());
    assert_eq!(sensor.skeleton_subscriber_count(), 0);
    assert!(!sensor.is_running());
    assert!(devices.sensor().is_none());
    assert!(devices.skeleton_stream().is_none());
    assert_eq!(devices.last_status(), SensorStatus::Disconnected);

    sensor.set_status(SensorStatus::Connected);
    registry.attach(Arc::clone(&sensor));

    assert!(sensor.is_running());
    assert_eq!(sensor.start_count(), 2);
    assert_eq!(sensor.skeleton_subscriber_count(), 1);
    let second_stream = devices.skeleton_stream().unwrap();
    assert!(!Arc::ptr_eq(&first_stream, &second_stream));
    assert_eq!(devices.last_status(), SensorStatus::Connected);
}

#[test]
fn non_connected_status_stops_the_reported_sensor() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);

    registry.set_status("sensor-0", SensorStatus::NotReady).unwrap();

    assert_eq!(sensor.stop_count(), 1);
    assert!(!sensor.is_running());
    assert!(devices.skeleton_stream().is_none());
    assert_eq!(devices.last_status(), SensorStatus::NotReady);
    assert_eq!(active_id(&devices).as_deref(), Some("sensor-0"));

    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();
    assert!(sensor.is_running());
    assert!(devices.skeleton_stream().is_some());
}

#[test]
fn busy_start_leaves_no_active_sensor_until_next_event() {
    let (registry, sensor) = rig();
    sensor.set_busy(Some("in use by another application"));

    let devices = manager(&registry);
    assert!(devices.sensor().is_none());
    assert!(devices.skeleton_stream().is_none());
    assert!(!sensor.is_running());

    // No retry without an event.
    sensor.set_busy(None);
    assert!(devices.sensor().is_none());

    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();
    assert_eq!(active_id(&devices).as_deref(), Some("sensor-0"));
    assert!(sensor.is_running());
}

#[test]
fn rejected_enable_leaves_no_active_sensor() {
    let (registry, sensor) = rig();
    sensor.set_reject_enable(true);

    let devices = manager(&registry);
    assert!(devices.sensor().is_none());
    assert!(!sensor.is_running());

    sensor.set_reject_enable(false);
    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();
    assert!(sensor.is_running());
}

#[test]
fn failed_restart_of_running_sensor_stops_it() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);
    let stream = devices.skeleton_stream().unwrap();
    assert!(sensor.is_running());

    sensor.set_reject_enable(true);
    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();

    assert!(devices.sensor().is_none());
    assert!(devices.skeleton_stream().is_none());
    assert!(stream.is_closed());
    assert_eq!(sensor.skeleton_subscriber_count(), 0);
    assert!(!sensor.is_running());
    for kind in StreamKind::ALL {
        assert!(!sensor.is_stream_enabled(kind), "{kind} should be disabled");
    }

    devices.close();
    drop(devices);
    assert!(!sensor.is_running());
    assert_eq!(sensor.stop_count(), 1);
}

#[test]
fn close_disables_streams_and_is_idempotent() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);
    let stream = devices.skeleton_stream().unwrap();

    devices.close();
    devices.close();

    for kind in StreamKind::ALL {
        assert!(!sensor.is_stream_enabled(kind), "{kind} should be disabled");
    }
    assert!(!sensor.is_running());
    assert_eq!(sensor.stop_count(), 1);
    assert!(stream.is_closed());
    assert!(devices.skeleton_stream().is_none());
}

#[test]
fn close_without_sensor_is_a_no_op() {
    let registry = Arc::new(SimulatedRegistry::new());
    let devices = manager(&registry);
    devices.close();
    devices.close();
    assert_eq!(devices.last_status(), SensorStatus::Disconnected);
}

#[test]
fn stream_managers_draw_only_while_connected() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);

    let mut batch = RecordingBatch::new();
    devices.draw_stream_managers(&mut batch);
    assert!(batch.commands.iter().any(|c| matches!(c, DrawCommand::Surface { .. })));

    // Status flips without a registry event: drawing stops, state is kept.
    sensor.set_status(SensorStatus::Error);
    batch.clear();
    devices.render_stream_managers();
    devices.draw_stream_managers(&mut batch);
    assert!(batch.commands.is_empty());
    assert!(devices.skeleton_stream().is_some());
}

#[test]
fn status_message_is_drawn_at_configured_position() {
    let registry = Arc::new(SimulatedRegistry::new());
    let devices = manager(&registry);

    let mut batch = RecordingBatch::new();
    devices.draw_status_message(&mut batch);
    let text = batch.commands.iter().find_map(|command| match command {
        DrawCommand::Text { text, position, .. } => Some((text.clone(), *position)),
        _ => None,
    });
    let (text, position) = text.unwrap();
    assert_eq!(text, "Disconnected/Device required!");
    assert_eq!((position.x, position.y), (4.0, 2.0));
}

struct CountingManager {
    closed: Arc<AtomicUsize>,
}

impl StreamManager for CountingManager {
    fn name(&self) -> &str {
        "counting"
    }

    fn draw(&self, _batch: &mut dyn motionlink::render::SpriteBatch) {}

    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn factories_are_rebuilt_on_every_start() {
    let (registry, sensor) = rig();
    let built = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));

    let factory: StreamManagerFactory = {
        let built = Arc::clone(&built);
        let closed = Arc::clone(&closed);
        Box::new(move |context: &StreamContext<'_>| {
            assert!(context.sensor.is_running());
            built.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountingManager { closed: Arc::clone(&closed) }) as Arc<dyn StreamManager>
        })
    };
    let devices = DeviceManager::with_stream_managers(
        registry.clone(),
        SensorConfig::default(),
        resources(),
        vec![factory],
    );
    assert_eq!(built.load(Ordering::SeqCst), 1);

    registry.detach("sensor-0").unwrap();
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    sensor.set_status(SensorStatus::Connected);
    registry.attach(Arc::clone(&sensor));
    assert_eq!(built.load(Ordering::SeqCst), 2);

    // Redundant Connected event: old managers closed before new ones load.
    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 3);
    assert_eq!(closed.load(Ordering::SeqCst), 2);

    drop(devices);
    assert_eq!(closed.load(Ordering::SeqCst), 3);
}

#[test]
fn dropped_manager_stops_reacting_to_events() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);
    drop(devices);
    assert!(!sensor.is_running());

    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();
    assert!(!sensor.is_running());
    assert_eq!(registry.status_subscriber_count(), 0);
}

#[tokio::test]
async fn status_updates_start_with_current_status() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);
    let mut updates = devices.status_updates();

    let first = tokio::time::timeout(Duration::from_secs(1), updates.next()).await.unwrap();
    assert_eq!(first, Some(SensorStatus::Connected));

    registry.detach("sensor-0").unwrap();
    let next = tokio::time::timeout(Duration::from_secs(1), updates.next()).await.unwrap();
    assert_eq!(next, Some(SensorStatus::Disconnected));

    sensor.set_status(SensorStatus::Connected);
    registry.attach(Arc::clone(&sensor));
    let next = tokio::time::timeout(Duration::from_secs(1), updates.next()).await.unwrap();
    assert_eq!(next, Some(SensorStatus::Connected));
}

#[test]
fn status_events_from_many_threads_settle_consistently() {
    let (registry, sensor) = rig();
    let devices = manager(&registry);

    std::thread::scope(|scope| {
        for round in 0..8 {
            let registry = &registry;
            scope.spawn(move || {
                let status =
                    if round % 2 == 0 { SensorStatus::NotReady } else { SensorStatus::Connected };
                registry.set_status("sensor-0", status).unwrap();
            });
        }
    });

    registry.set_status("sensor-0", SensorStatus::Connected).unwrap();
    assert!(sensor.is_running());
    assert_eq!(sensor.skeleton_subscriber_count(), 1);
    assert!(devices.skeleton_stream().is_some());
}
