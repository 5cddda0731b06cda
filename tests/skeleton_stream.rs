//! Skeleton frames flowing from a simulated sensor through the device manager
//! into rendered sprites.

use std::sync::Arc;
use std::time::Duration;

use motionlink::driver::{FramePump, PumpConfig};
use motionlink::render::{DrawCommand, HeadlessGraphics, RecordingBatch, Surface};
use motionlink::simulated::{SimulatedRegistry, SimulatedSensor, wave_pose};
use motionlink::streams::{BONES, skeleton_to_point};
use motionlink::{
    Color, DeviceManager, JointTrackingState, JointType, Rect, Sensor, SensorConfig,
    SensorStatus, Skeleton, SkeletonFrame, SkeletonPoint, SkeletonResources,
    SkeletonTrackingState, Vector2,
};

fn connected(config: SensorConfig) -> (Arc<SimulatedRegistry>, Arc<SimulatedSensor>, DeviceManager) {
    let _ = tracing_subscriber::fmt::try_init();
    let registry = Arc::new(SimulatedRegistry::new());
    let sensor = Arc::new(SimulatedSensor::new("sensor-0"));
    registry.attach_silently(Arc::clone(&sensor));
    let graphics = Arc::new(HeadlessGraphics { width: 640, height: 480 });
    let devices = DeviceManager::new(registry.clone(), config, SkeletonResources::new(graphics));
    (registry, sensor, devices)
}

fn frame(number: u64, skeletons: Vec<Skeleton>) -> SkeletonFrame {
    SkeletonFrame::new(number, skeletons)
}

#[test]
fn renderer_paces_the_hand_off() {
    let (_registry, sensor, devices) = connected(SensorConfig::default());
    let stream = devices.skeleton_stream().unwrap();

    // Nothing is accepted before the first render pass.
    assert_eq!(sensor.emit_frame(&frame(1, vec![wave_pose(1, 0.0)])), 1);
    assert!(stream.skeletons().is_empty());

    devices.render_stream_managers();
    sensor.emit_frame(&frame(2, vec![wave_pose(1, 0.0)]));
    sensor.emit_frame(&frame(3, vec![wave_pose(2, 0.5), wave_pose(3, 0.5)]));

    let buffered = stream.skeletons();
    assert_eq!(buffered.len(), 1);
    assert_eq!(buffered[0].tracking_id, 1);
    let stats = stream.frame_stats();
    assert_eq!((stats.accepted, stats.dropped), (1, 2));

    devices.render_stream_managers();
    sensor.emit_frame(&frame(4, vec![wave_pose(2, 0.5), wave_pose(3, 0.5)]));
    assert_eq!(stream.skeletons().len(), 2);
}

#[test]
fn joint_queries_outside_the_buffer_are_zero() {
    let (_registry, sensor, devices) = connected(SensorConfig::default());
    let stream = devices.skeleton_stream().unwrap();
    devices.render_stream_managers();
    sensor.emit_frame(&frame(1, vec![wave_pose(1, 0.0), Skeleton::default()]));

    assert_ne!(stream.joint_screen_position(JointType::Head, 0), Vector2::ZERO);
    assert_eq!(stream.joint_screen_position(JointType::Head, 2), Vector2::ZERO);
    assert_eq!(stream.joint_screen_position(JointType::FootLeft, 6), Vector2::ZERO);
}

#[test]
fn projection_uses_the_configured_depth_format() {
    let config = SensorConfig::new(
        Default::default(),
        motionlink::DepthImageFormat::Resolution320x240Fps30,
    );
    let (_registry, sensor, devices) = connected(config);
    let stream = devices.skeleton_stream().unwrap();

    let center = stream.skeleton_to_point(SkeletonPoint::new(0.0, 0.0, 2.0));
    assert_eq!(center, Vector2::new(160.0, 120.0));

    let direct = skeleton_to_point(Some(&*sensor as &dyn Sensor), SkeletonPoint::new(0.0, 0.0, 2.0));
    assert_eq!(direct, center);
}

#[test]
fn projection_without_a_device_is_zero() {
    let _ = tracing_subscriber::fmt::try_init();
    let registry = Arc::new(SimulatedRegistry::new());
    let graphics = Arc::new(HeadlessGraphics { width: 640, height: 480 });
    let devices = DeviceManager::new(registry, SensorConfig::default(), SkeletonResources::new(graphics));

    let active = devices.active_sensor().current();
    assert!(active.is_none());
    assert_eq!(
        skeleton_to_point(active.as_deref(), SkeletonPoint::new(0.2, 0.3, 1.5)),
        Vector2::ZERO
    );
}

#[test]
fn draw_pass_emits_bones_then_markers() {
    let (_registry, sensor, devices) = connected(SensorConfig::default());
    let stream = devices.skeleton_stream().unwrap();
    devices.render_stream_managers();

    let mut body = wave_pose(1, 0.0);
    body.set_joint(JointType::KneeLeft, body.joint(JointType::KneeLeft).position, JointTrackingState::Inferred);
    let root_only =
        Skeleton::new(2, SkeletonTrackingState::PositionOnly, SkeletonPoint::new(0.5, 0.0, 2.5));
    sensor.emit_frame(&frame(1, vec![body, root_only, Skeleton::default()]));

    let mut batch = RecordingBatch::new();
    stream.render_skeletons(&mut batch);
    let sprites: Vec<_> = batch.sprites().copied().collect();
    assert_eq!(sprites.len(), BONES.len() + JointType::COUNT + 1);

    let (bones, markers) = sprites.split_at(BONES.len());
    assert!(bones.iter().all(|s| s.layer_depth == 1.0 && s.origin == Vector2::new(0.05, 0.0)));
    // Hip-knee and knee-ankle touch the inferred knee.
    assert_eq!(bones.iter().filter(|s| s.color == Color::GRAY).count(), 2);
    assert_eq!(bones.iter().filter(|s| s.color == Color::LIGHT_GREEN).count(), BONES.len() - 2);

    assert_eq!(markers.iter().filter(|s| s.color == Color::YELLOW).count(), 1);
    assert_eq!(markers.iter().filter(|s| s.color == Color::GREEN).count(), JointType::COUNT - 1);
    assert_eq!(markers.last().map(|s| s.color), Some(Color::BLUE));
}

#[test]
fn bone_sprite_spans_its_joints() {
    let (_registry, sensor, devices) = connected(SensorConfig::default());
    let stream = devices.skeleton_stream().unwrap();
    devices.render_stream_managers();
    let body = wave_pose(1, 0.0);
    sensor.emit_frame(&frame(1, vec![body.clone()]));

    let mut batch = RecordingBatch::new();
    stream.render_skeletons(&mut batch);

    let head = stream.joint_screen_position(JointType::Head, 0);
    let neck = stream.joint_screen_position(JointType::ShoulderCenter, 0);
    let bone = batch.sprites().next().copied().unwrap();

    assert_eq!(bone.position, head);
    // The far end of the texture's axis lands on the end joint.
    let tip = bone.texel_to_screen(Vector2::new(bone.origin.x, bone.texture.height as f32));
    assert!((tip - neck).length() < 1e-3, "tip {tip:?} neck {neck:?}");
}

#[test]
fn off_screen_surface_is_composited_into_configured_rect() {
    let mut config = SensorConfig::default();
    config.overlay.skeleton_rect = Some(Rect::new(320, 0, 320, 240));
    let (_registry, sensor, devices) = connected(config);
    devices.render_stream_managers();
    sensor.emit_frame(&frame(1, vec![wave_pose(1, 0.0)]));
    devices.render_stream_managers();

    let mut screen = Surface::new(640, 480);
    screen.clear(Color::BLACK);
    devices.draw_stream_managers(&mut screen.batch());

    assert_eq!(screen.pixel(10, 10), Some(Color::BLACK));
    assert_eq!(screen.pixel(330, 10), Some(Color::DARK_RED));
    assert_eq!(screen.pixel(10, 300), Some(Color::BLACK));
    assert!(screen.count_pixels(Color::GREEN) > 0);

    let mut batch = RecordingBatch::new();
    devices.draw_stream_managers(&mut batch);
    assert!(batch.commands.contains(&DrawCommand::Surface {
        width: 640,
        height: 480,
        dest: Rect::new(320, 0, 320, 240),
        tint: Color::WHITE,
    }));
}

#[test]
fn unplugged_stream_ignores_late_frames() {
    let (registry, sensor, devices) = connected(SensorConfig::default());
    let stream = devices.skeleton_stream().unwrap();
    devices.render_stream_managers();

    registry.detach("sensor-0").unwrap();
    assert!(stream.is_closed());

    assert!(!stream.handle_frame(&frame(9, vec![wave_pose(1, 0.0)])));
    assert!(stream.skeletons().is_empty());
    assert_eq!(devices.last_status(), SensorStatus::Disconnected);
    assert!(!sensor.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pumped_frames_reach_the_overlay() {
    let (_registry, sensor, devices) = connected(SensorConfig::default());
    let stream = devices.skeleton_stream().unwrap();
    let pump = FramePump::spawn(
        Arc::clone(&sensor),
        PumpConfig { rate_hz: 120, bodies: 3, ..PumpConfig::default() },
    );

    let mut surface_rendered = false;
    for _ in 0..200 {
        devices.render_stream_managers();
        if stream.skeletons().iter().filter(|s| s.tracking_state == SkeletonTrackingState::Tracked).count() == 3 {
            devices.render_stream_managers();
            surface_rendered = stream.with_surface(|s| s.count_pixels(Color::GREEN) > 0);
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    pump.stop().await;

    assert!(surface_rendered, "no tracked bodies reached the surface");
    assert!(stream.frame_stats().accepted > 0);
}
