//! Headless run of the full overlay pipeline against a simulated sensor.
//!
//! Usage: `skeleton_overlay [CONFIG.yaml]`
//!
//! Renders three seconds of frames at 30 fps, unplugging the sensor after one
//! second and plugging it back in half a second later.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use motionlink::driver::{FramePump, PumpConfig};
use motionlink::render::{GraphicsDevice, HeadlessGraphics, Surface};
use motionlink::simulated::{SimulatedRegistry, SimulatedSensor};
use motionlink::{Color, DeviceManager, Sensor, SensorConfig, SensorStatus, SkeletonResources};
use tracing::info;

const FRAME_RATE: u32 = 30;
const TOTAL_FRAMES: u32 = 90;
const UNPLUG_AT: u32 = 30;
const REPLUG_AT: u32 = 45;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => SensorConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => SensorConfig::default(),
    };

    let graphics = Arc::new(HeadlessGraphics { width: 640, height: 480 });
    let registry = Arc::new(SimulatedRegistry::new());
    let sensor = Arc::new(SimulatedSensor::new("sensor-0"));
    registry.attach_silently(Arc::clone(&sensor));

    let devices = DeviceManager::new(
        registry.clone(),
        config,
        SkeletonResources::new(graphics.clone()),
    );

    let mut statuses = devices.status_updates();
    let status_log = tokio::spawn(async move {
        while let Some(status) = statuses.next().await {
            info!(%status, "Overlay status");
        }
    });

    let pump = FramePump::spawn(
        Arc::clone(&sensor),
        PumpConfig { rate_hz: FRAME_RATE, bodies: 2, ..PumpConfig::default() },
    );

    let (width, height) = graphics.back_buffer_size();
    let mut screen = Surface::new(width, height);
    let mut interval = tokio::time::interval(Duration::from_secs(1) / FRAME_RATE);

    for frame in 0..TOTAL_FRAMES {
        interval.tick().await;

        match frame {
            UNPLUG_AT => {
                registry.detach(sensor.id()).context("unplugging sensor")?;
            }
            REPLUG_AT => {
                sensor.set_status(SensorStatus::Connected);
                registry.attach(Arc::clone(&sensor));
            }
            _ => {}
        }

        devices.render_stream_managers();
        screen.clear(Color::BLACK);
        let mut batch = screen.batch();
        devices.draw_stream_managers(&mut batch);
        devices.draw_status_message(&mut batch);
    }

    let stats = devices.skeleton_stream().map(|skeleton| skeleton.frame_stats());
    info!(
        delivered = pump.frames_delivered(),
        ?stats,
        skeleton_pixels = screen.count_pixels(Color::GREEN),
        status = %devices.last_status(),
        "Run complete"
    );

    pump.stop().await;
    drop(devices);
    status_log.abort();
    Ok(())
}
