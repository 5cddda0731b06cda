//! Shared fixtures for unit tests and benchmarks
//!
//! Poses are built on [`wave_pose`] so that every fixture projects inside a
//! 640x480 depth image.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::Arc;

use crate::simulated::{SimulatedRegistry, SimulatedSensor, wave_pose};
use crate::types::{
    MAX_SKELETONS, Skeleton, SkeletonFrame, SkeletonPoint, SkeletonTrackingState,
};

/// Fully tracked body with the arm at rest.
pub fn standing_skeleton(tracking_id: u32) -> Skeleton {
    wave_pose(tracking_id, 0.0)
}

/// Body whose joints are unknown, only its root position.
pub fn position_only_skeleton(tracking_id: u32) -> Skeleton {
    Skeleton::new(
        tracking_id,
        SkeletonTrackingState::PositionOnly,
        SkeletonPoint::new(-0.4, 0.1, 2.5),
    )
}

/// Frame with `tracked` standing bodies, one position-only body, and the
/// remaining slots empty.
pub fn crowded_frame(frame_number: u64, tracked: usize) -> SkeletonFrame {
    let tracked = tracked.min(MAX_SKELETONS - 1);
    let skeletons = (0..MAX_SKELETONS)
        .map(|slot| match slot {
            s if s < tracked => wave_pose(s as u32 + 1, s as f32 * 0.2),
            s if s == tracked => position_only_skeleton(s as u32 + 1),
            _ => Skeleton::default(),
        })
        .collect();
    SkeletonFrame::new(frame_number, skeletons)
}

/// Registry with one connected, attached sensor.
pub fn connected_rig() -> (Arc<SimulatedRegistry>, Arc<SimulatedSensor>) {
    let registry = Arc::new(SimulatedRegistry::new());
    let sensor = Arc::new(SimulatedSensor::new("sensor-0"));
    registry.attach_silently(Arc::clone(&sensor));
    (registry, sensor)
}

/// Install a test subscriber honoring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
