//! Frame pump: drives a simulated sensor's skeleton stream from a tokio task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::sensor::Sensor;
use crate::simulated::{SimulatedSensor, wave_pose};
use crate::types::{MAX_SKELETONS, Skeleton, SkeletonFrame};

/// Pacing and content of pumped frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpConfig {
    /// Frames per second
    pub rate_hz: u32,
    /// Tracked bodies per frame, capped at [`MAX_SKELETONS`]
    pub bodies: usize,
    /// Duration of one full arm wave
    pub wave_period: Duration,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self { rate_hz: 30, bodies: 1, wave_period: Duration::from_secs(2) }
    }
}

/// Periodically synthesizes skeleton frames and pushes them through a
/// [`SimulatedSensor`], standing in for the SDK's frame thread.
///
/// Frames always carry [`MAX_SKELETONS`] slots; the first `bodies` are tracked.
/// Frames emitted while the sensor is stopped are discarded by the sensor.
pub struct FramePump {
    cancel: CancellationToken,
    emitted: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl FramePump {
    /// Spawn the pump on the current tokio runtime.
    pub fn spawn(sensor: Arc<SimulatedSensor>, config: PumpConfig) -> Self {
        let cancel = CancellationToken::new();
        let (emitted_tx, emitted) = watch::channel(0);

        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            Self::pump_task(sensor, config, emitted_tx, task_cancel).await;
        });

        FramePump { cancel, emitted, handle }
    }

    /// Frames delivered to at least one handler so far.
    pub fn frames_delivered(&self) -> u64 {
        *self.emitted.borrow()
    }

    /// Receiver of the delivered-frame counter.
    pub fn delivered_updates(&self) -> watch::Receiver<u64> {
        self.emitted.clone()
    }

    /// Token cancelling the pump task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the task and wait for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            debug!("Frame pump task ended abnormally: {}", e);
        }
    }

    async fn pump_task(
        sensor: Arc<SimulatedSensor>,
        config: PumpConfig,
        emitted_tx: watch::Sender<u64>,
        cancel: CancellationToken,
    ) {
        let rate_hz = config.rate_hz.max(1);
        let bodies = config.bodies.min(MAX_SKELETONS);
        let period_frames = (config.wave_period.as_secs_f32() * rate_hz as f32).max(1.0);

        let mut interval = tokio::time::interval(Duration::from_secs(1) / rate_hz);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(sensor = sensor.id(), rate_hz, bodies, "Frame pump started");
        let mut frame_number = 0u64;
        let mut delivered = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            frame_number += 1;
            let phase = frame_number as f32 / period_frames;
            let skeletons = (0..MAX_SKELETONS)
                .map(|slot| {
                    if slot < bodies {
                        wave_pose(slot as u32 + 1, phase + slot as f32 * 0.25)
                    } else {
                        Skeleton::default()
                    }
                })
                .collect();

            if sensor.emit_frame(&SkeletonFrame::new(frame_number, skeletons)) > 0 {
                delivered += 1;
                emitted_tx.send_replace(delivered);
            } else {
                trace!(frame = frame_number, "No subscriber took the frame");
            }
        }

        info!(sensor = sensor.id(), frames = frame_number, delivered, "Frame pump stopped");
    }
}
