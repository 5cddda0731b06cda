//! Skeleton stream: frame hand-off, joint projection and bone rendering
//!
//! The sensor delivers frames on its own thread; the render loop consumes them.
//! The two meet in a mutex-guarded slot holding exactly one buffer:
//!
//! - **awaiting consumption**: a frame was copied in and has not been drawn
//!   yet. Incoming frames are dropped.
//! - **available for overwrite**: the buffer was drawn at least once since it
//!   was written. The next incoming frame replaces it.
//!
//! The renderer paces consumption; the sensor never queues. A fresh manager
//! starts awaiting consumption with an empty buffer, so the first frame is
//! accepted only after the first render pass.

use std::f32::consts::FRAC_PI_2;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, trace};

use super::StreamManager;
use crate::device::ActiveSensor;
use crate::render::{GraphicsDevice, Sprite, SpriteBatch, Surface, TextureInfo, TextureShape};
use crate::sensor::{Sensor, SubscriptionId};
use crate::types::{
    Color, JointTrackingState, JointType, Rect, Skeleton, SkeletonFrame, SkeletonPoint,
    SkeletonTrackingState, Vector2,
};

/// Adjacent joint pairs drawn as bones, torso first, then each limb outward.
pub const BONES: [(JointType, JointType); 19] = [
    (JointType::Head, JointType::ShoulderCenter),
    (JointType::ShoulderCenter, JointType::ShoulderLeft),
    (JointType::ShoulderCenter, JointType::ShoulderRight),
    (JointType::ShoulderCenter, JointType::Spine),
    (JointType::Spine, JointType::HipCenter),
    (JointType::HipCenter, JointType::HipLeft),
    (JointType::HipCenter, JointType::HipRight),
    // Left arm
    (JointType::ShoulderLeft, JointType::ElbowLeft),
    (JointType::ElbowLeft, JointType::WristLeft),
    (JointType::WristLeft, JointType::HandLeft),
    // Right arm
    (JointType::ShoulderRight, JointType::ElbowRight),
    (JointType::ElbowRight, JointType::WristRight),
    (JointType::WristRight, JointType::HandRight),
    // Left leg
    (JointType::HipLeft, JointType::KneeLeft),
    (JointType::KneeLeft, JointType::AnkleLeft),
    (JointType::AnkleLeft, JointType::FootLeft),
    // Right leg
    (JointType::HipRight, JointType::KneeRight),
    (JointType::KneeRight, JointType::AnkleRight),
    (JointType::AnkleRight, JointType::FootRight),
];

const BACKGROUND_COLOR: Color = Color::DARK_RED;
const BONE_TRACKED_COLOR: Color = Color::LIGHT_GREEN;
const BONE_INFERRED_COLOR: Color = Color::GRAY;
const JOINT_TRACKED_COLOR: Color = Color::GREEN;
const JOINT_INFERRED_COLOR: Color = Color::YELLOW;
const POSITION_ONLY_COLOR: Color = Color::BLUE;
const BONE_ORIGIN: Vector2 = Vector2::new(0.05, 0.0);
const BONE_LAYER_DEPTH: f32 = 1.0;

/// Textures used for joint markers and bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonTextures {
    pub joint: TextureInfo,
    pub bone: TextureInfo,
}

impl Default for SkeletonTextures {
    fn default() -> Self {
        Self {
            joint: TextureInfo::new(1, 12, 12, TextureShape::Disc),
            bone: TextureInfo::new(2, 6, 16, TextureShape::Solid),
        }
    }
}

/// Counters of the frame hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub accepted: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct FrameSlot {
    skeletons: Vec<Skeleton>,
    ready_to_overwrite: bool,
    closed: bool,
    stats: FrameStats,
}

struct FrameSubscription {
    sensor: Weak<dyn Sensor>,
    id: SubscriptionId,
}

/// Buffers the latest skeleton frame of the active sensor and draws it.
pub struct SkeletonStreamManager {
    dest: Rect,
    textures: SkeletonTextures,
    joint_origin: Vector2,
    slot: Arc<Mutex<FrameSlot>>,
    surface: Mutex<Surface>,
    active: ActiveSensor,
    subscription: Mutex<Option<FrameSubscription>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SkeletonStreamManager {
    /// Bind to `sensor` and subscribe to its skeleton frames.
    ///
    /// The off-screen surface matches the back buffer of `graphics`; `dest`
    /// is where [`draw`](Self::draw) composites it (the whole back buffer when
    /// `None`).
    pub fn new(
        sensor: Option<&Arc<dyn Sensor>>,
        active: ActiveSensor,
        graphics: &dyn GraphicsDevice,
        textures: SkeletonTextures,
        dest: Option<Rect>,
    ) -> Self {
        let surface = Surface::for_device(graphics);
        let dest = dest.unwrap_or_else(|| Rect::new(0, 0, surface.width(), surface.height()));
        let joint_origin = Vector2::new(
            (textures.joint.width as f32 / 2.0).ceil(),
            (textures.joint.height as f32 / 2.0).ceil(),
        );

        let manager = Self {
            dest,
            textures,
            joint_origin,
            slot: Arc::new(Mutex::new(FrameSlot::default())),
            surface: Mutex::new(surface),
            active,
            subscription: Mutex::new(None),
        };

        if let Some(sensor) = sensor {
            let slot = Arc::clone(&manager.slot);
            let id = sensor.subscribe_skeleton_frames(Arc::new(move |frame: &SkeletonFrame| {
                store_frame(&slot, frame);
            }));
            debug!(sensor = sensor.id(), "Subscribed to skeleton frames");
            *lock(&manager.subscription) =
                Some(FrameSubscription { sensor: Arc::downgrade(sensor), id });
        }

        manager
    }

    /// Frame-ready handler. Returns whether the frame replaced the buffer.
    pub fn handle_frame(&self, frame: &SkeletonFrame) -> bool {
        store_frame(&self.slot, frame)
    }

    /// Copy of the buffered skeletons.
    pub fn skeletons(&self) -> Vec<Skeleton> {
        lock(&self.slot).skeletons.clone()
    }

    /// Whether the buffer holds a frame not yet drawn.
    pub fn is_awaiting_consumption(&self) -> bool {
        !lock(&self.slot).ready_to_overwrite
    }

    pub fn frame_stats(&self) -> FrameStats {
        lock(&self.slot).stats
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.slot).closed
    }

    /// Screen position of `joint` on the body at `skeleton_index`, or the zero
    /// vector when the index is outside the buffer.
    pub fn joint_screen_position(&self, joint: JointType, skeleton_index: usize) -> Vector2 {
        let position = {
            let slot = lock(&self.slot);
            match slot.skeletons.get(skeleton_index) {
                Some(skeleton) => skeleton.joint(joint).position,
                None => return Vector2::ZERO,
            }
        };
        self.skeleton_to_point(position)
    }

    /// Project a skeleton-space point through the active sensor.
    pub fn skeleton_to_point(&self, point: SkeletonPoint) -> Vector2 {
        let sensor = self.active.current();
        skeleton_to_point(sensor.as_deref(), point)
    }

    /// Draw the buffered bodies into the off-screen surface, then release the
    /// buffer for overwrite. Does nothing while no sensor is active.
    pub fn render_to_offscreen_surface(&self) {
        if self.active.current().is_none() {
            trace!("No active sensor, leaving off-screen surface untouched");
            return;
        }
        let mut surface = lock(&self.surface);
        surface.clear(BACKGROUND_COLOR);
        let mut batch = surface.batch();
        self.render_skeletons(&mut batch);
    }

    /// Run the skeleton draw pass against any sprite batch, then release the
    /// buffer for overwrite. Does nothing while no sensor is active.
    pub fn render_skeletons(&self, batch: &mut dyn SpriteBatch) {
        let Some(sensor) = self.active.current() else {
            trace!("No active sensor, skipping skeleton pass");
            return;
        };

        let skeletons = self.skeletons();
        if !skeletons.is_empty() {
            batch.begin();
            for skeleton in &skeletons {
                self.draw_skeleton(skeleton, Some(sensor.as_ref()), batch);
            }
            batch.end();
        }

        lock(&self.slot).ready_to_overwrite = true;
    }

    /// Composite the off-screen surface into the destination rectangle.
    pub fn draw(&self, batch: &mut dyn SpriteBatch) {
        let surface = lock(&self.surface);
        batch.begin();
        batch.draw_surface(&surface, self.dest, Color::WHITE);
        batch.end();
    }

    /// Run `f` with the off-screen surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&Surface) -> R) -> R {
        f(&lock(&self.surface))
    }

    /// Unsubscribe from the sensor this manager was bound to and discard the
    /// buffer. Frames racing the unsubscription are dropped.
    pub fn close(&self) {
        {
            let mut slot = lock(&self.slot);
            slot.closed = true;
            slot.skeletons.clear();
        }

        let Some(subscription) = lock(&self.subscription).take() else {
            return;
        };
        if let Some(sensor) = subscription.sensor.upgrade() {
            sensor.unsubscribe_skeleton_frames(subscription.id);
            debug!(sensor = sensor.id(), "Unsubscribed from skeleton frames");
        }
    }

    fn draw_skeleton(
        &self,
        skeleton: &Skeleton,
        sensor: Option<&dyn Sensor>,
        batch: &mut dyn SpriteBatch,
    ) {
        match skeleton.tracking_state {
            SkeletonTrackingState::Tracked => {
                for (start, end) in BONES {
                    batch.draw_sprite(&self.bone_sprite(skeleton, start, end, sensor));
                }
                for joint in skeleton.joints() {
                    let color = if joint.tracking_state == JointTrackingState::Tracked {
                        JOINT_TRACKED_COLOR
                    } else {
                        JOINT_INFERRED_COLOR
                    };
                    batch.draw_sprite(&self.joint_sprite(
                        skeleton_to_point(sensor, joint.position),
                        color,
                    ));
                }
            }
            SkeletonTrackingState::PositionOnly => {
                batch.draw_sprite(&self.joint_sprite(
                    skeleton_to_point(sensor, skeleton.position),
                    POSITION_ONLY_COLOR,
                ));
            }
            SkeletonTrackingState::NotTracked => {}
        }
    }

    fn joint_sprite(&self, position: Vector2, color: Color) -> Sprite {
        Sprite {
            texture: self.textures.joint,
            position,
            color,
            rotation: 0.0,
            origin: self.joint_origin,
            scale: Vector2::ONE,
            layer_depth: 0.0,
        }
    }

    fn bone_sprite(
        &self,
        skeleton: &Skeleton,
        start: JointType,
        end: JointType,
        sensor: Option<&dyn Sensor>,
    ) -> Sprite {
        let start_joint = skeleton.joint(start);
        let end_joint = skeleton.joint(end);
        let from = skeleton_to_point(sensor, start_joint.position);
        let to = skeleton_to_point(sensor, end_joint.position);
        let difference = to - from;

        let both_tracked = start_joint.tracking_state == JointTrackingState::Tracked
            && end_joint.tracking_state == JointTrackingState::Tracked;

        Sprite {
            texture: self.textures.bone,
            position: from,
            color: if both_tracked { BONE_TRACKED_COLOR } else { BONE_INFERRED_COLOR },
            // Texture "up" is its +y axis; turn it onto the bone direction.
            rotation: difference.y.atan2(difference.x) - FRAC_PI_2,
            origin: BONE_ORIGIN,
            scale: Vector2::new(1.0, difference.length() / self.textures.bone.height as f32),
            layer_depth: BONE_LAYER_DEPTH,
        }
    }
}

impl StreamManager for SkeletonStreamManager {
    fn name(&self) -> &str {
        "skeleton"
    }

    fn render_offscreen(&self) {
        self.render_to_offscreen_surface();
    }

    fn draw(&self, batch: &mut dyn SpriteBatch) {
        SkeletonStreamManager::draw(self, batch);
    }

    fn close(&self) {
        SkeletonStreamManager::close(self);
    }
}

impl Drop for SkeletonStreamManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map a skeleton-space point into depth-image pixels of `sensor`.
///
/// Returns the zero vector without a sensor or without an enabled depth stream.
pub fn skeleton_to_point(sensor: Option<&dyn Sensor>, point: SkeletonPoint) -> Vector2 {
    let Some(sensor) = sensor else {
        return Vector2::ZERO;
    };
    let Some(format) = sensor.depth_format() else {
        return Vector2::ZERO;
    };
    let depth_point = sensor.map_skeleton_point_to_depth(point, format);
    Vector2::new(depth_point.x as f32, depth_point.y as f32)
}

fn store_frame(slot: &Mutex<FrameSlot>, frame: &SkeletonFrame) -> bool {
    let mut slot = lock(slot);
    if slot.closed || !slot.ready_to_overwrite {
        slot.stats.dropped += 1;
        trace!(frame = frame.frame_number, "Previous skeleton frame not consumed, dropping");
        return false;
    }

    if slot.skeletons.len() != frame.skeleton_array_length() {
        slot.skeletons = frame.skeletons.clone();
    } else {
        slot.skeletons.clone_from_slice(&frame.skeletons);
    }
    slot.ready_to_overwrite = false;
    slot.stats.accepted += 1;
    true
}
