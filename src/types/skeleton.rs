//! Skeleton frames, bodies and joints in sensor space

use serde::{Deserialize, Serialize};

/// Maximum number of bodies a sensor reports per frame.
pub const MAX_SKELETONS: usize = 6;

/// Named anatomical joints, in the order the SDK reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointType {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
}

impl JointType {
    pub const COUNT: usize = 20;

    pub const ALL: [JointType; JointType::COUNT] = [
        JointType::HipCenter,
        JointType::Spine,
        JointType::ShoulderCenter,
        JointType::Head,
        JointType::ShoulderLeft,
        JointType::ElbowLeft,
        JointType::WristLeft,
        JointType::HandLeft,
        JointType::ShoulderRight,
        JointType::ElbowRight,
        JointType::WristRight,
        JointType::HandRight,
        JointType::HipLeft,
        JointType::KneeLeft,
        JointType::AnkleLeft,
        JointType::FootLeft,
        JointType::HipRight,
        JointType::KneeRight,
        JointType::AnkleRight,
        JointType::FootRight,
    ];

    /// Position of this joint in a skeleton's joint array.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Point in sensor space, in meters. `z` is the distance from the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SkeletonPoint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Point in depth-image pixel space. `depth` is in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthImagePoint {
    pub x: i32,
    pub y: i32,
    pub depth: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JointTrackingState {
    #[default]
    NotTracked,
    /// Position estimated from neighbouring joints
    Inferred,
    Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkeletonTrackingState {
    #[default]
    NotTracked,
    /// Only the body's root position is known
    PositionOnly,
    Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub joint_type: JointType,
    pub position: SkeletonPoint,
    pub tracking_state: JointTrackingState,
}

/// One tracked body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub tracking_id: u32,
    pub tracking_state: SkeletonTrackingState,
    /// Root position of the body
    pub position: SkeletonPoint,
    joints: [Joint; JointType::COUNT],
}

impl Default for Skeleton {
    fn default() -> Self {
        Self {
            tracking_id: 0,
            tracking_state: SkeletonTrackingState::NotTracked,
            position: SkeletonPoint::default(),
            joints: JointType::ALL.map(|joint_type| Joint {
                joint_type,
                position: SkeletonPoint::default(),
                tracking_state: JointTrackingState::NotTracked,
            }),
        }
    }
}

impl Skeleton {
    pub fn new(
        tracking_id: u32,
        tracking_state: SkeletonTrackingState,
        position: SkeletonPoint,
    ) -> Self {
        Self { tracking_id, tracking_state, position, ..Self::default() }
    }

    pub fn joint(&self, joint_type: JointType) -> &Joint {
        &self.joints[joint_type.index()]
    }

    pub fn set_joint(
        &mut self,
        joint_type: JointType,
        position: SkeletonPoint,
        tracking_state: JointTrackingState,
    ) {
        self.joints[joint_type.index()] = Joint { joint_type, position, tracking_state };
    }

    /// All joints in [`JointType::ALL`] order.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }
}

/// Snapshot of every body slot the sensor reported for one instant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonFrame {
    pub frame_number: u64,
    pub skeletons: Vec<Skeleton>,
}

impl SkeletonFrame {
    pub fn new(frame_number: u64, skeletons: Vec<Skeleton>) -> Self {
        Self { frame_number, skeletons }
    }

    /// Number of body slots in the frame, tracked or not.
    pub fn skeleton_array_length(&self) -> usize {
        self.skeletons.len()
    }

    pub fn tracked(&self) -> impl Iterator<Item = &Skeleton> {
        self.skeletons.iter().filter(|s| s.tracking_state == SkeletonTrackingState::Tracked)
    }
}
