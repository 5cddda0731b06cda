//! Core types shared by the sensor backends and the render side.
//!
//! - [`SensorStatus`] and [`StatusMessageTable`] describe device state and the
//!   text shown for it in the overlay
//! - [`StreamKind`], [`StreamRequest`], [`ColorImageFormat`] and
//!   [`DepthImageFormat`] describe the sub-streams a sensor can emit
//! - [`SkeletonFrame`], [`Skeleton`] and [`Joint`] carry tracked bodies in
//!   sensor space (meters)
//! - [`Vector2`], [`Rect`] and [`Color`] are screen-space primitives
//!
//! ```rust
//! use motionlink::types::{JointTrackingState, JointType, Skeleton, SkeletonPoint, SkeletonTrackingState};
//!
//! let mut body = Skeleton::new(1, SkeletonTrackingState::Tracked, SkeletonPoint::new(0.0, 0.0, 2.0));
//! body.set_joint(JointType::Head, SkeletonPoint::new(0.0, 0.7, 2.0), JointTrackingState::Tracked);
//! assert_eq!(body.joint(JointType::Head).tracking_state, JointTrackingState::Tracked);
//! ```

mod formats;
mod geometry;
mod skeleton;
mod status;

pub use formats::{ColorImageFormat, DepthImageFormat, StreamKind, StreamRequest};
pub use geometry::{Color, Rect, Vector2};
pub use skeleton::{
    DepthImagePoint, Joint, JointTrackingState, JointType, MAX_SKELETONS, Skeleton,
    SkeletonFrame, SkeletonPoint, SkeletonTrackingState,
};
pub use status::{SensorStatus, StatusMessageTable};
