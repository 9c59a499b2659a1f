//! Court keypoint validation and image-to-court projection.

pub mod homography;
pub mod projector;
pub mod validator;

pub use homography::{Homography, HomographyFailure};
pub use projector::{FramePositions, FrameProjection, HomographyProjector};
pub use validator::KeypointValidator;
