//! Team identity from jersey colors.

pub mod classifier;
pub mod frames;
pub mod kmeans;

pub use classifier::{central_crop_pixels, TeamAssignment, TeamClassifier, TeamModel, TeamSummary};
pub use frames::{FrameSource, ImageDirFrames, InMemoryFrames};
pub use kmeans::{KMeans, KMeansParams};
