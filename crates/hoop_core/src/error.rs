use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors. Raised while building the pipeline or at its entry,
/// never from inside a per-frame stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Frame count mismatch in {collection}: expected {expected}, found {found}")]
    FrameCountMismatch {
        collection: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PipelineError {
    /// Configuration problems are the caller's to fix; everything else is
    /// an input or environment failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PipelineError::InvalidConfig(_))
    }
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(err: validator::ValidationErrors) -> Self {
        PipelineError::InvalidConfig(err.to_string())
    }
}

/// Non-fatal per-frame degradations. Stages record these and carry on with
/// an empty or sentinel result for the affected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameIssue {
    /// No ball, keypoints or frame pixels for this frame
    MissingData,
    /// Too few keypoints or colors to fit anything
    InsufficientCorrespondence,
    /// Homography could not be fitted (singular or degenerate)
    GeometryFailure,
}

impl FrameIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameIssue::MissingData => "missing_data",
            FrameIssue::InsufficientCorrespondence => "insufficient_correspondence",
            FrameIssue::GeometryFailure => "geometry_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
