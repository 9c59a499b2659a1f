//! # Pipeline Configuration
//!
//! Every tunable of the inference stages lives here instead of being
//! hard-coded inside the stage. Values can come from a preset, from the
//! `HOOP_PROFILE` environment variable, or from a YAML/JSON file.
//!
//! ## Sections
//!
//! | Section | Stage |
//! |---------|-------|
//! | `video` | timestamps |
//! | `ball` | ball-track interpolation |
//! | `court` | keypoint validation, homography |
//! | `team` | jersey color clustering |
//! | `possession` | possession debounce / retention |
//! | `shots` | shot state machine |
//!
//! ## Usage
//!
//! ```rust
//! use hoop_core::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! assert!(config.ensure_valid().is_ok());
//!
//! // Far broadcast camera: smaller players, tighter pixel thresholds
//! let broadcast = PipelineConfig::broadcast();
//! assert!(broadcast.possession.possession_threshold_px < config.possession.possession_threshold_px);
//! ```
//!
//! ## Environment Variables
//!
//! - `HOOP_PROFILE`: Select preset (broadcast, close_up, default)

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::Result;

/// Complete configuration for [`crate::pipeline::GameAnalysisPipeline`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate]
    pub video: VideoConfig,
    #[validate]
    pub ball: BallConfig,
    #[validate]
    pub court: CourtConfig,
    #[validate]
    pub team: TeamConfig,
    #[validate]
    pub possession: PossessionConfig,
    #[validate]
    pub shots: ShotConfig,
}

impl PipelineConfig {
    /// Far, wide broadcast camera: players and hoop are small on screen
    pub fn broadcast() -> Self {
        Self {
            possession: PossessionConfig {
                possession_threshold_px: 35.0,
                ..PossessionConfig::default()
            },
            shots: ShotConfig {
                approach_margin_px: 40.0,
                net_margin_px: 3.0,
                ..ShotConfig::default()
            },
            ..Self::default()
        }
    }

    /// Near, courtside camera: players and hoop fill much of the frame
    pub fn close_up() -> Self {
        Self {
            possession: PossessionConfig {
                possession_threshold_px: 80.0,
                ..PossessionConfig::default()
            },
            shots: ShotConfig {
                approach_margin_px: 100.0,
                net_margin_px: 8.0,
                ..ShotConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load from environment variable HOOP_PROFILE or use default
    pub fn from_env_or_default() -> Self {
        match env::var("HOOP_PROFILE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "broadcast" => Self::broadcast(),
            "close_up" | "closeup" => Self::close_up(),
            _ => Self::default(),
        }
    }

    /// Read a YAML (`.yaml`/`.yml`) or JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        debug!(path = %path.display(), yaml = is_yaml, "loaded pipeline config");
        config.ensure_valid()?;
        Ok(config)
    }

    /// Run every validation rule, mapping failures to
    /// [`crate::error::PipelineError::InvalidConfig`].
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_video"))]
pub struct VideoConfig {
    /// Frames per second, used for event timestamps
    pub fps: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self { fps: 30.0 }
    }
}

fn validate_video(video: &VideoConfig) -> std::result::Result<(), ValidationError> {
    if video.fps.is_finite() && video.fps > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("fps_must_be_positive"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BallConfig {
    /// Known frames needed before interpolating; fewer yields the no-ball
    /// sentinel everywhere
    #[validate(range(min = 2))]
    pub min_known_frames: usize,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            min_known_frames: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CourtConfig {
    /// Maximum relative error between detected and reference distance
    /// ratios before a keypoint is rejected
    #[validate(range(min = 0.0, max = 10.0))]
    pub keypoint_ratio_tolerance: f64,
    /// Detected keypoints needed before validation runs (needs i, j, k)
    #[validate(range(min = 3))]
    pub min_validation_keypoints: usize,
    /// Valid correspondences needed to fit a homography
    #[validate(range(min = 4))]
    pub min_homography_keypoints: usize,
}

impl Default for CourtConfig {
    fn default() -> Self {
        Self {
            keypoint_ratio_tolerance: 0.8,
            min_validation_keypoints: 3,
            min_homography_keypoints: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TeamConfig {
    /// Leading frames sampled to fit the team color model
    #[validate(range(min = 1))]
    pub bootstrap_frames: usize,
    /// Side of the central jersey crop relative to the shorter bbox side
    #[validate(range(min = 0.05, max = 1.0))]
    pub crop_fraction: f64,
    /// Clusters used to separate jersey from background inside a crop
    #[validate(range(min = 1, max = 8))]
    pub max_color_clusters: usize,
    /// Lloyd iterations per k-means run
    #[validate(range(min = 1))]
    pub kmeans_max_iterations: usize,
    /// Independent k-means++ restarts; lowest inertia wins
    #[validate(range(min = 1))]
    pub kmeans_restarts: usize,
    /// Seed for k-means++ initialisation
    pub seed: u64,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            bootstrap_frames: 30,
            crop_fraction: 1.0 / 3.0,
            max_color_clusters: 3,
            kmeans_max_iterations: 25,
            kmeans_restarts: 4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PossessionConfig {
    /// Share of the ball box inside a player box that counts as "holding"
    #[validate(range(min = 0.0, max = 1.0))]
    pub containment_threshold: f64,
    /// Maximum anchor distance for a regular candidate, pixels
    #[validate(range(min = 0.0))]
    pub possession_threshold_px: f64,
    /// Consecutive frames a candidate needs before it is confirmed
    #[validate(range(min = 1))]
    pub min_frames: usize,
    /// Frames the last holder keeps possession without a candidate
    pub possession_retention: usize,
}

impl Default for PossessionConfig {
    fn default() -> Self {
        Self {
            containment_threshold: 0.8,
            possession_threshold_px: 50.0,
            min_frames: 4,
            possession_retention: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_shots"))]
pub struct ShotConfig {
    /// Ball-center history length
    #[validate(range(min = 2))]
    pub trajectory_len: usize,
    /// Strictly increasing y values needed to call the ball descending
    #[validate(range(min = 2))]
    pub min_descending_frames: usize,
    /// Hoop box inflation defining "close to hoop", pixels
    #[validate(range(min = 0.0))]
    pub approach_margin_px: f64,
    /// Net box inflation for the inside test, pixels
    #[validate(range(min = 0.0))]
    pub net_margin_px: f64,
    /// Recent frames searched for an inside-net sample
    #[validate(range(min = 1))]
    pub net_window: usize,
    /// Consecutive outside frames after which the attempt is a miss
    #[validate(range(min = 1))]
    pub max_outside_net_frames: usize,
    /// Frames ignored after an event
    #[validate(range(min = 1))]
    pub cooldown_frames: usize,
}

impl Default for ShotConfig {
    fn default() -> Self {
        Self {
            trajectory_len: 10,
            min_descending_frames: 3,
            approach_margin_px: 60.0,
            net_margin_px: 5.0,
            net_window: 5,
            max_outside_net_frames: 8,
            cooldown_frames: 30,
        }
    }
}

fn validate_shots(shots: &ShotConfig) -> std::result::Result<(), ValidationError> {
    if shots.min_descending_frames > shots.trajectory_len {
        return Err(ValidationError::new(
            "min_descending_frames_exceeds_trajectory_len",
        ));
    }
    Ok(())
}
