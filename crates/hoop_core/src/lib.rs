//! # hoop_core - Basketball Video Inference Engine
//!
//! Turns raw per-frame detector output for a basketball clip into game
//! semantics: a gap-free ball track, court positions in meters, team
//! identities, per-frame possession and a log of shots and passes.
//!
//! ## Features
//! - Natural cubic spline ball-track interpolation
//! - Court keypoint validation and DLT homography projection
//! - Jersey-color team clustering with seeded k-means
//! - Debounced possession tracking, shot and pass event detection
//! - Deterministic output: same detections and config, same analysis
//!
//! ## Example
//! ```no_run
//! use hoop_core::{DetectionHistory, GameAnalysisPipeline, PipelineConfig};
//!
//! let json = std::fs::read_to_string("detections.json")?;
//! let mut history: DetectionHistory = serde_json::from_str(&json)?;
//! let pipeline = GameAnalysisPipeline::new(PipelineConfig::from_env_or_default())?;
//! let analysis = pipeline.run(&mut history, None)?;
//! println!("{} events", analysis.events.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Numeric kernels index several parallel arrays at once
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod analysis;
pub mod config;
pub mod court;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod team;
pub mod tracking;

pub use analysis::{
    team_ball_control, PassEventDetector, PossessionSequence, PossessionTracker,
    ShotEventDetector, ShotState, ShotStats, ShotTally, TeamControlStats,
};
pub use config::{
    BallConfig, CourtConfig, PipelineConfig, PossessionConfig, ShotConfig, TeamConfig,
    VideoConfig,
};
pub use court::{Homography, HomographyProjector, KeypointValidator};
pub use error::{FrameIssue, PipelineError, Result};
pub use models::{
    BBox, CourtKeypointSet, CourtReference, DetectionHistory, DetectionRecord, Event, EventKind,
    EventLog, FrameDetections, Point2, Rgb, TeamId, TrackId,
};
pub use pipeline::{FrameDiagnostics, GameAnalysis, GameAnalysisPipeline};
pub use team::{FrameSource, ImageDirFrames, InMemoryFrames, TeamAssignment, TeamClassifier};
pub use tracking::BallTrackInterpolator;

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
