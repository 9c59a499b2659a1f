//! # Game Analysis Pipeline
//!
//! Batch driver over a fully materialized clip. Stages run in dependency
//! order, each consuming the complete output of the previous one:
//!
//! 1. alignment check (fatal on mismatch)
//! 2. ball-track interpolation
//! 3. keypoint validation, homography projection (parallel per frame)
//! 4. team classification (parallel bootstrap, then sequential assignment)
//! 5. possession tracking (sequential)
//! 6. shot and pass detection (sequential)
//!
//! Per-frame degradations never abort the run; they are counted in
//! [`FrameDiagnostics`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::{
    team_ball_control, PassEventDetector, PossessionSequence, PossessionTracker,
    ShotEventDetector, ShotStats, TeamControlStats,
};
use crate::config::PipelineConfig;
use crate::court::{FramePositions, FrameProjection, HomographyProjector, KeypointValidator};
use crate::error::{FrameIssue, PipelineError, Result};
use crate::models::{BBox, CourtReference, DetectionHistory, EventLog, TeamId};
use crate::team::{FrameSource, TeamAssignment, TeamClassifier};
use crate::tracking::BallTrackInterpolator;


/// Counts of tolerated per-frame problems
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrameDiagnostics {
    /// Frames where the detector reported no ball
    pub missing_ball_frames: usize,
    /// Keypoints rejected by ratio validation
    pub rejected_keypoints: usize,
    /// Frames without a single usable keypoint
    pub missing_keypoint_frames: usize,
    /// Frames with too few keypoints for a homography
    pub insufficient_correspondence_frames: usize,
    /// Frames whose homography fit was degenerate
    pub geometry_failure_frames: usize,
    /// Player projections that fell outside the court
    pub off_court_projections: usize,
    /// Player records left without a team
    pub unassigned_player_records: usize,
}

impl FrameDiagnostics {
    fn record_projection(&mut self, projection: &FrameProjection) {
        self.off_court_projections += projection.off_court;
        match projection.issue {
            Some(FrameIssue::MissingData) => self.missing_keypoint_frames += 1,
            Some(FrameIssue::InsufficientCorrespondence) => {
                self.insufficient_correspondence_frames += 1
            }
            Some(FrameIssue::GeometryFailure) => self.geometry_failure_frames += 1,
            None => {}
        }
    }
}

/// Everything the pipeline produces for one clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GameAnalysis {
    pub frame_count: usize,
    pub fps: f64,
    /// Dense ball track; the all-zero box means no ball
    pub ball_track: Vec<BBox>,
    /// Holder per frame, `-1` when nobody has the ball
    #[serde(with = "possession_wire")]
    #[schemars(with = "Vec<i64>")]
    pub possession: PossessionSequence,
    /// Track id → team id (0 = unassigned)
    pub team_assignment: TeamAssignment,
    /// Per frame, court positions (meters) of successfully projected players
    pub court_positions: Vec<FramePositions>,
    /// Controlling team per frame (0 = nobody)
    pub team_control: Vec<TeamId>,
    pub team_control_stats: TeamControlStats,
    pub events: EventLog,
    pub shot_stats: ShotStats,
    pub diagnostics: FrameDiagnostics,
}

mod possession_wire {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::TrackId;

    pub fn serialize<S: Serializer>(
        seq: &[Option<TrackId>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(seq.iter().map(|h| h.map_or(-1i64, i64::from)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Option<TrackId>>, D::Error> {
        Vec::<i64>::deserialize(deserializer)?
            .into_iter()
            .map(|v| {
                if v < 0 {
                    Ok(None)
                } else {
                    TrackId::try_from(v).map(Some).map_err(D::Error::custom)
                }
            })
            .collect()
    }
}

/// Runs every stage over a clip
#[derive(Debug, Clone)]
pub struct GameAnalysisPipeline {
    config: PipelineConfig,
    reference: CourtReference,
}

impl GameAnalysisPipeline {
    /// Build a pipeline; invalid configuration is rejected here and only
    /// here.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.ensure_valid()?;
        Ok(Self {
            config,
            reference: CourtReference::standard(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn effective_fps(&self, history: &DetectionHistory) -> f64 {
        match history.fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            Some(fps) => {
                warn!(fps, fallback = self.config.video.fps, "ignoring invalid fps in detections");
                self.config.video.fps
            }
            None => self.config.video.fps,
        }
    }

    /// Analyze a clip. `history` is filled in place with teams, colors and
    /// court positions.
    pub fn run(
        &self,
        history: &mut DetectionHistory,
        frames: Option<&dyn FrameSource>,
    ) -> Result<GameAnalysis> {
        let frame_count = history.validate_alignment()?;
        if let Some(source) = frames {
            if source.len() != frame_count {
                return Err(PipelineError::FrameCountMismatch {
                    collection: "frames",
                    expected: frame_count,
                    found: source.len(),
                });
            }
        }
        let fps = self.effective_fps(history);
        info!(frames = frame_count, fps, with_pixels = frames.is_some(), "analysis started");

        let mut diagnostics = FrameDiagnostics {
            missing_ball_frames: history
                .balls
                .iter()
                .filter(|b| b.map_or(true, |b| b.is_sentinel()))
                .count(),
            ..FrameDiagnostics::default()
        };

        let ball_track = BallTrackInterpolator::new(&self.config.ball).interpolate(&history.balls);

        let validator = KeypointValidator::new(&self.config.court, self.reference.clone());
        diagnostics.rejected_keypoints = validator.validate_all(&mut history.keypoints);

        let projector = HomographyProjector::new(&self.config.court, self.reference.clone());
        let projections = projector.project_all(&history.keypoints, &mut history.players);
        for projection in &projections {
            diagnostics.record_projection(projection);
        }
        let court_positions: Vec<FramePositions> =
            projections.into_iter().map(|p| p.positions).collect();

        let mut classifier = TeamClassifier::new(&self.config.team);
        let teams = classifier.assign_all(&mut history.players, frames);
        diagnostics.unassigned_player_records = teams.unassigned_records;
        let team_assignment = teams.assignment;

        let possession =
            PossessionTracker::new(&self.config.possession).track(&ball_track, &history.players);

        let mut shot_detector = ShotEventDetector::new(&self.config.shots, fps);
        let shots = shot_detector.detect(
            &ball_track,
            &history.nets,
            &possession,
            &court_positions,
            &team_assignment,
        );
        let passes =
            PassEventDetector::new(fps).detect(&possession, &team_assignment, &court_positions);
        let (team_control, team_control_stats) = team_ball_control(&possession, &team_assignment);
        let events = EventLog::merged(shots, passes);

        info!(
            frames = frame_count,
            events = events.len(),
            attempts = shot_detector.stats().overall.attempts,
            makes = shot_detector.stats().overall.makes,
            team1_share = team_control_stats.team1_share,
            team2_share = team_control_stats.team2_share,
            "analysis complete"
        );

        Ok(GameAnalysis {
            frame_count,
            fps,
            ball_track,
            possession,
            team_assignment,
            court_positions,
            team_control,
            team_control_stats,
            events,
            shot_stats: shot_detector.stats().clone(),
            diagnostics,
        })
    }
}
