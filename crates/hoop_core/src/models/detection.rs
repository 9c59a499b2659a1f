//! # Detection Records
//!
//! Typed per-frame detector output. A [`DetectionRecord`] starts with just a
//! bounding box and is progressively filled in by later stages (team, jersey
//! color, court position). Records are never removed mid-pipeline.
//!
//! Per-frame maps are `BTreeMap`s keyed by track id so that every "pick the
//! best" loop visits players in ascending id order and ties resolve to the
//! lowest id.

use std::collections::BTreeMap;

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::court::CourtKeypointSet;
use super::geometry::{BBox, Point2};
use crate::error::{PipelineError, Result};

/// Persistent tracker identity
pub type TrackId = u32;

/// Team identity: 1 or 2, [`TEAM_UNASSIGNED`] when unknown
pub type TeamId = u8;

pub const TEAM_UNASSIGNED: TeamId = 0;

/// RGB color with float channels (0-255 scale). Cluster centroids are not
/// integral, so neither is this.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }

    pub fn distance_sq(&self, other: &Rgb) -> f64 {
        let dr = self.r - other.r;
        let dg = self.g - other.g;
        let db = self.b - other.b;
        dr * dr + dg * dg + db * db
    }
}

impl From<[f64; 3]> for Rgb {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Rgb> for [f64; 3] {
    fn from(c: Rgb) -> Self {
        c.to_array()
    }
}

impl JsonSchema for Rgb {
    fn schema_name() -> String {
        "Rgb".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <[f64; 3]>::json_schema(gen)
    }
}

/// One tracked object in one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DetectionRecord {
    /// Detector box, pixels
    pub bbox: BBox,
    /// Team assigned by the team classifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamId>,
    /// Reference color of the assigned team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_color: Option<Rgb>,
    /// Dominant jersey color, sampled from the frame or supplied upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_color: Option<Rgb>,
    /// Foot position on the canonical court, meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_position: Option<Point2>,
}

impl DetectionRecord {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.dominant_color = Some(color);
        self
    }
}

/// All tracked objects of one class in one frame, keyed by track id
pub type FrameDetections = BTreeMap<TrackId, DetectionRecord>;

/// Full detection history of a clip, one entry per frame in every collection.
///
/// `players` and `balls` are required. `referees`, `nets` and `keypoints`
/// may be omitted entirely (read as "nothing detected in any frame"), but
/// when present they must cover every frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DetectionHistory {
    /// Frame rate of the source video; overrides the configured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    pub players: Vec<FrameDetections>,
    #[serde(default)]
    pub referees: Vec<FrameDetections>,
    /// Ball box per frame, `null` when not detected
    pub balls: Vec<Option<BBox>>,
    #[serde(default)]
    pub nets: Vec<FrameDetections>,
    #[serde(default)]
    pub keypoints: Vec<CourtKeypointSet>,
}

impl DetectionHistory {
    /// Empty history of `frames` frames with nothing detected.
    pub fn with_frames(frames: usize) -> Self {
        Self {
            fps: None,
            players: vec![FrameDetections::new(); frames],
            referees: Vec::new(),
            balls: vec![None; frames],
            nets: Vec::new(),
            keypoints: Vec::new(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.players.len()
    }

    /// Check that every per-frame collection has the same cardinality.
    ///
    /// Returns the frame count.
    pub fn validate_alignment(&self) -> Result<usize> {
        let expected = self.players.len();
        check_len("balls", expected, self.balls.len(), false)?;
        check_len("referees", expected, self.referees.len(), true)?;
        check_len("nets", expected, self.nets.len(), true)?;
        check_len("keypoints", expected, self.keypoints.len(), true)?;
        Ok(expected)
    }

    pub fn ball_at(&self, frame: usize) -> Option<BBox> {
        self.balls.get(frame).copied().flatten()
    }
}

fn check_len(
    collection: &'static str,
    expected: usize,
    found: usize,
    optional: bool,
) -> Result<()> {
    if found == expected || (optional && found == 0) {
        return Ok(());
    }
    Err(PipelineError::FrameCountMismatch {
        collection,
        expected,
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_accepts_omitted_optional_collections() {
        let history = DetectionHistory::with_frames(5);
        assert_eq!(history.validate_alignment().unwrap(), 5);
    }

    #[test]
    fn test_alignment_rejects_short_ball_track() {
        let mut history = DetectionHistory::with_frames(5);
        history.balls.pop();
        match history.validate_alignment() {
            Err(PipelineError::FrameCountMismatch {
                collection,
                expected,
                found,
            }) => {
                assert_eq!(collection, "balls");
                assert_eq!(expected, 5);
                assert_eq!(found, 4);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_alignment_rejects_partial_nets() {
        let mut history = DetectionHistory::with_frames(3);
        history.nets = vec![FrameDetections::new(); 2];
        assert!(history.validate_alignment().is_err());
    }

    #[test]
    fn test_history_parses_detector_json() {
        let json = r#"{
            "fps": 25.0,
            "players": [{"7": {"bbox": [0, 0, 10, 20]}}, {}],
            "balls": [[1, 1, 3, 3], null]
        }"#;
        let history: DetectionHistory = serde_json::from_str(json).unwrap();
        assert_eq!(history.fps, Some(25.0));
        assert_eq!(history.validate_alignment().unwrap(), 2);
        assert_eq!(history.players[0][&7].bbox, BBox::new(0.0, 0.0, 10.0, 20.0));
        assert!(history.ball_at(1).is_none());
        assert!(history.ball_at(9).is_none());
    }
}
