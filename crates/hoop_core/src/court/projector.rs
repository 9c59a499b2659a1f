//! # Court Projection
//!
//! Fits one homography per frame from validated keypoints and maps every
//! player's foot point (bbox bottom-center) onto the canonical court.
//!
//! Frames never fail: without enough correspondences, or with a degenerate
//! fit, the frame simply gets no positions and the reason is reported as a
//! [`FrameIssue`]. Projections that land outside the court rectangle are
//! discarded.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use super::homography::Homography;
use crate::config::CourtConfig;
use crate::error::FrameIssue;
use crate::models::{CourtKeypointSet, CourtPoint, CourtReference, FrameDetections, TrackId};

/// Court positions of one frame, keyed by track id
pub type FramePositions = BTreeMap<TrackId, CourtPoint>;

/// Result of projecting one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameProjection {
    pub positions: FramePositions,
    /// Why the frame has no positions, if it has none for a reason
    pub issue: Option<FrameIssue>,
    /// Players whose foot point mapped outside the court
    pub off_court: usize,
}

#[derive(Debug, Clone)]
pub struct HomographyProjector {
    reference: CourtReference,
    min_keypoints: usize,
}

impl Default for HomographyProjector {
    fn default() -> Self {
        Self::new(&CourtConfig::default(), CourtReference::standard())
    }
}

impl HomographyProjector {
    pub fn new(config: &CourtConfig, reference: CourtReference) -> Self {
        Self {
            reference,
            min_keypoints: config.min_homography_keypoints.max(4),
        }
    }

    /// Fit the image-to-court homography of one frame.
    pub fn fit_frame(&self, keypoints: &CourtKeypointSet) -> Result<Homography, FrameIssue> {
        let mut src = Vec::new();
        let mut dst = Vec::new();
        for i in keypoints.detected_indices() {
            if let (Some(px), Some(court)) = (keypoints.detected(i), self.reference.point(i)) {
                src.push(px);
                dst.push(court);
            }
        }

        if src.is_empty() {
            return Err(FrameIssue::MissingData);
        }
        if src.len() < self.min_keypoints {
            return Err(FrameIssue::InsufficientCorrespondence);
        }
        Homography::fit(&src, &dst).map_err(|e| e.issue())
    }

    /// Project every player of one frame.
    pub fn project_frame(
        &self,
        keypoints: &CourtKeypointSet,
        players: &FrameDetections,
    ) -> FrameProjection {
        let homography = match self.fit_frame(keypoints) {
            Ok(h) => h,
            Err(issue) => {
                return FrameProjection {
                    issue: Some(issue),
                    ..Default::default()
                }
            }
        };

        let mut projection = FrameProjection::default();
        for (&id, record) in players {
            match homography.project(&record.bbox.foot()) {
                Some(p) if self.reference.contains(&p) => {
                    projection.positions.insert(id, p);
                }
                _ => projection.off_court += 1,
            }
        }
        projection
    }

    /// Project all frames in parallel and write `court_position` into the
    /// player records.
    ///
    /// An empty `keypoints` slice means no keypoint data for any frame.
    pub fn project_all(
        &self,
        keypoints: &[CourtKeypointSet],
        players: &mut [FrameDetections],
    ) -> Vec<FrameProjection> {
        let projections: Vec<FrameProjection> = if keypoints.is_empty() {
            vec![
                FrameProjection {
                    issue: Some(FrameIssue::MissingData),
                    ..Default::default()
                };
                players.len()
            ]
        } else {
            keypoints
                .par_iter()
                .zip(players.par_iter())
                .map(|(kps, frame)| self.project_frame(kps, frame))
                .collect()
        };

        for (frame, projection) in players.iter_mut().zip(&projections) {
            for (id, record) in frame.iter_mut() {
                record.court_position = projection.positions.get(id).copied();
            }
        }

        let projected = projections.iter().filter(|p| p.issue.is_none()).count();
        for (i, p) in projections.iter().enumerate() {
            if let Some(issue) = p.issue {
                debug!(frame = i, issue = issue.as_str(), "no court projection");
            }
        }
        info!(
            frames = projections.len(),
            projected, "court projection complete"
        );
        projections
    }
}
