//! # Ball Possession
//!
//! Attributes ball control to one player per frame.
//!
//! ## Candidate selection
//!
//! For every player in the frame:
//! - containment = share of the ball box inside the player box
//! - distance = ball center to the nearest of the player's 10 anchor points
//!
//! Players with containment above `containment_threshold` always beat the
//! rest; among them the smallest distance wins. Otherwise the closest
//! player wins, but only within `possession_threshold_px`. Ties go to the
//! lowest track id.
//!
//! ## State machine
//!
//! | Input | Effect |
//! |-------|--------|
//! | candidate == holder | holder credited, retention refilled |
//! | candidate seen `min_frames` times in a row | candidate becomes holder |
//! | challenger still debouncing | holder credited, retention consumed |
//! | no candidate | holder credited, retention consumed, streak cleared |
//! | retention exhausted | holder cleared |
//!
//! Output is produced frame by frame; earlier frames are never rewritten.

use serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use tracing::{debug, info};

use crate::config::PossessionConfig;
use crate::models::{BBox, FrameDetections, TeamId, TrackId, TEAM_UNASSIGNED};
use crate::team::TeamAssignment;

/// Holder per frame, `None` when nobody controls the ball
pub type PossessionSequence = Vec<Option<TrackId>>;

#[derive(Debug, Clone)]
pub struct PossessionTracker {
    config: PossessionConfig,
    /// Current candidate and how many consecutive frames it has been selected
    streak: Option<(TrackId, usize)>,
    holder: Option<TrackId>,
    retention_left: usize,
}

impl Default for PossessionTracker {
    fn default() -> Self {
        Self::new(&PossessionConfig::default())
    }
}

impl PossessionTracker {
    pub fn new(config: &PossessionConfig) -> Self {
        Self {
            config: config.clone(),
            streak: None,
            holder: None,
            retention_left: 0,
        }
    }

    pub fn holder(&self) -> Option<TrackId> {
        self.holder
    }

    pub fn reset(&mut self) {
        self.streak = None;
        self.holder = None;
        self.retention_left = 0;
    }

    /// Pick this frame's possession candidate.
    ///
    /// `ball` is `None` (or the sentinel box) when there is no ball.
    pub fn select_candidate(&self, ball: Option<&BBox>, players: &FrameDetections) -> Option<TrackId> {
        let ball = ball.filter(|b| !b.is_sentinel())?;
        let center = ball.center();

        let mut best_high: Option<(TrackId, f64)> = None;
        let mut best_regular: Option<(TrackId, f64)> = None;
        for (&id, record) in players {
            let containment = record.bbox.containment_of(ball);
            let distance = record.bbox.min_anchor_distance(&center);
            let slot = if containment > self.config.containment_threshold {
                &mut best_high
            } else {
                &mut best_regular
            };
            if slot.map_or(true, |(_, d)| distance < d) {
                *slot = Some((id, distance));
            }
        }

        if let Some((id, _)) = best_high {
            return Some(id);
        }
        best_regular
            .filter(|(_, d)| *d < self.config.possession_threshold_px)
            .map(|(id, _)| id)
    }

    /// Advance one frame with this frame's candidate; returns the holder.
    pub fn update(&mut self, candidate: Option<TrackId>) -> Option<TrackId> {
        let Some(c) = candidate else {
            self.streak = None;
            return self.retain();
        };

        let count = match self.streak {
            Some((id, n)) if id == c => n + 1,
            _ => 1,
        };
        self.streak = Some((c, count));

        if self.holder == Some(c) || count >= self.config.min_frames {
            if self.holder != Some(c) {
                debug!(holder = c, previous = ?self.holder, "possession confirmed");
            }
            self.holder = Some(c);
            self.retention_left = self.config.possession_retention;
            return self.holder;
        }
        self.retain()
    }

    /// Credit the holder without a supporting candidate.
    fn retain(&mut self) -> Option<TrackId> {
        self.holder?;
        if self.retention_left > 0 {
            self.retention_left -= 1;
        } else {
            debug!(holder = ?self.holder, "possession expired");
            self.holder = None;
        }
        self.holder
    }

    /// Run over a whole clip. `balls` is the interpolated ball track.
    pub fn track(&mut self, balls: &[BBox], players: &[FrameDetections]) -> PossessionSequence {
        self.reset();
        let out: PossessionSequence = balls
            .iter()
            .zip(players)
            .map(|(ball, frame)| {
                let candidate = self.select_candidate(Some(ball), frame);
                self.update(candidate)
            })
            .collect();

        let held = out.iter().filter(|h| h.is_some()).count();
        info!(frames = out.len(), held, "possession tracked");
        out
    }
}

/// Team ball-control totals over a clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TeamControlStats {
    pub team1_frames: usize,
    pub team2_frames: usize,
    pub total_frames: usize,
    /// Share of all frames, 0.0-1.0
    pub team1_share: f64,
    pub team2_share: f64,
}

/// Controlling team per frame ([`TEAM_UNASSIGNED`] when nobody holds the
/// ball or the holder has no team) plus clip totals.
pub fn team_ball_control(
    possession: &[Option<TrackId>],
    teams: &TeamAssignment,
) -> (Vec<TeamId>, TeamControlStats) {
    let per_frame: Vec<TeamId> = possession
        .iter()
        .map(|holder| {
            holder
                .and_then(|id| teams.get(&id).copied())
                .filter(|t| *t == 1 || *t == 2)
                .unwrap_or(TEAM_UNASSIGNED)
        })
        .collect();

    let total = per_frame.len();
    let team1 = per_frame.iter().filter(|t| **t == 1).count();
    let team2 = per_frame.iter().filter(|t| **t == 2).count();
    let share = |n: usize| if total > 0 { n as f64 / total as f64 } else { 0.0 };

    let stats = TeamControlStats {
        team1_frames: team1,
        team2_frames: team2,
        total_frames: total,
        team1_share: share(team1),
        team2_share: share(team2),
    };
    (per_frame, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionRecord;

    fn config(min_frames: usize, retention: usize) -> PossessionConfig {
        PossessionConfig {
            min_frames,
            possession_retention: retention,
            ..PossessionConfig::default()
        }
    }

    fn players(boxes: &[(TrackId, BBox)]) -> FrameDetections {
        boxes
            .iter()
            .map(|(id, b)| (*id, DetectionRecord::new(*b)))
            .collect()
    }

    #[test]
    fn test_high_containment_beats_closer_player() {
        let tracker = PossessionTracker::default();
        // Ball fully inside player 2's box, but player 1's corner is closer
        let ball = BBox::new(100.0, 100.0, 110.0, 110.0);
        let frame = players(&[
            (1, BBox::new(106.0, 111.0, 150.0, 200.0)),
            (2, BBox::new(40.0, 60.0, 160.0, 400.0)),
        ]);
        assert_eq!(tracker.select_candidate(Some(&ball), &frame), Some(2));
    }

    #[test]
    fn test_regular_candidate_needs_threshold() {
        let tracker = PossessionTracker::default();
        let ball = BBox::new(0.0, 0.0, 10.0, 10.0);
        let near = players(&[(3, BBox::new(40.0, 0.0, 80.0, 100.0))]);
        let far = players(&[(3, BBox::new(100.0, 0.0, 140.0, 100.0))]);
        assert_eq!(tracker.select_candidate(Some(&ball), &near), Some(3));
        assert_eq!(tracker.select_candidate(Some(&ball), &far), None);
    }

    #[test]
    fn test_no_ball_no_candidate() {
        let tracker = PossessionTracker::default();
        let frame = players(&[(1, BBox::new(0.0, 0.0, 10.0, 10.0))]);
        assert_eq!(tracker.select_candidate(None, &frame), None);
        assert_eq!(tracker.select_candidate(Some(&BBox::SENTINEL), &frame), None);
    }

    #[test]
    fn test_tie_goes_to_lowest_id() {
        let tracker = PossessionTracker::default();
        let ball = BBox::new(48.0, 0.0, 52.0, 4.0);
        let frame = players(&[
            (7, BBox::new(60.0, 0.0, 100.0, 100.0)),
            (5, BBox::new(0.0, 0.0, 40.0, 100.0)),
        ]);
        assert_eq!(tracker.select_candidate(Some(&ball), &frame), Some(5));
    }

    #[test]
    fn test_debounce_short_streak_never_confirms() {
        let mut tracker = PossessionTracker::new(&config(4, 10));
        let seq = [Some(1), Some(1), Some(1), Some(2), Some(2), None];
        let out: Vec<_> = seq.iter().map(|c| tracker.update(*c)).collect();
        assert!(out.iter().all(|h| h.is_none()));
    }

    #[test]
    fn test_retention_window() {
        let mut tracker = PossessionTracker::new(&config(2, 3));
        assert_eq!(tracker.update(Some(9)), None);
        assert_eq!(tracker.update(Some(9)), Some(9));
        assert_eq!(tracker.update(None), Some(9));
        assert_eq!(tracker.update(None), Some(9));
        assert_eq!(tracker.update(None), Some(9));
        assert_eq!(tracker.update(None), None);
        // Counters cleared: a single sighting is not enough again
        assert_eq!(tracker.update(Some(9)), None);
    }

    #[test]
    fn test_challenger_debounce_consumes_retention() {
        let mut tracker = PossessionTracker::new(&config(3, 5));
        for _ in 0..3 {
            tracker.update(Some(1));
        }
        assert_eq!(tracker.holder(), Some(1));
        assert_eq!(tracker.update(Some(2)), Some(1));
        assert_eq!(tracker.update(Some(2)), Some(1));
        assert_eq!(tracker.update(Some(2)), Some(2));
    }

    #[test]
    fn test_gap_shorter_than_retention_keeps_holder() {
        let mut tracker = PossessionTracker::new(&config(4, 3));
        let mut seq = vec![Some(1); 10];
        seq.extend([None, None]);
        seq.extend(vec![Some(1); 10]);

        let out: Vec<_> = seq.iter().map(|c| tracker.update(*c)).collect();
        assert_eq!(&out[..3], &[None, None, None]);
        assert!(out[3..].iter().all(|h| *h == Some(1)));
    }

    #[test]
    fn test_track_over_clip() {
        let mut tracker = PossessionTracker::new(&config(2, 1));
        let ball = BBox::new(20.0, 20.0, 30.0, 30.0);
        let frame = players(&[(4, BBox::new(0.0, 0.0, 60.0, 120.0))]);
        let balls = vec![ball, ball, BBox::SENTINEL, BBox::SENTINEL];
        let out = tracker.track(&balls, &vec![frame; 4]);
        assert_eq!(out, vec![None, Some(4), Some(4), None]);
    }

    #[test]
    fn test_track_starts_from_fresh_state() {
        let mut tracker = PossessionTracker::new(&config(2, 1));
        tracker.update(Some(9));
        tracker.update(Some(9));
        assert_eq!(tracker.holder(), Some(9));

        let ball = BBox::new(20.0, 20.0, 30.0, 30.0);
        let frame = players(&[(4, BBox::new(0.0, 0.0, 60.0, 120.0))]);
        let out = tracker.track(&[ball, ball], &vec![frame; 2]);
        assert_eq!(out, vec![None, Some(4)]);
    }

    #[test]
    fn test_team_ball_control() {
        let mut teams = TeamAssignment::new();
        teams.insert(1, 1);
        teams.insert(2, 2);
        teams.insert(3, 0);
        let possession = vec![Some(1), Some(1), Some(2), None, Some(3), Some(8)];
        let (per_frame, stats) = team_ball_control(&possession, &teams);
        assert_eq!(per_frame, vec![1, 1, 2, 0, 0, 0]);
        assert_eq!(stats.team1_frames, 2);
        assert_eq!(stats.team2_frames, 1);
        assert!((stats.team1_share - 2.0 / 6.0).abs() < 1e-12);
        let (_, empty) = team_ball_control(&[], &teams);
        assert_eq!(empty.team1_share, 0.0);
    }
}

#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_streak_below_min_frames_never_confirms(
            min_frames in 2usize..8,
            ids in prop::collection::vec(1u32..4, 1..40),
        ) {
            // Each id appears in runs strictly shorter than min_frames
            let mut seq = Vec::new();
            for (i, id) in ids.iter().enumerate() {
                let run = 1 + i % (min_frames - 1);
                let id = if seq.last() == Some(&Some(*id)) { id + 10 } else { *id };
                seq.extend(std::iter::repeat(Some(id)).take(run));
            }
            let mut tracker = PossessionTracker::new(&PossessionConfig {
                min_frames,
                ..PossessionConfig::default()
            });
            for c in seq {
                prop_assert_eq!(tracker.update(c), None);
            }
        }

        #[test]
        fn prop_retention_bound(retention in 0usize..15, min_frames in 1usize..6) {
            let mut tracker = PossessionTracker::new(&PossessionConfig {
                min_frames,
                possession_retention: retention,
                ..PossessionConfig::default()
            });
            for _ in 0..min_frames {
                tracker.update(Some(1));
            }
            prop_assert_eq!(tracker.holder(), Some(1));
            for _ in 0..retention {
                prop_assert_eq!(tracker.update(None), Some(1));
            }
            prop_assert_eq!(tracker.update(None), None);
        }
    }
}
