//! # Shot Detection
//!
//! Detects made and missed shot attempts from the ball trajectory relative
//! to the hoop.
//!
//! ## State machine
//!
//! ```text
//!            descending & close          made / missed
//!   IDLE ───────────────────────▶ IN_PROGRESS ─────────────▶ COOLDOWN
//!    ▲                               │  left approach region      │
//!    │◀──────────────────────────────┘  or missing data           │
//!    │◀─────────────────────────────────────── cooldown_frames ───┘
//! ```
//!
//! - **descending**: the last `min_descending_frames` ball-center y values
//!   strictly increase (image y grows downward)
//! - **close**: ball center inside the hoop box inflated by
//!   `approach_margin_px`
//! - **inside**: ball center inside the hoop box inflated by `net_margin_px`
//! - **made**: inside during the last `net_window` frames, outside now, still
//!   descending over the last two points, still close
//! - **missed**: outside for more than `max_outside_net_frames` consecutive
//!   frames while still close
//!
//! A frame without a ball or without any hoop resets IDLE / IN_PROGRESS to
//! IDLE and drops all history. Cooldown keeps counting through such frames.
//!
//! The primary hoop of a frame is the hoop box whose center is nearest the
//! ball center (lowest track id on ties).
//!
//! Attempts are attributed to the last confirmed possession holder seen
//! before or on the event frame.

use std::collections::{BTreeMap, VecDeque};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ShotConfig;
use crate::court::FramePositions;
use crate::models::{
    BBox, CourtPoint, Event, EventLog, FrameDetections, Point2, TeamId, TrackId, TEAM_UNASSIGNED,
};
use crate::team::TeamAssignment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotState {
    Idle,
    InProgress,
    Cooldown { remaining: usize },
}

/// Makes and attempts for one scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ShotTally {
    pub makes: u32,
    pub attempts: u32,
}

impl ShotTally {
    /// makes / attempts, 0.0 without attempts
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.makes as f64 / self.attempts as f64
        }
    }

    fn record(&mut self, made: bool) {
        self.attempts += 1;
        if made {
            self.makes += 1;
        }
    }
}

/// Running shot counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotStats {
    pub overall: ShotTally,
    pub teams: BTreeMap<TeamId, ShotTally>,
    pub players: BTreeMap<TrackId, ShotTally>,
}

impl Default for ShotStats {
    fn default() -> Self {
        let mut teams = BTreeMap::new();
        teams.insert(1, ShotTally::default());
        teams.insert(2, ShotTally::default());
        Self {
            overall: ShotTally::default(),
            teams,
            players: BTreeMap::new(),
        }
    }
}

impl ShotStats {
    pub fn record(&mut self, made: bool, player: Option<TrackId>, team: TeamId) {
        self.overall.record(made);
        if team != TEAM_UNASSIGNED {
            self.teams.entry(team).or_default().record(made);
        }
        if let Some(id) = player {
            self.players.entry(id).or_default().record(made);
        }
    }

    pub fn team(&self, team: TeamId) -> ShotTally {
        self.teams.get(&team).copied().unwrap_or_default()
    }

    pub fn player(&self, id: TrackId) -> ShotTally {
        self.players.get(&id).copied().unwrap_or_default()
    }
}

/// Everything the detector looks at for one frame
#[derive(Debug, Clone, Copy)]
pub struct ShotInput<'a> {
    pub frame: usize,
    /// Ball box; `None` or the sentinel box when there is no ball
    pub ball: Option<BBox>,
    /// Hoop detections of this frame
    pub nets: Option<&'a FrameDetections>,
    /// Confirmed possession holder of this frame
    pub holder: Option<TrackId>,
    /// Court positions of this frame
    pub positions: Option<&'a FramePositions>,
}

#[derive(Debug, Clone)]
pub struct ShotEventDetector {
    config: ShotConfig,
    fps: f64,
    state: ShotState,
    trajectory: VecDeque<Point2>,
    /// Inside-net flags of recent IN_PROGRESS frames
    net_history: VecDeque<bool>,
    outside_frames: usize,
    last_holder: Option<TrackId>,
    last_positions: BTreeMap<TrackId, CourtPoint>,
    stats: ShotStats,
}

impl ShotEventDetector {
    pub fn new(config: &ShotConfig, fps: f64) -> Self {
        Self {
            config: config.clone(),
            fps,
            state: ShotState::Idle,
            trajectory: VecDeque::with_capacity(config.trajectory_len),
            net_history: VecDeque::with_capacity(config.net_window),
            outside_frames: 0,
            last_holder: None,
            last_positions: BTreeMap::new(),
            stats: ShotStats::default(),
        }
    }

    pub fn state(&self) -> ShotState {
        self.state
    }

    pub fn stats(&self) -> &ShotStats {
        &self.stats
    }

    fn clear_history(&mut self) {
        self.trajectory.clear();
        self.net_history.clear();
        self.outside_frames = 0;
    }

    fn is_descending(&self) -> bool {
        let k = self.config.min_descending_frames;
        let n = self.trajectory.len();
        if n < k || k < 2 {
            return false;
        }
        self.trajectory
            .iter()
            .skip(n - k)
            .zip(self.trajectory.iter().skip(n - k + 1))
            .all(|(a, b)| b.y > a.y)
    }

    fn last_step_descends(&self) -> bool {
        let n = self.trajectory.len();
        n >= 2 && self.trajectory[n - 1].y > self.trajectory[n - 2].y
    }

    /// Advance one frame. Returns the event fired on this frame, if any.
    pub fn step(&mut self, input: &ShotInput<'_>, teams: &TeamAssignment) -> Option<Event> {
        if input.holder.is_some() {
            self.last_holder = input.holder;
        }
        if let Some(positions) = input.positions {
            self.last_positions
                .extend(positions.iter().map(|(id, p)| (*id, *p)));
        }

        if let ShotState::Cooldown { remaining } = self.state {
            self.state = if remaining <= 1 {
                ShotState::Idle
            } else {
                ShotState::Cooldown {
                    remaining: remaining - 1,
                }
            };
            return None;
        }

        let ball = input.ball.filter(|b| !b.is_sentinel());
        let hoop = ball.and_then(|b| primary_hoop(&b.center(), input.nets));
        let (Some(ball), Some(hoop)) = (ball, hoop) else {
            if self.state == ShotState::InProgress {
                debug!(frame = input.frame, "shot attempt dropped on missing ball/hoop");
            }
            self.state = ShotState::Idle;
            self.clear_history();
            return None;
        };

        let center = ball.center();
        if self.trajectory.len() == self.config.trajectory_len {
            self.trajectory.pop_front();
        }
        self.trajectory.push_back(center);
        let close = hoop.inflate(self.config.approach_margin_px).contains(&center);
        let inside = hoop.inflate(self.config.net_margin_px).contains(&center);

        match self.state {
            ShotState::Idle => {
                if close && self.is_descending() {
                    debug!(frame = input.frame, inside, "shot attempt started");
                    self.state = ShotState::InProgress;
                    // The starting frame counts toward the net window
                    self.net_history.clear();
                    self.net_history.push_back(inside);
                    self.outside_frames = usize::from(!inside);
                }
                None
            }
            ShotState::InProgress => {
                if !close {
                    debug!(frame = input.frame, "ball left hoop area; attempt abandoned");
                    self.state = ShotState::Idle;
                    self.net_history.clear();
                    self.outside_frames = 0;
                    return None;
                }

                let was_inside = self.net_history.iter().any(|f| *f);
                if self.net_history.len() == self.config.net_window {
                    self.net_history.pop_front();
                }
                self.net_history.push_back(inside);
                if inside {
                    self.outside_frames = 0;
                } else {
                    self.outside_frames += 1;
                }

                if !inside && was_inside && self.last_step_descends() {
                    Some(self.register(true, input, teams))
                } else if self.outside_frames > self.config.max_outside_net_frames {
                    Some(self.register(false, input, teams))
                } else {
                    None
                }
            }
            ShotState::Cooldown { .. } => None,
        }
    }

    fn register(&mut self, made: bool, input: &ShotInput<'_>, teams: &TeamAssignment) -> Event {
        let shooter = self.last_holder;
        let team = shooter
            .and_then(|id| teams.get(&id).copied())
            .unwrap_or(TEAM_UNASSIGNED);
        let position = shooter.and_then(|id| {
            input
                .positions
                .and_then(|p| p.get(&id).copied())
                .or_else(|| self.last_positions.get(&id).copied())
        });

        self.stats.record(made, shooter, team);
        let event = Event::shot(made, input.frame, self.fps, shooter, team, position);
        info!(
            frame = input.frame,
            made,
            shooter = ?shooter,
            team,
            clock = %event.clock,
            "shot registered"
        );

        self.state = ShotState::Cooldown {
            remaining: self.config.cooldown_frames,
        };
        self.clear_history();
        event
    }

    /// Run over a whole clip.
    ///
    /// `nets` and `positions` may be empty (no data for any frame).
    pub fn detect(
        &mut self,
        balls: &[BBox],
        nets: &[FrameDetections],
        possession: &[Option<TrackId>],
        positions: &[FramePositions],
        teams: &TeamAssignment,
    ) -> EventLog {
        let mut log = EventLog::new();
        for (frame, ball) in balls.iter().enumerate() {
            let input = ShotInput {
                frame,
                ball: Some(*ball),
                nets: nets.get(frame),
                holder: possession.get(frame).copied().flatten(),
                positions: positions.get(frame),
            };
            if let Some(event) = self.step(&input, teams) {
                log.push(event);
            }
        }
        info!(
            frames = balls.len(),
            attempts = self.stats.overall.attempts,
            makes = self.stats.overall.makes,
            "shot detection complete"
        );
        log
    }
}

/// Hoop box nearest the ball; lowest track id on ties.
fn primary_hoop(ball_center: &Point2, nets: Option<&FrameDetections>) -> Option<BBox> {
    let mut best: Option<(BBox, f64)> = None;
    for record in nets?.values() {
        let d = record.bbox.center().distance(ball_center);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((record.bbox, d));
        }
    }
    best.map(|(b, _)| b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionRecord, EventKind};

    const HOOP: BBox = BBox::new(300.0, 100.0, 340.0, 130.0);

    fn ball(cx: f64, cy: f64) -> BBox {
        BBox::new(cx - 5.0, cy - 5.0, cx + 5.0, cy + 5.0)
    }

    fn hoop_frame() -> FrameDetections {
        let mut nets = FrameDetections::new();
        nets.insert(0, DetectionRecord::new(HOOP));
        nets
    }

    /// Ball drops through the hoop: enters IN_PROGRESS at y=45, inside at
    /// y=100/120, exits below at y=140.
    fn made_shot() -> Vec<BBox> {
        [20.0, 30.0, 45.0, 60.0, 80.0, 100.0, 120.0, 140.0]
            .iter()
            .map(|y| ball(320.0, *y))
            .collect()
    }

    /// Ball drops toward the rim, then bounces around beside it
    fn missed_shot() -> Vec<BBox> {
        let mut balls: Vec<BBox> = [20.0, 30.0, 45.0].iter().map(|y| ball(280.0, *y)).collect();
        for i in 0..12 {
            let y = if i % 2 == 0 { 70.0 } else { 60.0 };
            balls.push(ball(280.0, y));
        }
        balls
    }

    fn run(detector: &mut ShotEventDetector, balls: &[BBox], holder: Option<TrackId>, teams: &TeamAssignment) -> EventLog {
        let n = balls.len();
        let nets = vec![hoop_frame(); n];
        let possession = vec![holder; n];
        detector.detect(balls, &nets, &possession, &[], teams)
    }

    fn teams() -> TeamAssignment {
        let mut t = TeamAssignment::new();
        t.insert(7, 2);
        t
    }

    #[test]
    fn test_made_shot() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let log = run(&mut detector, &made_shot(), Some(7), &teams());

        assert_eq!(log.len(), 1);
        let ev = &log.as_slice()[0];
        assert_eq!(ev.kind, EventKind::Made);
        assert_eq!(ev.frame, 7);
        assert_eq!(ev.player_id, Some(7));
        assert_eq!(ev.team, 2);
        assert_eq!(detector.stats().team(2), ShotTally { makes: 1, attempts: 1 });
        assert_eq!(detector.stats().player(7).accuracy(), 1.0);
        assert!(matches!(detector.state(), ShotState::Cooldown { .. }));
    }

    #[test]
    fn test_missed_shot() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let log = run(&mut detector, &missed_shot(), Some(7), &teams());

        assert_eq!(log.len(), 1);
        let ev = &log.as_slice()[0];
        assert_eq!(ev.kind, EventKind::Missed);
        // IN_PROGRESS from frame 2, ninth consecutive outside frame is 10
        assert_eq!(ev.frame, 10);
        assert_eq!(detector.stats().overall, ShotTally { makes: 0, attempts: 1 });
        assert_eq!(detector.stats().team(2).accuracy(), 0.0);
    }

    #[test]
    fn test_cooldown_suppresses_repeat() {
        let config = ShotConfig {
            cooldown_frames: 10,
            ..ShotConfig::default()
        };
        let mut detector = ShotEventDetector::new(&config, 30.0);
        let mut balls = made_shot();
        balls.extend(made_shot());
        let log = run(&mut detector, &balls, Some(7), &teams());
        assert_eq!(log.len(), 1);

        // Once the cooldown has run out the same pattern counts again
        let mut balls = made_shot();
        balls.extend(vec![ball(0.0, 0.0); 10]);
        balls.extend(made_shot());
        let mut detector = ShotEventDetector::new(&config, 30.0);
        let log = run(&mut detector, &balls, Some(7), &teams());
        assert_eq!(log.count(EventKind::Made), 2);
    }

    #[test]
    fn test_missing_ball_resets_attempt() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let mut balls = made_shot();
        balls[6] = BBox::SENTINEL;
        let log = run(&mut detector, &balls, Some(7), &teams());
        assert!(log.is_empty());
        assert_eq!(detector.stats().overall.attempts, 0);
    }

    #[test]
    fn test_missing_hoop_resets_attempt() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let balls = made_shot();
        let mut nets = vec![hoop_frame(); balls.len()];
        nets[5] = FrameDetections::new();
        let possession = vec![Some(7); balls.len()];
        let log = detector.detect(&balls, &nets, &possession, &[], &teams());
        assert!(log.is_empty());
    }

    #[test]
    fn test_leaving_approach_region_abandons_attempt() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let mut balls: Vec<BBox> = made_shot()[..4].to_vec();
        balls.extend((0..12).map(|i| ball(600.0 + i as f64, 70.0 + i as f64)));
        let log = run(&mut detector, &balls, Some(7), &teams());
        assert!(log.is_empty());
        assert_eq!(detector.state(), ShotState::Idle);
    }

    #[test]
    fn test_shot_without_holder_counts_globally() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let log = run(&mut detector, &made_shot(), None, &teams());
        let ev = &log.as_slice()[0];
        assert_eq!(ev.player_id, None);
        assert_eq!(ev.team, TEAM_UNASSIGNED);
        assert_eq!(detector.stats().overall.makes, 1);
        assert_eq!(detector.stats().team(1).attempts, 0);
        assert_eq!(detector.stats().team(2).attempts, 0);
    }

    #[test]
    fn test_shooter_position_falls_back_to_last_known() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let balls = made_shot();
        let nets = vec![hoop_frame(); balls.len()];
        let mut possession = vec![None; balls.len()];
        possession[0] = Some(7);
        let mut positions = vec![FramePositions::new(); balls.len()];
        positions[0].insert(7, Point2::new(20.0, 7.5));

        let log = detector.detect(&balls, &nets, &possession, &positions, &teams());
        assert_eq!(log.as_slice()[0].position, Some(Point2::new(20.0, 7.5)));
        assert_eq!(log.as_slice()[0].player_id, Some(7));
    }

    #[test]
    fn test_primary_hoop_is_nearest() {
        let mut nets = FrameDetections::new();
        nets.insert(1, DetectionRecord::new(BBox::new(0.0, 0.0, 10.0, 10.0)));
        nets.insert(2, DetectionRecord::new(HOOP));
        let hoop = primary_hoop(&Point2::new(310.0, 90.0), Some(&nets)).unwrap();
        assert_eq!(hoop, HOOP);
        assert!(primary_hoop(&Point2::new(0.0, 0.0), None).is_none());
    }

    #[test]
    fn test_attempt_starting_inside_net_is_made() {
        // Fast drop: descent is first seen with the ball already in the net
        let balls: Vec<BBox> = [60.0, 80.0, 110.0, 140.0, 160.0, 180.0, 200.0, 220.0]
            .iter()
            .map(|y| ball(320.0, *y))
            .collect();
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let log = run(&mut detector, &balls, Some(7), &teams());

        assert_eq!(log.len(), 1);
        let ev = &log.as_slice()[0];
        assert_eq!(ev.kind, EventKind::Made);
        assert_eq!(ev.frame, 3);
        assert_eq!(detector.stats().overall, ShotTally { makes: 1, attempts: 1 });
    }

    #[test]
    fn test_ball_leaving_net_upward_is_not_made() {
        // In the net on frames 4-5, pops back up on frame 6 and keeps rising
        let mut ys = vec![20.0, 30.0, 45.0, 70.0, 100.0, 120.0, 90.0];
        ys.extend((0..8).map(|i| 85.0 - 5.0 * i as f64));
        let balls: Vec<BBox> = ys.iter().map(|y| ball(320.0, *y)).collect();
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let log = run(&mut detector, &balls, Some(7), &teams());

        assert_eq!(log.count(EventKind::Made), 0);
        assert_eq!(log.len(), 1);
        let ev = &log.as_slice()[0];
        assert_eq!(ev.kind, EventKind::Missed);
        // Outside from frame 6 on, the ninth outside frame is 14
        assert_eq!(ev.frame, 14);
    }

    #[test]
    fn test_ascending_ball_never_starts_attempt() {
        let mut detector = ShotEventDetector::new(&ShotConfig::default(), 30.0);
        let balls: Vec<BBox> = (0..20).map(|i| ball(320.0, 180.0 - i as f64 * 5.0)).collect();
        let log = run(&mut detector, &balls, Some(7), &teams());
        assert!(log.is_empty());
        assert_eq!(detector.state(), ShotState::Idle);
    }
}

#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use crate::models::DetectionRecord;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_events_separated_by_cooldown(
            ys in prop::collection::vec(0.0f64..250.0, 0..200),
            cooldown in 1usize..40,
        ) {
            let config = ShotConfig { cooldown_frames: cooldown, ..ShotConfig::default() };
            let mut detector = ShotEventDetector::new(&config, 30.0);
            let balls: Vec<BBox> = ys.iter().map(|y| BBox::new(315.0, y - 5.0, 325.0, y + 5.0)).collect();
            let mut nets = FrameDetections::new();
            nets.insert(0, DetectionRecord::new(BBox::new(300.0, 100.0, 340.0, 130.0)));
            let nets = vec![nets; balls.len()];
            let log = detector.detect(&balls, &nets, &[], &[], &TeamAssignment::new());

            let frames: Vec<usize> = log.iter().map(|e| e.frame).collect();
            for w in frames.windows(2) {
                prop_assert!(w[1] - w[0] > cooldown);
            }
            prop_assert_eq!(detector.stats().overall.attempts as usize, log.len());
        }
    }
}
