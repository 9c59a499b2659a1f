//! # Pass Detection
//!
//! One pass over the possession sequence. A pass is emitted on a frame
//! whose holder `B` differs from the previous frame's holder `A` when both
//! are on the same assigned team. A frame without a holder breaks the chain,
//! and changes of team emit nothing (turnovers are not modelled).

use tracing::info;

use crate::court::FramePositions;
use crate::models::{Event, EventLog, TrackId, TEAM_UNASSIGNED};
use crate::team::TeamAssignment;

#[derive(Debug, Clone)]
pub struct PassEventDetector {
    fps: f64,
}

impl PassEventDetector {
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }

    /// `positions` may be empty (no projections for any frame).
    pub fn detect(
        &self,
        possession: &[Option<TrackId>],
        teams: &TeamAssignment,
        positions: &[FramePositions],
    ) -> EventLog {
        let mut log = EventLog::new();
        for (frame, pair) in possession.windows(2).enumerate() {
            let frame = frame + 1;
            let (Some(passer), Some(receiver)) = (pair[0], pair[1]) else {
                continue;
            };
            if passer == receiver {
                continue;
            }

            let team = teams.get(&passer).copied().unwrap_or(TEAM_UNASSIGNED);
            let receiver_team = teams.get(&receiver).copied().unwrap_or(TEAM_UNASSIGNED);
            if team == TEAM_UNASSIGNED || team != receiver_team {
                continue;
            }

            let position = [frame, frame - 1]
                .iter()
                .find_map(|&f| positions.get(f).and_then(|p| p.get(&passer)).copied());
            log.push(Event::pass(frame, self.fps, passer, receiver, team, position));
        }

        info!(frames = possession.len(), passes = log.len(), "pass detection complete");
        log
    }
}
