use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::court::CourtPoint;
use super::detection::{TeamId, TrackId, TEAM_UNASSIGNED};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Frame index the event fired on
    pub frame: usize,
    /// Seconds since clip start (`frame / fps`)
    pub timestamp_s: f64,
    /// `MM:SS.cc` rendering of `timestamp_s`
    pub clock: String,
    /// Shooter or passer. `None` for shots with no known holder.
    pub player_id: Option<TrackId>,
    /// Pass receiver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<TrackId>,
    /// Team of `player_id`, 0 when unknown
    pub team: TeamId,
    /// Court position of `player_id`, meters
    pub position: Option<CourtPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Made,
    Missed,
    Pass,
}


impl Event {
    pub fn shot(
        made: bool,
        frame: usize,
        fps: f64,
        shooter: Option<TrackId>,
        team: TeamId,
        position: Option<CourtPoint>,
    ) -> Self {
        let timestamp_s = frame_to_seconds(frame, fps);
        Self {
            kind: if made { EventKind::Made } else { EventKind::Missed },
            frame,
            timestamp_s,
            clock: format_clock(timestamp_s),
            player_id: shooter,
            receiver_id: None,
            team: if shooter.is_some() { team } else { TEAM_UNASSIGNED },
            position,
        }
    }

    pub fn pass(
        frame: usize,
        fps: f64,
        passer: TrackId,
        receiver: TrackId,
        team: TeamId,
        position: Option<CourtPoint>,
    ) -> Self {
        let timestamp_s = frame_to_seconds(frame, fps);
        Self {
            kind: EventKind::Pass,
            frame,
            timestamp_s,
            clock: format_clock(timestamp_s),
            player_id: Some(passer),
            receiver_id: Some(receiver),
            team,
            position,
        }
    }
}

pub fn frame_to_seconds(frame: usize, fps: f64) -> f64 {
    if fps > 0.0 {
        frame as f64 / fps
    } else {
        0.0
    }
}

/// Render seconds as `MM:SS.cc`.
pub fn format_clock(seconds: f64) -> String {
    let centis = (seconds.max(0.0) * 100.0).round() as u64;
    let minutes = centis / 6000;
    let secs = (centis % 6000) / 100;
    let cs = centis % 100;
    format!("{:02}:{:02}.{:02}", minutes, secs, cs)
}

/// Append-only event list, ordered by frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Merge two frame-ordered streams. On equal frames `a` comes first.
    pub fn merged(a: EventLog, b: EventLog) -> EventLog {
        let mut events = Vec::with_capacity(a.len() + b.len());
        let mut rest_b = b.events.into_iter().peekable();
        for ev in a.events {
            while let Some(next) = rest_b.next_if(|nb| nb.frame < ev.frame) {
                events.push(next);
            }
            events.push(ev);
        }
        events.extend(rest_b);
        EventLog { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }
}
