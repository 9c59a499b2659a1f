pub mod court;
pub mod detection;
pub mod events;
pub mod geometry;

pub use court::{
    CourtKeypointSet, CourtPoint, CourtReference, COURT_LENGTH_M, COURT_REFERENCE_POINTS,
    COURT_WIDTH_M, KEYPOINT_COUNT,
};
pub use detection::{
    DetectionHistory, DetectionRecord, FrameDetections, Rgb, TeamId, TrackId, TEAM_UNASSIGNED,
};
pub use events::{format_clock, frame_to_seconds, Event, EventKind, EventLog};
pub use geometry::{BBox, Point2};
