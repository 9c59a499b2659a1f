//! Game-state inference over the per-frame tracks: possession, shots and
//! passes.

pub mod passes;
pub mod possession;
pub mod shots;

pub use passes::PassEventDetector;
pub use possession::{team_ball_control, PossessionSequence, PossessionTracker, TeamControlStats};
pub use shots::{ShotEventDetector, ShotInput, ShotState, ShotStats, ShotTally};
