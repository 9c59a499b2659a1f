//! Temporal smoothing of detector tracks.

pub mod ball;

pub use ball::{BallTrackInterpolator, NaturalCubicSpline};
