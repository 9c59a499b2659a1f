//! # Court Reference Geometry
//!
//! The canonical court is a 28 m × 15 m rectangle with `x` along the length
//! and `y` along the width. The keypoint detector reports 18 landmarks in a
//! fixed order; [`COURT_REFERENCE_POINTS`] gives each landmark's position in
//! meters, in the same order.
//!
//! ## Landmark order
//!
//! | Index | Landmark |
//! |-------|----------|
//! | 0-5 | left baseline, top to bottom |
//! | 6-7 | halfway line ends |
//! | 8-9 | left free-throw line ends |
//! | 10-15 | right baseline, bottom to top |
//! | 16-17 | right free-throw line ends |

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::geometry::Point2;

/// Court length (baseline to baseline), meters
pub const COURT_LENGTH_M: f64 = 28.0;

/// Court width (sideline to sideline), meters
pub const COURT_WIDTH_M: f64 = 15.0;

/// Minimap canvas width, pixels
pub const CANVAS_WIDTH_PX: f64 = 300.0;

/// Minimap canvas height, pixels
pub const CANVAS_HEIGHT_PX: f64 = 161.0;

pub const KEYPOINT_COUNT: usize = 18;

/// Canonical landmark positions, meters
pub const COURT_REFERENCE_POINTS: [[f64; 2]; KEYPOINT_COUNT] = [
    [0.0, 0.0],
    [0.0, 0.91],
    [0.0, 5.18],
    [0.0, 10.0],
    [0.0, 14.1],
    [0.0, 15.0],
    [14.0, 15.0],
    [14.0, 0.0],
    [5.79, 5.18],
    [5.79, 10.0],
    [28.0, 15.0],
    [28.0, 14.1],
    [28.0, 10.0],
    [28.0, 5.18],
    [28.0, 0.91],
    [28.0, 0.0],
    [22.21, 5.18],
    [22.21, 10.0],
];

/// Court-space position, meters
pub type CourtPoint = Point2;

/// One frame of keypoint detector output.
///
/// Slots are `null` when the landmark was not detected. A slot whose
/// coordinates are not both strictly positive is read as undetected too,
/// since detectors zero-fill missing landmarks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CourtKeypointSet {
    pub points: Vec<Option<Point2>>,
}

impl CourtKeypointSet {
    pub fn new(points: Vec<Option<Point2>>) -> Self {
        Self { points }
    }

    /// All slots undetected
    pub fn empty() -> Self {
        Self {
            points: vec![None; KEYPOINT_COUNT],
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Detected position of landmark `i`, if any.
    pub fn detected(&self, i: usize) -> Option<Point2> {
        self.points
            .get(i)
            .copied()
            .flatten()
            .filter(|p| p.x > 0.0 && p.y > 0.0 && p.is_finite())
    }

    /// Indices of detected landmarks, ascending.
    pub fn detected_indices(&self) -> Vec<usize> {
        (0..self.points.len())
            .filter(|&i| self.detected(i).is_some())
            .collect()
    }

    /// Mark landmark `i` as undetected.
    pub fn reject(&mut self, i: usize) {
        if let Some(slot) = self.points.get_mut(i) {
            *slot = None;
        }
    }
}

/// The canonical court model landmarks are matched against
#[derive(Debug, Clone, PartialEq)]
pub struct CourtReference {
    points: Vec<CourtPoint>,
    length_m: f64,
    width_m: f64,
}

impl Default for CourtReference {
    fn default() -> Self {
        Self::standard()
    }
}

impl CourtReference {
    /// FIBA-sized court with the 18-landmark layout.
    pub fn standard() -> Self {
        Self {
            points: COURT_REFERENCE_POINTS
                .iter()
                .map(|&p| Point2::from(p))
                .collect(),
            length_m: COURT_LENGTH_M,
            width_m: COURT_WIDTH_M,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, i: usize) -> Option<CourtPoint> {
        self.points.get(i).copied()
    }

    /// Distance between two landmarks, meters. `None` for unknown indices.
    pub fn distance(&self, i: usize, j: usize) -> Option<f64> {
        Some(self.point(i)?.distance(&self.point(j)?))
    }

    /// Inclusive bounds check against the court rectangle.
    pub fn contains(&self, p: &CourtPoint) -> bool {
        p.is_finite() && p.x >= 0.0 && p.x <= self.length_m && p.y >= 0.0 && p.y <= self.width_m
    }

    /// Convert meters to minimap canvas pixels.
    pub fn to_canvas(&self, p: &CourtPoint) -> Point2 {
        Point2::new(
            p.x * CANVAS_WIDTH_PX / self.length_m,
            p.y * CANVAS_HEIGHT_PX / self.width_m,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_reference_is_inside_court() {
        let court = CourtReference::standard();
        assert_eq!(court.len(), KEYPOINT_COUNT);
        for i in 0..court.len() {
            assert!(court.contains(&court.point(i).unwrap()), "landmark {}", i);
        }
    }

    #[test]
    fn test_to_canvas_maps_corners() {
        let court = CourtReference::standard();
        let far = court.to_canvas(&Point2::new(28.0, 15.0));
        assert!((far.x - 300.0).abs() < 1e-9);
        assert!((far.y - 161.0).abs() < 1e-9);
        assert_eq!(court.to_canvas(&Point2::new(0.0, 0.0)), Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_zero_filled_keypoint_is_undetected() {
        let set = CourtKeypointSet::new(vec![
            Some(Point2::new(0.0, 0.0)),
            Some(Point2::new(10.0, 0.0)),
            Some(Point2::new(10.0, 12.0)),
            None,
        ]);
        assert_eq!(set.detected_indices(), vec![2]);
    }

    #[test]
    fn test_keypoints_parse_with_nulls() {
        let set: CourtKeypointSet = serde_json::from_str("[[1.0, 2.0], null]").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.detected(0), Some(Point2::new(1.0, 2.0)));
        assert_eq!(set.detected(1), None);
    }
}
