//! # Keypoint Validation
//!
//! Rejects detected court keypoints that are geometrically inconsistent
//! with the rest of the frame.
//!
//! ## Algorithm
//!
//! For each detected keypoint `i` (ascending index), take the first two
//! other detected keypoints `j`, `k` that have not already been rejected.
//! Compare the pixel distance ratio `d(i,j) / d(i,k)` with the reference
//! ratio `t(i,j) / t(i,k)`. When the relative error
//! `|(d_ratio - t_ratio) / t_ratio|` exceeds the tolerance, `i` is rejected
//! (set to undetected) and excluded as a partner for later keypoints.
//!
//! Distance ratios are invariant to scale and roughly invariant to the mild
//! perspective of a broadcast view, so a wildly wrong ratio means the
//! detector put the landmark in the wrong place.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::CourtConfig;
use crate::models::{CourtKeypointSet, CourtReference};

#[derive(Debug, Clone)]
pub struct KeypointValidator {
    reference: CourtReference,
    tolerance: f64,
    min_keypoints: usize,
}

impl Default for KeypointValidator {
    fn default() -> Self {
        Self::new(&CourtConfig::default(), CourtReference::standard())
    }
}

impl KeypointValidator {
    pub fn new(config: &CourtConfig, reference: CourtReference) -> Self {
        Self {
            reference,
            tolerance: config.keypoint_ratio_tolerance,
            min_keypoints: config.min_validation_keypoints.max(3),
        }
    }

    /// Validate one frame in place. Returns the number of rejected points.
    ///
    /// Frames with fewer than the minimum number of detected keypoints are
    /// left untouched.
    pub fn validate_frame(&self, keypoints: &mut CourtKeypointSet) -> usize {
        let detected = keypoints.detected_indices();
        if detected.len() < self.min_keypoints {
            return 0;
        }

        let mut rejected: Vec<usize> = Vec::new();
        for &i in &detected {
            let partners: Vec<usize> = detected
                .iter()
                .copied()
                .filter(|&j| j != i && !rejected.contains(&j))
                .take(2)
                .collect();
            let [j, k] = match partners.as_slice() {
                [j, k] => [*j, *k],
                _ => continue,
            };

            if self.is_inconsistent(keypoints, i, j, k) {
                keypoints.reject(i);
                rejected.push(i);
            }
        }

        if !rejected.is_empty() {
            debug!(?rejected, "rejected inconsistent keypoints");
        }
        rejected.len()
    }

    fn is_inconsistent(&self, keypoints: &CourtKeypointSet, i: usize, j: usize, k: usize) -> bool {
        let (Some(t_ij), Some(t_ik)) = (self.reference.distance(i, j), self.reference.distance(i, k))
        else {
            return false;
        };
        if t_ij <= 0.0 || t_ik <= 0.0 {
            return false;
        }
        let (Some(pi), Some(pj), Some(pk)) = (
            keypoints.detected(i),
            keypoints.detected(j),
            keypoints.detected(k),
        ) else {
            return false;
        };

        let d_ij = pi.distance(&pj);
        let d_ik = pi.distance(&pk);
        let detected_ratio = if d_ik == 0.0 {
            f64::INFINITY
        } else {
            d_ij / d_ik
        };
        let reference_ratio = t_ij / t_ik;

        ((detected_ratio - reference_ratio) / reference_ratio).abs() > self.tolerance
    }

    /// Validate every frame in parallel. Returns the total rejected count.
    pub fn validate_all(&self, frames: &mut [CourtKeypointSet]) -> usize {
        let rejected: usize = frames
            .par_iter_mut()
            .map(|kps| self.validate_frame(kps))
            .sum();
        info!(frames = frames.len(), rejected, "keypoint validation complete");
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Point2, KEYPOINT_COUNT};

    /// Keypoints as a camera looking straight down at 20 px per meter would
    /// see them, offset so every coordinate is positive.
    fn overhead(indices: &[usize]) -> CourtKeypointSet {
        let court = CourtReference::standard();
        let mut set = CourtKeypointSet::empty();
        for &i in indices {
            let p = court.point(i).unwrap();
            set.points[i] = Some(Point2::new(50.0 + 20.0 * p.x, 40.0 + 20.0 * p.y));
        }
        set
    }

    #[test]
    fn test_consistent_frame_is_untouched() {
        let mut set = overhead(&(0..KEYPOINT_COUNT).collect::<Vec<_>>());
        let before = set.clone();
        assert_eq!(KeypointValidator::default().validate_frame(&mut set), 0);
        assert_eq!(set, before);
    }

    #[test]
    fn test_displaced_point_is_rejected() {
        let mut set = overhead(&[0, 3, 6, 12, 15]);
        // Detector put landmark 12 (right baseline) next to landmark 3 (left baseline)
        set.points[12] = Some(Point2::new(50.0 + 20.0 * 1.0, 40.0 + 20.0 * 10.0));

        let rejected = KeypointValidator::default().validate_frame(&mut set);
        assert_eq!(rejected, 1);
        assert!(set.detected(12).is_none());
        assert!(set.detected(0).is_some());
    }

    #[test]
    fn test_too_few_points_pass_through() {
        let mut set = overhead(&[0, 15]);
        set.points[15] = Some(Point2::new(1.0, 1.0));
        let before = set.clone();
        assert_eq!(KeypointValidator::default().validate_frame(&mut set), 0);
        assert_eq!(set, before);
    }

    #[test]
    fn test_coincident_partner_rejects_point() {
        // d(i,k) == 0 makes the detected ratio infinite
        let mut set = overhead(&[0, 5, 15]);
        set.points[15] = set.points[0];
        let rejected = KeypointValidator::default().validate_frame(&mut set);
        assert_eq!(rejected, 1);
        assert!(set.detected(0).is_none());
    }

    #[test]
    fn test_validate_all_sums_rejections() {
        let mut frames = vec![overhead(&[0, 3, 6, 12, 15]); 4];
        frames[2].points[12] = Some(Point2::new(50.0 + 20.0 * 1.0, 40.0 + 20.0 * 10.0));
        let rejected = KeypointValidator::default().validate_all(&mut frames);
        assert_eq!(rejected, 1);
        assert!(frames[0].detected(12).is_some());
        assert!(frames[2].detected(12).is_none());
    }
}
