//! # Planar Homography
//!
//! Image-to-court transform fitted from keypoint correspondences.
//!
//! ## Algorithm
//!
//! Direct Linear Transform with Hartley normalization:
//! 1. Translate each point set to its centroid and scale it so the mean
//!    distance from the origin is √2.
//! 2. Stack two rows per correspondence into the 2n×9 matrix `A`.
//! 3. `h` is the eigenvector of `AᵀA` with the smallest eigenvalue.
//! 4. Undo the normalization: `H = T_dst⁻¹ · H_norm · T_src`, then scale so
//!    `H[2,2] = 1`.
//!
//! A fit is rejected as degenerate when `AᵀA` has a null space wider than
//! one dimension (collinear or coincident points), or when the result is
//! singular or non-finite.

use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};
use thiserror::Error;

use crate::error::FrameIssue;
use crate::models::Point2;

/// Minimum correspondences for a DLT fit
pub const MIN_CORRESPONDENCES: usize = 4;

/// Relative eigenvalue below which a direction counts as null
const NULL_SPACE_TOLERANCE: f64 = 1e-10;

/// Relative determinant below which `H` counts as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HomographyFailure {
    #[error("too few correspondences: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("degenerate correspondence set")]
    Degenerate,
}

impl HomographyFailure {
    pub fn issue(&self) -> FrameIssue {
        match self {
            HomographyFailure::TooFewPoints { .. } => FrameIssue::InsufficientCorrespondence,
            HomographyFailure::Degenerate => FrameIssue::GeometryFailure,
        }
    }
}

/// A fitted 3×3 projective transform
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Fit `H` such that `dst ≈ H · src`.
    pub fn fit(src: &[Point2], dst: &[Point2]) -> Result<Self, HomographyFailure> {
        let n = src.len().min(dst.len());
        if n < MIN_CORRESPONDENCES {
            return Err(HomographyFailure::TooFewPoints {
                needed: MIN_CORRESPONDENCES,
                got: n,
            });
        }
        let src = &src[..n];
        let dst = &dst[..n];

        let (t_src, src_n) = normalize(src).ok_or(HomographyFailure::Degenerate)?;
        let (t_dst, dst_n) = normalize(dst).ok_or(HomographyFailure::Degenerate)?;

        let mut a = DMatrix::zeros(2 * n, 9);
        for (i, (s, d)) in src_n.iter().zip(&dst_n).enumerate() {
            let r = 2 * i;
            a[(r, 3)] = -s.x;
            a[(r, 4)] = -s.y;
            a[(r, 5)] = -1.0;
            a[(r, 6)] = d.y * s.x;
            a[(r, 7)] = d.y * s.y;
            a[(r, 8)] = d.y;

            a[(r + 1, 0)] = s.x;
            a[(r + 1, 1)] = s.y;
            a[(r + 1, 2)] = 1.0;
            a[(r + 1, 6)] = -d.x * s.x;
            a[(r + 1, 7)] = -d.x * s.y;
            a[(r + 1, 8)] = -d.x;
        }

        let eig = SymmetricEigen::new(a.transpose() * &a);
        let mut order: Vec<usize> = (0..9).collect();
        order.sort_by(|&i, &j| eig.eigenvalues[i].abs().total_cmp(&eig.eigenvalues[j].abs()));

        let largest = eig.eigenvalues[order[8]].abs();
        let second = eig.eigenvalues[order[1]].abs();
        if !largest.is_finite() || largest <= 0.0 || second <= NULL_SPACE_TOLERANCE * largest {
            return Err(HomographyFailure::Degenerate);
        }

        let h = eig.eigenvectors.column(order[0]);
        let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

        let t_dst_inv = t_dst.try_inverse().ok_or(HomographyFailure::Degenerate)?;
        let mut matrix = t_dst_inv * h_norm * t_src;
        let scale = matrix[(2, 2)];
        if scale.abs() > f64::EPSILON {
            matrix /= scale;
        }

        let norm = matrix.norm();
        let det = matrix.determinant();
        if !det.is_finite() || !norm.is_finite() || det.abs() <= SINGULAR_TOLERANCE * norm.powi(3)
        {
            return Err(HomographyFailure::Degenerate);
        }

        Ok(Self { matrix })
    }

    /// Map a point through `H`. `None` for points on the line at infinity.
    pub fn project(&self, p: &Point2) -> Option<Point2> {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        if v[2].abs() < 1e-15 {
            return None;
        }
        let out = Point2::new(v[0] / v[2], v[1] / v[2]);
        out.is_finite().then_some(out)
    }
}

/// Hartley normalization: centroid to origin, mean distance √2.
fn normalize(pts: &[Point2]) -> Option<(Matrix3<f64>, Vec<Point2>)> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| (p.x - cx).hypot(p.y - cy))
        .sum::<f64>()
        / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((t, normalized))
}
