//! # Ball Track Interpolation
//!
//! The detector loses the ball constantly (occlusion, motion blur). This
//! stage turns the sparse per-frame ball boxes into a dense track.
//!
//! ## Algorithm
//!
//! Each box coordinate (`x1`, `y1`, `x2`, `y2`) is an independent scalar
//! series over frame index. One natural cubic spline (second derivative zero
//! at both ends) is fitted per series through *all* known frames, so every
//! gap benefits from the whole track, and evaluated at the missing frames
//! between the first and last known frame. Frames before the first / after
//! the last known frame copy the nearest known value.
//!
//! Known frames are copied through untouched. With fewer than two known
//! frames there is nothing to fit and every output is [`BBox::SENTINEL`].
//!
//! ## Reference
//!
//! Burden & Faires, *Numerical Analysis*, §3.5 (natural cubic spline,
//! tridiagonal system solved with the Thomas algorithm).

use tracing::{debug, info};

use crate::config::BallConfig;
use crate::models::BBox;

/// Natural cubic spline through `(xs[i], ys[i])` with strictly increasing
/// `xs`.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivative at each knot
    m: Vec<f64>,
}

impl NaturalCubicSpline {
    /// Fit a spline. `None` with fewer than two knots, mismatched inputs or
    /// non-increasing `xs`.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n < 2 || ys.len() != n || xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let mut m = vec![0.0; n];
        if n > 2 {
            // Interior equations i = 1..n-2, unknowns m[1..n-1]
            let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
            let size = n - 2;
            let mut diag = vec![0.0; size];
            let mut upper = vec![0.0; size];
            let mut rhs = vec![0.0; size];
            for k in 0..size {
                let i = k + 1;
                diag[k] = 2.0 * (h[i - 1] + h[i]);
                upper[k] = h[i];
                rhs[k] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
            }

            // Forward sweep; sub-diagonal entry of row k is h[k]
            for k in 1..size {
                let w = h[k] / diag[k - 1];
                diag[k] -= w * upper[k - 1];
                rhs[k] -= w * rhs[k - 1];
            }
            // Back substitution
            m[size] = rhs[size - 1] / diag[size - 1];
            for k in (0..size - 1).rev() {
                m[k + 1] = (rhs[k] - upper[k] * m[k + 2]) / diag[k];
            }
        }

        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        })
    }

    /// Evaluate at `x`. Outside the knot range the end segment's cubic is
    /// extrapolated; callers in this crate only evaluate inside it.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let seg = self.xs.partition_point(|&k| k <= x).clamp(1, n - 1) - 1;

        let (x0, x1) = (self.xs[seg], self.xs[seg + 1]);
        let (y0, y1) = (self.ys[seg], self.ys[seg + 1]);
        let (m0, m1) = (self.m[seg], self.m[seg + 1]);
        let h = x1 - x0;
        let a = x1 - x;
        let b = x - x0;

        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Fills gaps in the per-frame ball track
#[derive(Debug, Clone)]
pub struct BallTrackInterpolator {
    min_known_frames: usize,
}

impl Default for BallTrackInterpolator {
    fn default() -> Self {
        Self::new(&BallConfig::default())
    }
}

impl BallTrackInterpolator {
    pub fn new(config: &BallConfig) -> Self {
        Self {
            min_known_frames: config.min_known_frames.max(2),
        }
    }

    /// Dense ball track, same length as `balls`.
    ///
    /// Sentinel or non-finite input boxes count as "not detected".
    pub fn interpolate(&self, balls: &[Option<BBox>]) -> Vec<BBox> {
        let known: Vec<(usize, BBox)> = balls
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.filter(is_usable).map(|b| (i, b)))
            .collect();

        if known.len() < self.min_known_frames {
            debug!(
                frames = balls.len(),
                known = known.len(),
                "too few ball detections to interpolate"
            );
            return vec![BBox::SENTINEL; balls.len()];
        }

        let xs: Vec<f64> = known.iter().map(|(i, _)| *i as f64).collect();
        let series: [Vec<f64>; 4] = [
            known.iter().map(|(_, b)| b.x1).collect(),
            known.iter().map(|(_, b)| b.y1).collect(),
            known.iter().map(|(_, b)| b.x2).collect(),
            known.iter().map(|(_, b)| b.y2).collect(),
        ];
        let splines: Vec<NaturalCubicSpline> = series
            .iter()
            .filter_map(|ys| NaturalCubicSpline::fit(&xs, ys))
            .collect();
        if splines.len() != 4 {
            return vec![BBox::SENTINEL; balls.len()];
        }

        let first = known[0].0;
        let last = known[known.len() - 1].0;
        let first_box = known[0].1;
        let last_box = known[known.len() - 1].1;

        let out: Vec<BBox> = balls
            .iter()
            .enumerate()
            .map(|(i, b)| match b.filter(is_usable) {
                Some(b) => b,
                None if i < first => first_box,
                None if i > last => last_box,
                None => {
                    let t = i as f64;
                    BBox::new(
                        splines[0].eval(t),
                        splines[1].eval(t),
                        splines[2].eval(t),
                        splines[3].eval(t),
                    )
                }
            })
            .collect();

        info!(
            frames = balls.len(),
            known = known.len(),
            filled = balls.len() - known.len(),
            "ball track interpolated"
        );
        out
    }
}

fn is_usable(b: &BBox) -> bool {
    !b.is_sentinel() && b.x1.is_finite() && b.y1.is_finite() && b.x2.is_finite() && b.y2.is_finite()
}
