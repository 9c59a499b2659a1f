//! # Seeded K-Means
//!
//! Small, bounded k-means over RGB colors. Used twice by the team
//! classifier: to find the dominant color inside one jersey crop, and to
//! split the pooled dominant colors into two teams.
//!
//! ## Algorithm
//!
//! - k-means++ initialisation from a `ChaCha8Rng` seeded per restart, so
//!   results are reproducible for a given seed
//! - Lloyd iterations until assignments stop changing or the iteration cap
//!   is hit; an emptied cluster keeps its previous centroid
//! - the restart with the lowest inertia (sum of squared distances) wins
//!
//! `k` is clamped to the number of points.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::models::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iterations: usize,
    pub restarts: usize,
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 2,
            max_iterations: 25,
            restarts: 4,
            seed: 42,
        }
    }
}

/// A fitted clustering
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    centroids: Vec<Rgb>,
    sizes: Vec<usize>,
    inertia: f64,
}

impl KMeans {
    /// Fit `params.k` clusters. `None` when `points` is empty or `k` is 0.
    pub fn fit(points: &[Rgb], params: &KMeansParams) -> Option<KMeans> {
        let k = params.k.min(points.len());
        if k == 0 {
            return None;
        }

        let mut best: Option<KMeans> = None;
        for restart in 0..params.restarts.max(1) {
            let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(restart as u64));
            let init = plus_plus_init(points, k, &mut rng);
            let model = lloyd(points, init, params.max_iterations.max(1));
            if best.as_ref().map_or(true, |b| model.inertia < b.inertia) {
                best = Some(model);
            }
        }
        best
    }

    pub fn centroids(&self) -> &[Rgb] {
        &self.centroids
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Index of the nearest centroid (lowest index on ties).
    pub fn predict(&self, p: &Rgb) -> usize {
        nearest(&self.centroids, p)
    }

    /// Centroid of the most populated cluster (lowest index on ties).
    pub fn largest_cluster(&self) -> Option<Rgb> {
        let mut best: Option<(usize, usize)> = None;
        for (i, &size) in self.sizes.iter().enumerate() {
            if best.map_or(true, |(_, s)| size > s) {
                best = Some((i, size));
            }
        }
        best.map(|(i, _)| self.centroids[i])
    }
}

fn nearest(centroids: &[Rgb], p: &Rgb) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = c.distance_sq(p);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

fn plus_plus_init(points: &[Rgb], k: usize, rng: &mut ChaCha8Rng) -> Vec<Rgb> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut d2: Vec<f64> = points.iter().map(|p| p.distance_sq(&centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, &d) in d2.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point already sits on a centroid
            rng.gen_range(0..points.len())
        };

        let c = points[next];
        centroids.push(c);
        for (d, p) in d2.iter_mut().zip(points) {
            *d = d.min(p.distance_sq(&c));
        }
    }
    centroids
}

fn lloyd(points: &[Rgb], mut centroids: Vec<Rgb>, max_iterations: usize) -> KMeans {
    let k = centroids.len();
    let mut assignment = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations {
        let mut changed = false;
        for (a, p) in assignment.iter_mut().zip(points) {
            let c = nearest(&centroids, p);
            if *a != c {
                *a = c;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for (&a, p) in assignment.iter().zip(points) {
            let s = &mut sums[a];
            s[0] += p.r;
            s[1] += p.g;
            s[2] += p.b;
            counts[a] += 1;
        }
        for ((c, s), &n) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if n > 0 {
                let n = n as f64;
                *c = Rgb::new(s[0] / n, s[1] / n, s[2] / n);
            }
        }
    }

    // Final assignment against the final centroids
    let mut sizes = vec![0usize; k];
    let mut inertia = 0.0;
    for p in points {
        let c = nearest(&centroids, p);
        sizes[c] += 1;
        inertia += centroids[c].distance_sq(p);
    }

    KMeans {
        centroids,
        sizes,
        inertia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: Rgb, n: usize) -> Vec<Rgb> {
        (0..n)
            .map(|i| {
                let o = (i % 5) as f64 - 2.0;
                Rgb::new(center.r + o, center.g - o, center.b + o / 2.0)
            })
            .collect()
    }

    #[test]
    fn test_two_separated_blobs() {
        let red = Rgb::new(200.0, 30.0, 30.0);
        let blue = Rgb::new(20.0, 40.0, 210.0);
        let mut points = blob(red, 20);
        points.extend(blob(blue, 12));

        let model = KMeans::fit(&points, &KMeansParams::default()).unwrap();
        assert_eq!(model.centroids().len(), 2);
        let r = model.predict(&red);
        let b = model.predict(&blue);
        assert_ne!(r, b);
        assert_eq!(model.sizes()[r], 20);
        assert_eq!(model.sizes()[b], 12);
        assert!(model.largest_cluster().unwrap().distance_sq(&red) < 1.0);
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut points = blob(Rgb::new(10.0, 200.0, 10.0), 15);
        points.extend(blob(Rgb::new(250.0, 250.0, 250.0), 15));
        points.extend(blob(Rgb::new(90.0, 60.0, 30.0), 6));
        let params = KMeansParams {
            k: 3,
            ..KMeansParams::default()
        };
        assert_eq!(KMeans::fit(&points, &params), KMeans::fit(&points, &params));
    }

    #[test]
    fn test_k_clamped_to_point_count() {
        let points = vec![Rgb::new(1.0, 2.0, 3.0)];
        let params = KMeansParams {
            k: 3,
            ..KMeansParams::default()
        };
        let model = KMeans::fit(&points, &params).unwrap();
        assert_eq!(model.centroids().len(), 1);
        assert_eq!(model.inertia(), 0.0);
    }

    #[test]
    fn test_identical_points() {
        let points = vec![Rgb::new(5.0, 5.0, 5.0); 10];
        let model = KMeans::fit(&points, &KMeansParams::default()).unwrap();
        assert_eq!(model.largest_cluster(), Some(Rgb::new(5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_empty_input() {
        assert!(KMeans::fit(&[], &KMeansParams::default()).is_none());
    }
}

#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_sizes_cover_all_points(
            raw in prop::collection::vec((0.0f64..255.0, 0.0f64..255.0, 0.0f64..255.0), 1..80),
            k in 1usize..4,
        ) {
            let points: Vec<Rgb> = raw.into_iter().map(|(r, g, b)| Rgb::new(r, g, b)).collect();
            let params = KMeansParams { k, ..KMeansParams::default() };
            let model = KMeans::fit(&points, &params).unwrap();
            prop_assert_eq!(model.sizes().iter().sum::<usize>(), points.len());
            prop_assert!(model.centroids().len() <= k);
            prop_assert!(model.inertia() >= 0.0);
        }
    }
}
