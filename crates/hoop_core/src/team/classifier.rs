//! # Team Classification
//!
//! Splits players into two teams by jersey color.
//!
//! ## Algorithm
//!
//! 1. **Dominant color**: crop a small square at the center of the player
//!    box (side = `crop_fraction` × the shorter box side) to stay clear of
//!    background, floor and limbs. Cluster its pixels with k-means
//!    (≤ `max_color_clusters`) and take the centroid of the largest cluster.
//! 2. **Bootstrap**: pool the dominant colors of every player in the first
//!    `bootstrap_frames` frames and fit a 2-means model. The darker centroid
//!    (by luma) is team 1, the other team 2.
//! 3. **Assignment**: walking frames in order, the first time a track id is
//!    seen its color is classified against the model and the result is
//!    frozen in a per-id cache. Cached ids are never reclassified.
//!
//! With fewer than two usable bootstrap colors there is no model and every
//! player is [`TEAM_UNASSIGNED`]. An id whose color cannot be obtained is
//! also left unassigned and is not cached, so a later frame can classify it.

use std::collections::BTreeMap;

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::frames::FrameSource;
use super::kmeans::{KMeans, KMeansParams};
use crate::config::TeamConfig;
use crate::models::{BBox, FrameDetections, Rgb, TeamId, TrackId, TEAM_UNASSIGNED};

/// Track id → team id for every player seen
pub type TeamAssignment = BTreeMap<TrackId, TeamId>;

/// Reference colors of the two teams
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamModel {
    colors: [Rgb; 2],
}

impl TeamModel {
    /// Fit from pooled jersey colors. `None` with fewer than two colors.
    pub fn fit(colors: &[Rgb], params: &KMeansParams) -> Option<Self> {
        if colors.len() < 2 {
            return None;
        }
        let model = KMeans::fit(colors, &KMeansParams { k: 2, ..*params })?;
        let [a, b] = match model.centroids() {
            [a, b] => [*a, *b],
            _ => return None,
        };
        let colors = if luma(&a) <= luma(&b) { [a, b] } else { [b, a] };
        Some(Self { colors })
    }

    /// Nearest reference color; team 1 on ties.
    pub fn classify(&self, color: &Rgb) -> TeamId {
        if self.colors[1].distance_sq(color) < self.colors[0].distance_sq(color) {
            2
        } else {
            1
        }
    }

    pub fn color(&self, team: TeamId) -> Option<Rgb> {
        match team {
            1 => Some(self.colors[0]),
            2 => Some(self.colors[1]),
            _ => None,
        }
    }
}

fn luma(c: &Rgb) -> f64 {
    0.299 * c.r + 0.587 * c.g + 0.114 * c.b
}

/// Outcome of [`TeamClassifier::assign_all`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamSummary {
    pub assignment: TeamAssignment,
    /// Player records (frame × id) left on team 0
    pub unassigned_records: usize,
}

#[derive(Debug, Clone)]
pub struct TeamClassifier {
    config: TeamConfig,
    model: Option<TeamModel>,
    cache: BTreeMap<TrackId, TeamId>,
}

impl Default for TeamClassifier {
    fn default() -> Self {
        Self::new(&TeamConfig::default())
    }
}

impl TeamClassifier {
    pub fn new(config: &TeamConfig) -> Self {
        Self {
            config: config.clone(),
            model: None,
            cache: BTreeMap::new(),
        }
    }

    fn params(&self, k: usize) -> KMeansParams {
        KMeansParams {
            k,
            max_iterations: self.config.kmeans_max_iterations,
            restarts: self.config.kmeans_restarts,
            seed: self.config.seed,
        }
    }

    pub fn model(&self) -> Option<&TeamModel> {
        self.model.as_ref()
    }

    /// Frozen team of `id`, if it has been classified.
    pub fn team_of(&self, id: TrackId) -> Option<TeamId> {
        self.cache.get(&id).copied()
    }

    /// Dominant jersey color of the player in `bbox`.
    pub fn dominant_color(&self, image: &RgbImage, bbox: &BBox) -> Option<Rgb> {
        let pixels = central_crop_pixels(image, bbox, self.config.crop_fraction);
        if pixels.is_empty() {
            return None;
        }
        KMeans::fit(&pixels, &self.params(self.config.max_color_clusters))?.largest_cluster()
    }

    /// Record color: sampled from the frame when there is one, else the
    /// color supplied with the detection.
    fn record_color(&self, image: Option<&RgbImage>, bbox: &BBox, supplied: Option<Rgb>) -> Option<Rgb> {
        image
            .and_then(|img| self.dominant_color(img, bbox))
            .or(supplied)
    }

    /// Fit the team model from the leading frames. Fills `dominant_color`
    /// of every bootstrap record it can and returns the number of colors
    /// pooled.
    pub fn bootstrap(
        &mut self,
        players: &mut [FrameDetections],
        frames: Option<&dyn FrameSource>,
    ) -> usize {
        let window = players.len().min(self.config.bootstrap_frames);
        let this = &*self;
        players[..window]
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, frame)| {
                let image = frames.and_then(|f| f.frame(i));
                for record in frame.values_mut() {
                    record.dominant_color =
                        this.record_color(image.as_deref(), &record.bbox, record.dominant_color);
                }
            });

        let pooled: Vec<Rgb> = players[..window]
            .iter()
            .flat_map(|frame| frame.values().filter_map(|r| r.dominant_color))
            .collect();

        self.model = TeamModel::fit(&pooled, &self.params(2));
        match &self.model {
            Some(model) => info!(
                window,
                colors = pooled.len(),
                team1 = ?model.colors[0].to_array(),
                team2 = ?model.colors[1].to_array(),
                "team color model fitted"
            ),
            None => warn!(
                window,
                colors = pooled.len(),
                "too few jersey colors for a team model; players stay unassigned"
            ),
        }
        pooled.len()
    }

    /// Team of `id`, classifying and freezing it on first sight.
    pub fn assign(&mut self, id: TrackId, color: Option<Rgb>) -> TeamId {
        if let Some(team) = self.cache.get(&id) {
            return *team;
        }
        match (&self.model, color) {
            (Some(model), Some(color)) => {
                let team = model.classify(&color);
                self.cache.insert(id, team);
                debug!(track_id = id, team, "team assigned");
                team
            }
            _ => TEAM_UNASSIGNED,
        }
    }

    /// Bootstrap, then assign every player record of every frame in order.
    pub fn assign_all(
        &mut self,
        players: &mut [FrameDetections],
        frames: Option<&dyn FrameSource>,
    ) -> TeamSummary {
        self.bootstrap(players, frames);

        let mut summary = TeamSummary::default();
        for (i, frame) in players.iter_mut().enumerate() {
            let needs_pixels = self.model.is_some()
                && frame
                    .iter()
                    .any(|(id, r)| !self.cache.contains_key(id) && r.dominant_color.is_none());
            let image = if needs_pixels {
                frames.and_then(|f| f.frame(i))
            } else {
                None
            };

            for (&id, record) in frame.iter_mut() {
                if !self.cache.contains_key(&id) && record.dominant_color.is_none() {
                    record.dominant_color =
                        self.record_color(image.as_deref(), &record.bbox, None);
                }
                let team = self.assign(id, record.dominant_color);
                record.team = Some(team);
                record.team_color = self.model.as_ref().and_then(|m| m.color(team));
                if team == TEAM_UNASSIGNED {
                    summary.unassigned_records += 1;
                }
                summary.assignment.insert(id, team);
            }
        }

        // Ids first seen unclassifiable may have been classified later
        for (id, team) in summary.assignment.iter_mut() {
            if let Some(frozen) = self.cache.get(id) {
                *team = *frozen;
            }
        }

        info!(
            players = summary.assignment.len(),
            classified = self.cache.len(),
            unassigned_records = summary.unassigned_records,
            "team assignment complete"
        );
        summary
    }
}

/// Pixels of the centered square crop of `bbox`, clamped to the image.
pub fn central_crop_pixels(image: &RgbImage, bbox: &BBox, crop_fraction: f64) -> Vec<Rgb> {
    let shorter = bbox.width().min(bbox.height());
    let side = (shorter * crop_fraction).floor();
    if !side.is_finite() || side < 1.0 {
        return Vec::new();
    }
    let c = bbox.center();
    let x0 = (c.x - side / 2.0).floor().max(0.0);
    let y0 = (c.y - side / 2.0).floor().max(0.0);
    let x1 = (c.x - side / 2.0).floor() + side;
    let y1 = (c.y - side / 2.0).floor() + side;
    let x1 = x1.min(image.width() as f64);
    let y1 = y1.min(image.height() as f64);
    if x1 <= x0 || y1 <= y0 {
        return Vec::new();
    }

    let (x0, y0, x1, y1) = (x0 as u32, y0 as u32, x1 as u32, y1 as u32);
    let mut pixels = Vec::with_capacity(((x1 - x0) * (y1 - y0)) as usize);
    for y in y0..y1 {
        for x in x0..x1 {
            let p = image.get_pixel(x, y);
            pixels.push(Rgb::new(p[0] as f64, p[1] as f64, p[2] as f64));
        }
    }
    pixels
}
