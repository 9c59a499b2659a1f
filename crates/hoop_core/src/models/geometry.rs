//! # Image-Space Geometry
//!
//! Axis-aligned boxes and 2D points shared by every stage.
//!
//! Both serialize as flat arrays (`[x1, y1, x2, y2]` and `[x, y]`), which is
//! the shape detector exports use.

use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 2D point. Pixels in image space, meters in court space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(v: [f64; 2]) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

impl From<Point2> for [f64; 2] {
    fn from(p: Point2) -> Self {
        [p.x, p.y]
    }
}

impl JsonSchema for Point2 {
    fn schema_name() -> String {
        "Point2".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <[f64; 2]>::json_schema(gen)
    }
}

/// Axis-aligned bounding box `(x1, y1)`-`(x2, y2)` in pixels.
///
/// The all-zero box is the "no ball" sentinel produced by interpolation
/// when there is nothing to interpolate from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub const SENTINEL: BBox = BBox::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Bottom-center, where a standing player touches the floor.
    pub fn foot(&self) -> Point2 {
        Point2::new((self.x1 + self.x2) / 2.0, self.y2)
    }

    pub fn intersection_area(&self, other: &BBox) -> f64 {
        let w = self.x2.min(other.x2) - self.x1.max(other.x1);
        let h = self.y2.min(other.y2) - self.y1.max(other.y1);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Fraction of `inner`'s area lying inside `self`.
    ///
    /// Zero when the boxes do not overlap or `inner` is degenerate.
    pub fn containment_of(&self, inner: &BBox) -> f64 {
        let inner_area = inner.area();
        if inner_area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(inner) / inner_area
    }

    /// Grow by `margin` pixels on every side.
    pub fn inflate(&self, margin: f64) -> BBox {
        BBox::new(
            self.x1 - margin,
            self.y1 - margin,
            self.x2 + margin,
            self.y2 + margin,
        )
    }

    /// Inclusive point-in-box test.
    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.x1 && p.x <= self.x2 && p.y >= self.y1 && p.y <= self.y2
    }

    /// Ten reference points approximating where hands and feet can touch
    /// the ball: corners, edge midpoints, center, and a chest-height point
    /// one third down from the top.
    pub fn anchor_points(&self) -> [Point2; 10] {
        let w = self.width();
        let h = self.height();
        let cx = self.x1 + w / 2.0;
        let cy = self.y1 + h / 2.0;
        [
            Point2::new(cx, self.y1),
            Point2::new(self.x2, self.y1),
            Point2::new(self.x1, self.y1),
            Point2::new(self.x2, cy),
            Point2::new(self.x1, cy),
            Point2::new(cx, cy),
            Point2::new(self.x2, self.y2),
            Point2::new(self.x1, self.y2),
            Point2::new(cx, self.y2),
            Point2::new(cx, self.y1 + h / 3.0),
        ]
    }

    /// Smallest distance from `p` to any of the anchor points.
    pub fn min_anchor_distance(&self, p: &Point2) -> f64 {
        self.anchor_points()
            .iter()
            .map(|a| a.distance(p))
            .fold(f64::INFINITY, f64::min)
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl JsonSchema for BBox {
    fn schema_name() -> String {
        "BBox".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        <[f64; 4]>::json_schema(gen)
    }
}
