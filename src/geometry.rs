use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box, closed on every side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    fn enclosing(points: &[Point]) -> Self {
        points.iter().fold(
            Self {
                min_x: f64::INFINITY,
                min_y: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |acc, p| Self {
                min_x: acc.min_x.min(p.x),
                min_y: acc.min_y.min(p.y),
                max_x: acc.max_x.max(p.x),
                max_y: acc.max_y.max(p.y),
            },
        )
    }
}

/// A closed planar shape that can be sampled around and tested against.
///
/// Implementations are shared read-only across runs, possibly across threads.
pub trait Region: Send + Sync {
    fn bounds(&self) -> Bounds;
    fn contains(&self, point: Point) -> bool;
    fn area(&self) -> f64;
}

/// Simple polygon stored as an implicitly closed ring of vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point>,
    bounds: Bounds,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        let bounds = Bounds::enclosing(&vertices);
        Self { vertices, bounds }
    }

    /// Square with its lower-left corner at `origin`.
    pub fn square(origin: Point, side: f64) -> Result<Self> {
        if side.is_nan() || side <= 0.0 || side.is_infinite() {
            return Err(EstimateError::InvalidInput(format!(
                "square side must be positive, got {side}"
            )));
        }
        Ok(Self::new(vec![
            origin,
            Point::new(origin.x, origin.y + side),
            Point::new(origin.x + side, origin.y + side),
            Point::new(origin.x + side, origin.y),
        ]))
    }

    /// Regular polygon approximating a circle with `quad_segs` segments per
    /// quarter turn. Every vertex lies on the true circle, so the polygon area
    /// is slightly smaller than `PI * radius^2`.
    pub fn circle(center: Point, radius: f64, quad_segs: u32) -> Result<Self> {
        if quad_segs == 0 {
            return Err(EstimateError::InvalidInput(
                "circle needs at least one segment per quadrant".into(),
            ));
        }
        if radius.is_nan() || radius <= 0.0 || radius.is_infinite() {
            return Err(EstimateError::InvalidInput(format!(
                "circle radius must be positive, got {radius}"
            )));
        }
        let segments = 4 * quad_segs as usize;
        let vertices = (0..segments)
            .map(|k| {
                let angle = TAU * k as f64 / segments as f64;
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            })
            .collect();
        Ok(Self::new(vertices))
    }

    pub fn exterior(&self) -> &[Point] {
        &self.vertices
    }

    pub fn segment_count(&self) -> usize {
        self.vertices.len()
    }

    fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            / 2.0
    }

    pub fn centroid(&self) -> Point {
        let area = self.signed_area();
        if area == 0.0 {
            let n = self.vertices.len().max(1) as f64;
            let (sx, sy) = self
                .vertices
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
            return Point::new(sx / n, sy / n);
        }
        let (cx, cy) = self.edges().fold((0.0, 0.0), |(cx, cy), (a, b)| {
            let cross = a.x * b.y - b.x * a.y;
            (cx + (a.x + b.x) * cross, cy + (a.y + b.y) * cross)
        });
        Point::new(cx / (6.0 * area), cy / (6.0 * area))
    }

    fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

impl Region for Polygon {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Strict interior test: points on the ring are outside.
    fn contains(&self, point: Point) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if on_segment(a, b, point) {
                return false;
            }
            if (a.y > point.y) != (b.y > point.y) {
                let crossing = a.x + (b.x - a.x) * (point.y - a.y) / (b.y - a.y);
                if point.x < crossing {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn area(&self) -> f64 {
        self.signed_area().abs()
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    cross == 0.0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// The sampling square and the circle inscribed in it.
#[derive(Debug, Clone)]
pub struct RegionPair {
    pub sampling: Polygon,
    pub target: Polygon,
}

impl RegionPair {
    pub fn new(sampling: Polygon, target: Polygon) -> Self {
        Self { sampling, target }
    }

    /// Circle centred on the square's centroid, touching all four sides.
    pub fn inscribed(square: Polygon, quad_segs: u32) -> Result<Self> {
        let bounds = square.bounds();
        let radius = bounds.width().min(bounds.height()) / 2.0;
        let target = Polygon::circle(square.centroid(), radius, quad_segs)?;
        Ok(Self::new(square, target))
    }

    /// 4 * target area / sampling area, the value a perfect sampler converges to.
    pub fn area_ratio(&self) -> f64 {
        4.0 * (self.target.area() / self.sampling.area())
    }
}
