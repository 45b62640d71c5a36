use rand::RngCore;

use crate::geometry::{Bounds, Point, Region};
use crate::rng::{Generator, RngExt};

/// Draws uniform points inside a bounding box.
///
/// Points are only guaranteed to fall inside the box, not inside whatever
/// non-rectangular region the box was taken from.
#[derive(Clone, Copy, Debug)]
pub struct PointSampler {
    bounds: Bounds,
}

impl PointSampler {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn for_region(region: &dyn Region) -> Self {
        Self::new(region.bounds())
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// All `count` x coordinates are drawn before the first y coordinate.
    pub fn sample<R: RngCore + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Point> {
        let b = self.bounds;
        let xs: Vec<f64> = (0..count).map(|_| rng.uniform(b.min_x, b.max_x)).collect();
        let ys: Vec<f64> = (0..count).map(|_| rng.uniform(b.min_y, b.max_y)).collect();
        xs.into_iter()
            .zip(ys)
            .map(|(x, y)| Point::new(x, y))
            .collect()
    }

    pub fn sample_seeded(&self, generator: Generator, seed: Option<u64>, count: usize) -> Vec<Point> {
        let mut rng = generator.rng(seed);
        self.sample(&mut rng, count)
    }
}
