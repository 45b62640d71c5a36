use crate::{
    estimate::{running_estimate, ObservationRecord, RunResult},
    geometry::{Point, Region},
    strategies::EstimateStrategy,
};

/// One point at a time, carrying the running count forward.
pub struct EagerStrategy;

impl EagerStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EagerStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateStrategy for EagerStrategy {
    fn name(&self) -> &str {
        "eager"
    }

    fn estimate(&self, points: Vec<Point>, target: &dyn Region) -> RunResult {
        let mut observation = 0_u64;
        let mut inside_cumsum = 0_u64;
        let mut records = Vec::with_capacity(points.len());

        for point in &points {
            observation += 1;
            let inside = target.contains(*point);
            if inside {
                inside_cumsum += 1;
            }
            records.push(ObservationRecord {
                observation,
                inside,
                inside_cumsum,
                estimate: running_estimate(inside_cumsum, observation),
            });
        }

        RunResult::new(points, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    #[test]
    fn counts_points_inside() {
        let square = Polygon::square(Point::new(0.0, 0.0), 1.0).unwrap();
        let points = vec![
            Point::new(0.5, 0.5),
            Point::new(2.0, 2.0),
            Point::new(0.25, 0.75),
        ];
        let run = EagerStrategy::new().estimate(points, &square);
        let cumsum: Vec<u64> = run.records.iter().map(|r| r.inside_cumsum).collect();
        assert_eq!(cumsum, vec![1, 1, 2]);
        assert_eq!(run.records[1].estimate, 2.0);
        assert_eq!(run.records[2].observation, 3);
    }

    #[test]
    fn no_points_no_records() {
        let square = Polygon::square(Point::new(0.0, 0.0), 1.0).unwrap();
        let run = EagerStrategy::new().estimate(Vec::new(), &square);
        assert!(run.is_empty());
        assert!(run.points.is_empty());
    }
}
