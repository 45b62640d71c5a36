//! Batch evaluation over columns.
//!
//! A [`LazyEstimate`] only describes the work: where the points come from and
//! which region they are tested against. Nothing is sampled or tested until
//! [`LazyEstimate::collect`] runs the stages in order:
//!
//! ```text
//! point -> inside -> inside_cumsum, observations -> estimate
//! ```

use std::fmt;

use tracing::debug;

use crate::{
    estimate::{running_estimate, ObservationRecord, RunResult},
    geometry::{Point, Region},
    rng::Generator,
    sampler::PointSampler,
    strategies::EstimateStrategy,
};

const STAGES: [&str; 4] = ["contains", "cum_sum", "observations", "ratio"];

#[derive(Clone, Debug)]
pub enum PointSource {
    Points(Vec<Point>),
    Sampled {
        sampler: PointSampler,
        generator: Generator,
        seed: Option<u64>,
        count: usize,
    },
}

impl PointSource {
    fn materialize(self) -> Vec<Point> {
        match self {
            PointSource::Points(points) => points,
            PointSource::Sampled {
                sampler,
                generator,
                seed,
                count,
            } => sampler.sample_seeded(generator, seed, count),
        }
    }
}

/// Unevaluated estimate pipeline.
pub struct LazyEstimate<'r> {
    source: PointSource,
    target: &'r dyn Region,
}

impl<'r> LazyEstimate<'r> {
    pub fn from_points(points: Vec<Point>, target: &'r dyn Region) -> Self {
        Self {
            source: PointSource::Points(points),
            target,
        }
    }

    pub fn sampled(
        sampler: PointSampler,
        generator: Generator,
        seed: Option<u64>,
        count: usize,
        target: &'r dyn Region,
    ) -> Self {
        Self {
            source: PointSource::Sampled {
                sampler,
                generator,
                seed,
                count,
            },
            target,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        match &self.source {
            PointSource::Sampled { seed, .. } => *seed,
            PointSource::Points(_) => None,
        }
    }

    /// Number of rows the plan will produce once collected.
    pub fn len(&self) -> usize {
        match &self.source {
            PointSource::Points(points) => points.len(),
            PointSource::Sampled { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stages(&self) -> &'static [&'static str] {
        &STAGES
    }

    pub fn collect_frame(self) -> EstimateFrame {
        let seed = self.seed();
        let point = self.source.materialize();
        debug!(rows = point.len(), ?seed, "deferred: points materialized");

        let inside: Vec<u8> = point
            .iter()
            .map(|p| u8::from(self.target.contains(*p)))
            .collect();
        debug!(rows = inside.len(), "deferred: containment column");

        let inside_cumsum: Vec<u64> = inside
            .iter()
            .scan(0_u64, |acc, &flag| {
                *acc += u64::from(flag);
                Some(*acc)
            })
            .collect();
        let observations: Vec<u64> = (1..=point.len() as u64).collect();

        let estimate: Vec<f64> = inside_cumsum
            .iter()
            .zip(&observations)
            .map(|(&cum, &obs)| running_estimate(cum, obs))
            .collect();
        debug!(rows = estimate.len(), "deferred: estimate column");

        EstimateFrame {
            seed,
            point,
            inside,
            inside_cumsum,
            observations,
            estimate,
        }
    }

    pub fn collect(self) -> RunResult {
        self.collect_frame().into_run_result()
    }
}

impl fmt::Debug for LazyEstimate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            PointSource::Points(points) => format!("points(n={})", points.len()),
            PointSource::Sampled {
                generator,
                seed,
                count,
                ..
            } => format!("sampled({generator}, n={count}, seed={seed:?})"),
        };
        f.debug_struct("LazyEstimate")
            .field("source", &source)
            .field("stages", &STAGES)
            .finish()
    }
}

/// Collected columns, one row per observation.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimateFrame {
    pub seed: Option<u64>,
    pub point: Vec<Point>,
    pub inside: Vec<u8>,
    pub inside_cumsum: Vec<u64>,
    pub observations: Vec<u64>,
    pub estimate: Vec<f64>,
}

impl EstimateFrame {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn into_run_result(self) -> RunResult {
        let records = self
            .observations
            .iter()
            .zip(&self.inside)
            .zip(&self.inside_cumsum)
            .zip(&self.estimate)
            .map(
                |(((&observation, &inside), &inside_cumsum), &estimate)| ObservationRecord {
                    observation,
                    inside: inside == 1,
                    inside_cumsum,
                    estimate,
                },
            )
            .collect();
        RunResult::new(self.point, records).with_seed(self.seed)
    }
}

pub struct DeferredStrategy;

impl DeferredStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn lazy<'r>(&self, points: Vec<Point>, target: &'r dyn Region) -> LazyEstimate<'r> {
        LazyEstimate::from_points(points, target)
    }
}

impl Default for DeferredStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateStrategy for DeferredStrategy {
    fn name(&self) -> &str {
        "deferred"
    }

    fn estimate(&self, points: Vec<Point>, target: &dyn Region) -> RunResult {
        self.lazy(points, target).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn square() -> Polygon {
        Polygon::square(Point::new(0.0, 0.0), 1.0).unwrap()
    }

    #[test]
    fn frame_columns_line_up() {
        let target = square();
        let frame = LazyEstimate::from_points(
            vec![
                Point::new(0.5, 0.5),
                Point::new(3.0, 0.5),
                Point::new(0.1, 0.9),
            ],
            &target,
        )
        .collect_frame();
        assert_eq!(frame.inside, vec![1, 0, 1]);
        assert_eq!(frame.inside_cumsum, vec![1, 1, 2]);
        assert_eq!(frame.observations, vec![1, 2, 3]);
        assert_eq!(frame.estimate[2], 4.0 * (2.0 / 3.0));
    }

    #[test]
    fn plan_is_described_without_running() {
        let target = square();
        let sampler = PointSampler::for_region(&target);
        let lazy = LazyEstimate::sampled(sampler, Generator::Pcg64, Some(9), 1_000, &target);
        assert_eq!(lazy.len(), 1_000);
        assert_eq!(lazy.seed(), Some(9));
        let described = format!("{lazy:?}");
        assert!(described.contains("sampled(pcg64, n=1000, seed=Some(9))"));
        assert!(described.contains("cum_sum"));
    }

    #[test]
    fn empty_plan_collects_to_empty_run() {
        let target = square();
        let sampler = PointSampler::for_region(&target);
        let run = LazyEstimate::sampled(sampler, Generator::Pcg64, Some(1), 0, &target).collect();
        assert!(run.is_empty());
        assert_eq!(run.seed, Some(1));
    }
}
