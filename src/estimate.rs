use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Running estimate after `observation` samples of which `inside_cumsum`
/// landed in the target region.
pub fn running_estimate(inside_cumsum: u64, observation: u64) -> f64 {
    4.0 * (inside_cumsum as f64 / observation as f64)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// 1-based.
    pub observation: u64,
    pub inside: bool,
    pub inside_cumsum: u64,
    pub estimate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub points_inside: u64,
    pub total_points: u64,
    pub estimate: f64,
}

/// Records of one seeded simulation plus the points that produced them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub seed: Option<u64>,
    pub points: Vec<Point>,
    pub records: Vec<ObservationRecord>,
}

impl RunResult {
    pub fn new(points: Vec<Point>, records: Vec<ObservationRecord>) -> Self {
        Self {
            seed: None,
            points,
            records,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (observation, estimate) pairs in observation order.
    pub fn series(&self) -> Vec<(u64, f64)> {
        self.records
            .iter()
            .map(|r| (r.observation, r.estimate))
            .collect()
    }

    /// First `observations` records, clamped to what the run holds.
    pub fn window(&self, observations: usize) -> &[ObservationRecord] {
        let end = observations.min(self.records.len());
        if end < observations {
            tracing::warn!(
                requested = observations,
                available = self.records.len(),
                "display window clamped to run length"
            );
        }
        &self.records[..end]
    }

    pub fn summary(&self, observations: usize) -> Option<RunSummary> {
        self.window(observations).last().map(|last| RunSummary {
            points_inside: last.inside_cumsum,
            total_points: last.observation,
            estimate: last.estimate,
        })
    }

    pub fn final_estimate(&self) -> Option<f64> {
        self.records.last().map(|r| r.estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_from_flags(flags: &[bool]) -> RunResult {
        let mut inside = 0;
        let records = flags
            .iter()
            .enumerate()
            .map(|(i, &flag)| {
                inside += u64::from(flag);
                let observation = i as u64 + 1;
                ObservationRecord {
                    observation,
                    inside: flag,
                    inside_cumsum: inside,
                    estimate: running_estimate(inside, observation),
                }
            })
            .collect();
        RunResult::new(vec![Point::new(0.0, 0.0); flags.len()], records)
    }

    #[test]
    fn window_clamps_to_length() {
        let run = run_from_flags(&[true, false, true]);
        assert_eq!(run.window(2).len(), 2);
        assert_eq!(run.window(10).len(), 3);
        assert!(run.window(0).is_empty());
    }

    #[test]
    fn summary_reads_last_record_in_window() {
        let run = run_from_flags(&[true, false, true, true]);
        let summary = run.summary(2).unwrap();
        assert_eq!(summary.points_inside, 1);
        assert_eq!(summary.total_points, 2);
        assert_eq!(summary.estimate, 2.0);
        assert_eq!(run.summary(100).unwrap().total_points, 4);
        assert!(RunResult::default().summary(5).is_none());
    }

    #[test]
    fn series_pairs_observation_and_estimate() {
        let run = run_from_flags(&[false, true]);
        assert_eq!(run.series(), vec![(1, 0.0), (2, 2.0)]);
        assert_eq!(run.final_estimate(), Some(2.0));
    }
}
