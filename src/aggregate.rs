use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EstimateError, Result};
use crate::estimate::RunResult;
use crate::strategies::LazyEstimate;

/// Per-observation mean of the running estimate across runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub runs: usize,
    pub observations: Vec<u64>,
    pub estimate: Vec<f64>,
}

impl AggregateResult {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn series(&self) -> Vec<(u64, f64)> {
        self.observations
            .iter()
            .copied()
            .zip(self.estimate.iter().copied())
            .collect()
    }

    pub fn final_estimate(&self) -> Option<f64> {
        self.estimate.last().copied()
    }
}

/// Averages the running estimate at every observation index.
///
/// All runs must hold the same number of records.
pub fn aggregate(runs: &[RunResult]) -> Result<AggregateResult> {
    let first = runs.first().ok_or(EstimateError::NoRuns)?;
    let expected = first.len();
    for (run, result) in runs.iter().enumerate() {
        if result.len() != expected {
            return Err(EstimateError::LengthMismatch {
                run,
                expected,
                found: result.len(),
            });
        }
    }

    let count = runs.len() as f64;
    let estimate = (0..expected)
        .map(|i| runs.iter().map(|run| run.records[i].estimate).sum::<f64>() / count)
        .collect();
    let observations = first.records.iter().map(|r| r.observation).collect();

    Ok(AggregateResult {
        runs: runs.len(),
        observations,
        estimate,
    })
}

/// One run's curve, tagged for the un-aggregated view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelledSeries {
    pub label: String,
    pub seed: Option<u64>,
    pub points: Vec<(u64, f64)>,
}

pub fn labelled_series(runs: &[RunResult]) -> Vec<LabelledSeries> {
    runs.iter()
        .enumerate()
        .map(|(idx, run)| LabelledSeries {
            label: format!("Simulation #{}", idx + 1),
            seed: run.seed,
            points: run.series(),
        })
        .collect()
}

/// Several unevaluated runs waiting to be averaged.
#[derive(Debug)]
pub struct LazyAggregate<'r> {
    runs: Vec<LazyEstimate<'r>>,
    parallel: bool,
}

impl<'r> LazyAggregate<'r> {
    pub fn new(runs: Vec<LazyEstimate<'r>>) -> Self {
        Self {
            runs,
            parallel: false,
        }
    }

    /// Evaluate the runs on the rayon pool. Each run owns its generator, so
    /// results do not depend on scheduling.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn push(&mut self, run: LazyEstimate<'r>) {
        self.runs.push(run);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn collect_runs(self) -> Vec<RunResult> {
        if self.parallel {
            self.runs.into_par_iter().map(LazyEstimate::collect).collect()
        } else {
            self.runs.into_iter().map(LazyEstimate::collect).collect()
        }
    }

    pub fn collect(self) -> Result<AggregateResult> {
        let runs = self.collect_runs();
        let result = aggregate(&runs)?;
        info!(
            runs = result.runs,
            observations = result.len(),
            estimate = ?result.final_estimate(),
            "aggregate collected"
        );
        Ok(result)
    }
}
