use rayon::prelude::*;
use tracing::info;

use crate::{
    aggregate::{AggregateResult, LazyAggregate},
    error::{EstimateError, Result},
    estimate::RunResult,
    geometry::{Point, Polygon, Region, RegionPair},
    rng::Generator,
    sampler::PointSampler,
    strategies::{EstimateStrategy, LazyEstimate, StrategyKind},
};

pub const DEFAULT_SIDE: f64 = 4.0;
pub const DEFAULT_QUAD_SEGS: u32 = 1000;

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub generator: Generator,
    pub samples: usize,
    pub strategy: StrategyKind,
    pub parallel: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            generator: Generator::Pcg64,
            samples: 10_000,
            strategy: StrategyKind::Deferred,
            parallel: false,
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    regions: Option<RegionPair>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            regions: None,
        }
    }

    pub fn with_regions(mut self, regions: RegionPair) -> Self {
        self.regions = Some(regions);
        self
    }

    /// Falls back to the 4x4 square at the origin with its inscribed circle.
    pub fn build(self) -> Result<Engine> {
        let regions = match self.regions {
            Some(regions) => regions,
            None => RegionPair::inscribed(
                Polygon::square(Point::new(0.0, 0.0), DEFAULT_SIDE)?,
                DEFAULT_QUAD_SEGS,
            )?,
        };
        Ok(Engine {
            strategy: self.settings.strategy.build(),
            regions,
            settings: self.settings,
        })
    }
}

/// Runs seeded simulations against one shared, read-only region pair.
pub struct Engine {
    settings: EngineSettings,
    regions: RegionPair,
    strategy: Box<dyn EstimateStrategy>,
}

impl Engine {
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn regions(&self) -> &RegionPair {
        &self.regions
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn sampler(&self) -> PointSampler {
        PointSampler::for_region(&self.regions.sampling)
    }

    pub fn run(&self, seed: Option<u64>) -> RunResult {
        let points =
            self.sampler()
                .sample_seeded(self.settings.generator, seed, self.settings.samples);
        let result = self
            .strategy
            .estimate(points, &self.regions.target)
            .with_seed(seed);
        info!(
            strategy = self.strategy.name(),
            ?seed,
            samples = result.len(),
            estimate = ?result.final_estimate(),
            "run complete"
        );
        result
    }

    /// The same run as [`Engine::run`], left unevaluated. Collecting it always
    /// goes through the deferred pipeline, whatever strategy is configured.
    pub fn lazy(&self, seed: Option<u64>) -> LazyEstimate<'_> {
        LazyEstimate::sampled(
            self.sampler(),
            self.settings.generator,
            seed,
            self.settings.samples,
            &self.regions.target as &dyn Region,
        )
    }

    pub fn run_many(&self, seeds: &[u64]) -> Vec<RunResult> {
        if self.settings.parallel {
            seeds.par_iter().map(|&seed| self.run(Some(seed))).collect()
        } else {
            seeds.iter().map(|&seed| self.run(Some(seed))).collect()
        }
    }

    /// Sequential runs; `hook` sees each result as soon as it exists.
    pub fn run_with_hook<F>(&self, seeds: &[u64], mut hook: F) -> Vec<RunResult>
    where
        F: FnMut(usize, &RunResult),
    {
        seeds
            .iter()
            .enumerate()
            .map(|(idx, &seed)| {
                let result = self.run(Some(seed));
                hook(idx, &result);
                result
            })
            .collect()
    }

    pub fn lazy_aggregate(&self, seeds: &[u64]) -> LazyAggregate<'_> {
        LazyAggregate::new(seeds.iter().map(|&seed| self.lazy(Some(seed))).collect())
            .parallel(self.settings.parallel)
    }

    /// One run per seed through the configured strategy: deferred runs are
    /// collected as a [`LazyAggregate`], eager runs one by one.
    pub fn collect_runs(&self, seeds: &[u64]) -> Vec<RunResult> {
        match self.settings.strategy {
            StrategyKind::Deferred => self.lazy_aggregate(seeds).collect_runs(),
            StrategyKind::Eager => self.run_many(seeds),
        }
    }

    pub fn aggregate(&self, seeds: &[u64]) -> Result<AggregateResult> {
        if seeds.is_empty() {
            return Err(EstimateError::InvalidInput(
                "at least one simulation is required".into(),
            ));
        }
        crate::aggregate::aggregate(&self.run_many(seeds))
    }
}
