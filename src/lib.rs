pub mod aggregate;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod export;
pub mod geometry;
pub mod logging;
pub mod plot;
pub mod rng;
pub mod sampler;
pub mod scenario;
pub mod seeds;
pub mod strategies;
pub mod web;

pub use aggregate::{aggregate, AggregateResult, LazyAggregate};
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use error::{EstimateError, Result};
pub use estimate::{ObservationRecord, RunResult, RunSummary};
pub use geometry::{Point, Polygon, Region, RegionPair};
pub use scenario::{Scenario, ScenarioLoader};
pub use strategies::{EstimateStrategy, LazyEstimate, StrategyKind};
