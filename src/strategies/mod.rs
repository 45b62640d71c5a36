mod deferred;
mod eager;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use deferred::{DeferredStrategy, EstimateFrame, LazyEstimate, PointSource};
pub use eager::EagerStrategy;

use crate::estimate::RunResult;
use crate::geometry::{Point, Region};

/// Turns a sampled point sequence into observation records.
///
/// Every implementation must produce identical records for identical input.
pub trait EstimateStrategy: Send + Sync {
    fn name(&self) -> &str;
    fn estimate(&self, points: Vec<Point>, target: &dyn Region) -> RunResult;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Eager,
    #[default]
    Deferred,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn EstimateStrategy> {
        match self {
            StrategyKind::Eager => Box::new(EagerStrategy::new()),
            StrategyKind::Deferred => Box::new(DeferredStrategy::new()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Eager => write!(f, "eager"),
            StrategyKind::Deferred => write!(f, "deferred"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(StrategyKind::Eager),
            "deferred" => Ok(StrategyKind::Deferred),
            other => Err(format!("unknown strategy '{other}' (expected eager or deferred)")),
        }
    }
}
