//! Seed hierarchies: one top-level seed fans out into child seeds, each of
//! which seeds its own independent generator.

use serde::{Deserialize, Serialize};

use crate::error::{EstimateError, Result};
use crate::rng::{Generator, RngExt};

/// Half-open range `[low, high)` child seeds are drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedRange {
    pub low: u64,
    pub high: u64,
}

impl Default for SeedRange {
    fn default() -> Self {
        Self { low: 1, high: 100 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedNode {
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SeedNode>,
}

impl SeedNode {
    pub fn child_seeds(&self) -> Vec<u64> {
        self.children.iter().map(|child| child.seed).collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SeedTree {
    generator: Generator,
    range: SeedRange,
}

impl SeedTree {
    pub fn new(generator: Generator, range: SeedRange) -> Result<Self> {
        if range.low >= range.high {
            return Err(EstimateError::InvalidInput(format!(
                "seed range [{}, {}) is empty",
                range.low, range.high
            )));
        }
        Ok(Self { generator, range })
    }

    /// `count` seeds drawn from a fresh generator seeded with `seed`.
    pub fn children(&self, seed: u64, count: usize) -> Vec<u64> {
        let mut rng = self.generator.rng(Some(seed));
        (0..count)
            .map(|_| rng.bounded(self.range.low, self.range.high))
            .collect()
    }

    /// Expands `seed` level by level; `widths[d]` is the fan-out at depth `d`.
    pub fn grow(&self, seed: u64, widths: &[usize]) -> SeedNode {
        let children = match widths.split_first() {
            Some((&width, rest)) => self
                .children(seed, width)
                .into_iter()
                .map(|child| self.grow(child, rest))
                .collect(),
            None => Vec::new(),
        };
        SeedNode { seed, children }
    }
}
