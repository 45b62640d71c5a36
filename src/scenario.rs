use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    engine::{EngineSettings, DEFAULT_QUAD_SEGS, DEFAULT_SIDE},
    geometry::{Point, Polygon, RegionPair},
    rng::Generator,
    seeds::{SeedRange, SeedTree},
    strategies::StrategyKind,
};

fn default_name() -> String {
    "default".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_samples() -> u64 {
    10_000
}

fn default_simulations() -> u64 {
    50
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("figs")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_samples")]
    pub samples: u64,
    #[serde(default = "default_simulations")]
    pub simulations: u64,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default)]
    pub generator: Generator,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub region: RegionConfig,
    #[serde(default)]
    pub seed_range: SeedRangeConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    #[serde(default)]
    pub origin: [f64; 2],
    #[serde(default = "default_side")]
    pub side: f64,
    #[serde(default = "default_quad_segs")]
    pub quad_segs: u32,
}

fn default_side() -> f64 {
    DEFAULT_SIDE
}

fn default_quad_segs() -> u32 {
    DEFAULT_QUAD_SEGS
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0],
            side: default_side(),
            quad_segs: default_quad_segs(),
        }
    }
}

/// `[low, high)` as a two-element list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeedRangeConfig(pub u64, pub u64);

impl Default for SeedRangeConfig {
    fn default() -> Self {
        let range = SeedRange::default();
        Self(range.low, range.high)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub plot: bool,
    #[serde(default = "default_true")]
    pub export: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            plot: true,
            export: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: None,
            seed: default_seed(),
            samples: default_samples(),
            simulations: default_simulations(),
            strategy: StrategyKind::default(),
            generator: Generator::default(),
            parallel: false,
            region: RegionConfig::default(),
            seed_range: SeedRangeConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_regions(&self) -> Result<RegionPair> {
        let [x, y] = self.region.origin;
        let square = Polygon::square(Point::new(x, y), self.region.side)
            .context("Invalid sampling square")?;
        let regions = RegionPair::inscribed(square, self.region.quad_segs)
            .context("Invalid inscribed circle")?;
        Ok(regions)
    }

    pub fn seed_tree(&self) -> Result<SeedTree> {
        let SeedRangeConfig(low, high) = self.seed_range;
        let tree = SeedTree::new(self.generator, SeedRange { low, high })?;
        Ok(tree)
    }

    pub fn engine_settings(&self, samples_override: Option<u64>) -> Result<EngineSettings> {
        let samples = samples_override.unwrap_or(self.samples);
        let samples = usize::try_from(samples)
            .with_context(|| format!("Sample count {samples} does not fit in memory"))?;
        Ok(EngineSettings {
            generator: self.generator,
            samples,
            strategy: self.strategy,
            parallel: self.parallel,
        })
    }

    pub fn simulations(&self, override_simulations: Option<u64>) -> u64 {
        override_simulations.unwrap_or(self.simulations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let scenario: Scenario = serde_yaml::from_str("name: tiny\n").unwrap();
        assert_eq!(scenario.name, "tiny");
        assert_eq!(scenario.seed, 42);
        assert_eq!(scenario.samples, 10_000);
        assert_eq!(scenario.strategy, StrategyKind::Deferred);
        assert_eq!(scenario.generator, Generator::Pcg64);
        assert_eq!(scenario.region.quad_segs, 1000);
        assert_eq!(scenario.seed_range.0, 1);
        assert_eq!(scenario.seed_range.1, 100);
    }

    #[test]
    fn name_is_required() {
        let parsed: std::result::Result<Scenario, _> = serde_yaml::from_str("seed: 3\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let parsed: std::result::Result<Scenario, _> =
            serde_yaml::from_str("name: bad\nsamples: -5\n");
        assert!(parsed.is_err());
        let parsed: std::result::Result<Scenario, _> =
            serde_yaml::from_str("name: bad\nsimulations: 2.5\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn overrides_win() {
        let scenario = Scenario::default();
        assert_eq!(scenario.simulations(Some(3)), 3);
        assert_eq!(scenario.simulations(None), 50);
        assert_eq!(scenario.engine_settings(Some(7)).unwrap().samples, 7);
    }

    #[test]
    fn bad_region_is_reported() {
        let scenario: Scenario =
            serde_yaml::from_str("name: flat\nregion:\n  side: 0.0\n").unwrap();
        assert!(scenario.build_regions().is_err());
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let scenario = Scenario::default();
        let text = serde_yaml::to_string(&scenario).unwrap();
        let loaded: Scenario = serde_yaml::from_str(&text).unwrap();
        assert_eq!(loaded.name, scenario.name);
        assert_eq!(loaded.region.side, scenario.region.side);
    }
}
