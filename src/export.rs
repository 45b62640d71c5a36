//! JSON export of run and aggregate results

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::aggregate::{AggregateResult, LabelledSeries};
use crate::engine::Engine;
use crate::error::Result;
use crate::estimate::{ObservationRecord, RunResult};
use crate::rng::Generator;
use crate::strategies::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub scenario: String,
    pub generator: Generator,
    pub strategy: StrategyKind,
    pub seeds: Vec<u64>,
    pub samples: usize,
    pub area_ratio: f64,
    pub created_at: DateTime<Utc>,
}

impl ExportMetadata {
    pub fn new(
        scenario: impl Into<String>,
        generator: Generator,
        strategy: StrategyKind,
        seeds: Vec<u64>,
        samples: usize,
        area_ratio: f64,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            generator,
            strategy,
            seeds,
            samples,
            area_ratio,
            created_at: Utc::now(),
        }
    }

    /// Generator, strategy and sample count as configured on `engine`, which
    /// are the ones [`Engine::collect_runs`] and [`Engine::run`] use.
    pub fn for_engine(scenario: impl Into<String>, engine: &Engine, seeds: Vec<u64>) -> Self {
        let settings = engine.settings();
        Self::new(
            scenario,
            settings.generator,
            settings.strategy,
            seeds,
            settings.samples,
            engine.regions().area_ratio(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunExport {
    pub metadata: ExportMetadata,
    pub records: Vec<ObservationRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExport {
    pub metadata: ExportMetadata,
    pub aggregate: AggregateResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runs: Vec<LabelledSeries>,
}

pub struct ExportWriter {
    output_dir: PathBuf,
}

impl ExportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn write_run(&self, metadata: ExportMetadata, run: &RunResult) -> Result<PathBuf> {
        let file_name = match run.seed {
            Some(seed) => format!("{}_run_seed_{seed}.json", metadata.scenario),
            None => format!("{}_run_unseeded.json", metadata.scenario),
        };
        let export = RunExport {
            metadata,
            records: run.records.clone(),
        };
        self.write_json(&file_name, &export)
    }

    pub fn write_aggregate(
        &self,
        metadata: ExportMetadata,
        aggregate: &AggregateResult,
        runs: Vec<LabelledSeries>,
    ) -> Result<PathBuf> {
        let file_name = format!(
            "{}_aggregate_{}x{}.json",
            metadata.scenario,
            aggregate.runs,
            aggregate.len()
        );
        let export = AggregateExport {
            metadata,
            aggregate: aggregate.clone(),
            runs,
        };
        self.write_json(&file_name, &export)
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

pub fn load_run(path: impl AsRef<Path>) -> Result<RunExport> {
    read_json(path.as_ref())
}

pub fn load_aggregate(path: impl AsRef<Path>) -> Result<AggregateExport> {
    read_json(path.as_ref())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
