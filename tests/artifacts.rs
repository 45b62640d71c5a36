use montecarlo_pi::{
    aggregate::labelled_series,
    engine::{EngineBuilder, EngineSettings},
    export::{load_aggregate, load_run, ExportMetadata, ExportWriter},
    plot::{EstimateFigure, PointsFigure},
    rng::Generator,
    strategies::StrategyKind,
};
use tempfile::tempdir;

fn engine() -> montecarlo_pi::Engine {
    EngineBuilder::new(EngineSettings {
        generator: Generator::Pcg64,
        samples: 40,
        strategy: StrategyKind::Eager,
        parallel: false,
    })
    .build()
    .expect("engine")
}

fn metadata(engine: &montecarlo_pi::Engine, seeds: Vec<u64>) -> ExportMetadata {
    ExportMetadata::for_engine("artifacts", engine, seeds)
}

#[test]
fn run_export_round_trips_records() {
    let temp = tempdir().expect("tempdir");
    let engine = engine();
    let run = engine.run(Some(42));

    let writer = ExportWriter::new(temp.path()).expect("writer");
    let path = writer
        .write_run(metadata(&engine, vec![42]), &run)
        .expect("write run");
    assert!(path.exists());

    let loaded = load_run(&path).expect("load run");
    assert_eq!(loaded.records, run.records);
    assert_eq!(loaded.metadata.strategy, StrategyKind::Eager);
    assert_eq!(loaded.metadata.samples, 40);
}

#[test]
fn aggregate_export_keeps_labelled_runs() {
    let temp = tempdir().expect("tempdir");
    let engine = engine();
    let seeds = vec![9, 77];
    let runs = engine.run_many(&seeds);
    let averaged = montecarlo_pi::aggregate(&runs).expect("aggregate");

    let writer = ExportWriter::new(temp.path()).expect("writer");
    let path = writer
        .write_aggregate(metadata(&engine, seeds.clone()), &averaged, labelled_series(&runs))
        .expect("write aggregate");
    assert!(path.ends_with("artifacts_aggregate_2x40.json"));

    let loaded = load_aggregate(&path).expect("load aggregate");
    assert_eq!(loaded.aggregate, averaged);
    assert_eq!(loaded.metadata.seeds, seeds);
    assert_eq!(loaded.runs.len(), 2);
    assert_eq!(loaded.runs[1].label, "Simulation #2");
}

#[test]
fn figures_are_written_to_nested_directories() {
    let temp = tempdir().expect("tempdir");
    let engine = engine();
    let run = engine.run(Some(42));

    let html = temp.path().join("figs").join("estimate.html");
    EstimateFigure::new()
        .add_series(None, run.series())
        .write_html(&html)
        .expect("estimate figure");
    let contents = std::fs::read_to_string(&html).expect("read html");
    assert!(contents.starts_with("<!DOCTYPE html>"));
    assert!(contents.to_uppercase().contains("#FF0000"));

    let svg = temp.path().join("figs").join("points.svg");
    PointsFigure::new(engine.regions(), &run, 10)
        .write_svg(&svg)
        .expect("points figure");
    let contents = std::fs::read_to_string(&svg).expect("read svg");
    assert_eq!(contents.matches("<circle").count(), 10);
}

#[test]
fn unaggregated_figure_has_one_series_per_run() {
    let engine = engine();
    let runs = engine.run_many(&[1, 2, 3]);
    let figure = labelled_series(&runs)
        .into_iter()
        .fold(EstimateFigure::new(), |figure, series| {
            figure.add_series(Some(series.label), series.points)
        });
    assert_eq!(figure.series_count(), 3);
    assert!(figure
        .render_svg()
        .expect("render")
        .contains("Simulation #3"));
}

#[test]
fn aggregate_export_records_the_strategy_that_ran() {
    let temp = tempdir().expect("tempdir");
    let scenario = montecarlo_pi::ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/quick.yaml")
        .expect("quick scenario should load");
    let engine = EngineBuilder::new(scenario.engine_settings(Some(30)).expect("settings"))
        .with_regions(scenario.build_regions().expect("regions"))
        .build()
        .expect("engine");
    assert_eq!(engine.strategy_name(), "eager");

    let seeds = vec![3, 5];
    let runs = engine.collect_runs(&seeds);
    let averaged = montecarlo_pi::aggregate(&runs).expect("aggregate");
    let path = ExportWriter::new(temp.path())
        .expect("writer")
        .write_aggregate(
            ExportMetadata::for_engine(scenario.name.clone(), &engine, seeds),
            &averaged,
            Vec::new(),
        )
        .expect("write aggregate");

    let loaded = load_aggregate(&path).expect("load aggregate");
    assert_eq!(loaded.metadata.strategy, StrategyKind::Eager);
    assert_eq!(loaded.metadata.strategy.to_string(), engine.strategy_name());
    assert_eq!(loaded.metadata.generator, Generator::ChaCha8);
}
