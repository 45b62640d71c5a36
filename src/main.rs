use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};

use montecarlo_pi::{
    aggregate::{aggregate, labelled_series},
    engine::{Engine, EngineBuilder},
    export::{ExportMetadata, ExportWriter},
    geometry::Region,
    logging,
    plot::{EstimateFigure, PointsFigure},
    rng::Generator,
    scenario::{Scenario, ScenarioLoader},
    strategies::StrategyKind,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Monte Carlo estimation of pi")]
struct Cli {
    /// Path to a scenario YAML file (built-in defaults when omitted)
    #[arg(long, global = true)]
    scenario: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (overrides the scenario level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the square area, circle area and their ratio
    Areas,
    /// Run a single simulation
    Estimate(EstimateArgs),
    /// Run several seeded simulations and average them
    Multi(MultiArgs),
    /// Print a two-level seed hierarchy
    Seeds(SeedsArgs),
    /// Run simulations in the background and serve a live view
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Directory for figures and exports
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Skip the estimate figure
    #[arg(long)]
    no_plot: bool,

    /// Skip the JSON export
    #[arg(long)]
    no_export: bool,
}

#[derive(Debug, Args)]
struct EstimateArgs {
    /// Override sample count
    #[arg(long)]
    samples: Option<u64>,

    /// Override the scenario seed
    #[arg(long, conflicts_with = "unseeded")]
    seed: Option<u64>,

    /// Seed the generator from OS entropy
    #[arg(long)]
    unseeded: bool,

    #[arg(long)]
    strategy: Option<StrategyKind>,

    #[arg(long)]
    generator: Option<Generator>,

    /// Report the summary after this many observations
    #[arg(long)]
    window: Option<usize>,

    /// Also draw the first N sampled points
    #[arg(long)]
    points: Option<usize>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct MultiArgs {
    #[arg(long)]
    samples: Option<u64>,

    #[arg(long)]
    simulations: Option<u64>,

    /// Main seed the per-run seeds are drawn from
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    strategy: Option<StrategyKind>,

    #[arg(long)]
    generator: Option<Generator>,

    /// Plot every run under its own label instead of the average
    #[arg(long)]
    unaggregated: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Args)]
struct SeedsArgs {
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 20)]
    simulations: usize,

    #[arg(long, default_value_t = 5)]
    years: usize,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long)]
    samples: Option<u64>,

    #[arg(long)]
    simulations: Option<u64>,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenario = match &cli.scenario {
        Some(path) => ScenarioLoader::new(".").load(path)?,
        None => Scenario::default(),
    };
    logging::init(cli.log_level.as_deref().unwrap_or(&scenario.logging.level));

    match cli.command {
        Command::Areas => areas(&scenario),
        Command::Estimate(args) => estimate(&scenario, args),
        Command::Multi(args) => multi(&scenario, args),
        Command::Seeds(args) => seeds(&scenario, args),
        Command::Serve(args) => serve(scenario, args),
    }
}

fn areas(scenario: &Scenario) -> Result<()> {
    let regions = scenario.build_regions()?;
    println!("Square Area: {}", regions.sampling.area());
    println!("Inscribed Circle Area: {}", regions.target.area());
    println!(
        "Area Ratio (Circle Area/Square Area): {}",
        regions.area_ratio()
    );
    Ok(())
}

fn build_engine(
    scenario: &Scenario,
    samples: Option<u64>,
    strategy: Option<StrategyKind>,
    generator: Option<Generator>,
) -> Result<Engine> {
    let mut settings = scenario.engine_settings(samples)?;
    settings.strategy = strategy.unwrap_or(settings.strategy);
    settings.generator = generator.unwrap_or(settings.generator);
    let engine = EngineBuilder::new(settings)
        .with_regions(scenario.build_regions()?)
        .build()?;
    Ok(engine)
}

fn estimate(scenario: &Scenario, args: EstimateArgs) -> Result<()> {
    let engine = build_engine(scenario, args.samples, args.strategy, args.generator)?;
    let seed = if args.unseeded {
        None
    } else {
        Some(args.seed.unwrap_or(scenario.seed))
    };
    let run = engine.run(seed);

    let window = args.window.unwrap_or(run.len());
    match run.summary(window) {
        Some(summary) => {
            println!("Points Inside Circle: {}", summary.points_inside);
            println!("Total Points: {}", summary.total_points);
            println!("Pi Estimate: {}", summary.estimate);
        }
        None => println!("No observations"),
    }

    let dir = args
        .output
        .output_dir
        .unwrap_or_else(|| scenario.output.dir.clone());
    if scenario.output.plot && !args.output.no_plot {
        let path = dir.join(format!("{}_estimate.html", scenario.name));
        EstimateFigure::new()
            .add_series(None, run.series())
            .write_html(&path)?;
        println!("Estimate figure written to {}", path.display());
    }
    if let Some(observations) = args.points {
        let path = dir.join(format!("{}_points.svg", scenario.name));
        PointsFigure::new(engine.regions(), &run, observations).write_svg(&path)?;
        println!("Points figure written to {}", path.display());
    }
    if scenario.output.export && !args.output.no_export {
        let seeds = seed.into_iter().collect();
        let metadata = ExportMetadata::for_engine(scenario.name.clone(), &engine, seeds);
        let path = ExportWriter::new(&dir)?.write_run(metadata, &run)?;
        println!("Records exported to {}", path.display());
    }
    Ok(())
}

fn multi(scenario: &Scenario, args: MultiArgs) -> Result<()> {
    let simulations = scenario.simulations(args.simulations);
    if simulations == 0 {
        bail!("at least one simulation is required");
    }
    let engine = build_engine(scenario, args.samples, args.strategy, args.generator)?;
    let seed = args.seed.unwrap_or(scenario.seed);
    let seeds = scenario
        .seed_tree()?
        .children(seed, usize::try_from(simulations)?);

    for (idx, s) in seeds.iter().enumerate() {
        println!("Simulation #{} (seed={s})", idx + 1);
    }
    let runs = engine.collect_runs(&seeds);
    let averaged = aggregate(&runs)?;
    if let Some(estimate) = averaged.final_estimate() {
        println!("Averaged Pi Estimate ({} runs): {estimate}", averaged.runs);
    }

    let dir = args
        .output
        .output_dir
        .unwrap_or_else(|| scenario.output.dir.clone());
    let labelled = if args.unaggregated {
        labelled_series(&runs)
    } else {
        Vec::new()
    };
    if scenario.output.plot && !args.output.no_plot {
        let path = dir.join(format!("{}_multi_{}.html", scenario.name, runs.len()));
        let figure = if args.unaggregated {
            labelled.iter().fold(EstimateFigure::new(), |figure, series| {
                figure.add_series(Some(series.label.clone()), series.points.clone())
            })
        } else {
            EstimateFigure::new().add_series(None, averaged.series())
        };
        figure.write_html(&path)?;
        println!("Estimate figure written to {}", path.display());
    }
    if scenario.output.export && !args.output.no_export {
        let path = ExportWriter::new(&dir)?.write_aggregate(
            ExportMetadata::for_engine(scenario.name.clone(), &engine, seeds),
            &averaged,
            labelled,
        )?;
        println!("Aggregate exported to {}", path.display());
    }
    Ok(())
}

fn seeds(scenario: &Scenario, args: SeedsArgs) -> Result<()> {
    let seed = args.seed.unwrap_or(scenario.seed);
    let tree = scenario
        .seed_tree()?
        .grow(seed, &[args.simulations, args.years]);

    println!("Main Seed: {seed}");
    println!("Number of Simulations: {}", args.simulations);
    println!("Years to Simulate: {}", args.years);
    println!("{}", "-".repeat(50));
    println!("Principle Seeds (seed={seed}): {:?}", tree.child_seeds());
    println!("{}", "-".repeat(50));
    for (idx, child) in tree.children.iter().enumerate() {
        println!(
            "Simulation #{} (seed={}): {:?}",
            idx + 1,
            child.seed,
            child.child_seeds()
        );
    }
    Ok(())
}

fn serve(scenario: Scenario, args: ServeArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(web::run(WebServerConfig {
        scenario,
        samples: args.samples,
        simulations: args.simulations,
        host: args.host,
        port: args.port,
    }))
}
