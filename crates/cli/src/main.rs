//! Traffic Condition Prediction Command Line
//!
//! Each `predict` invocation is one interaction: collect the form fields,
//! bind them to the loaded artifact's schema, predict, render. `session`
//! runs many interactions over stdin against the same cached artifact.

mod render;

use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use traffic_core::config::LoggingConfig;
use traffic_core::encoding::EncodingTable;
use traffic_core::inputs::{NumericRange, ROAD_OCCUPANCY_RANGE, SPEED_RANGE};
use traffic_core::schema::columns;
use traffic_core::{AppConfig, Artifact, ArtifactCache, Invoker, Outcome, TrafficInputs, FAILURE_MESSAGE};

#[derive(Parser)]
#[command(name = "traffic-predict")]
#[command(about = "Smart traffic condition prediction", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config/traffic.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model artifact path, overriding the configuration
    #[arg(long, global = true, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the traffic condition for one set of inputs
    Predict(PredictCommand),
    /// Read one JSON object of inputs per stdin line and print one outcome per line
    Session,
    /// Show the loaded artifact's schema and capabilities
    Inspect,
}

#[derive(Args, Debug)]
struct PredictCommand {
    /// Traffic light state
    #[arg(long, default_value = "Red", value_parser = category_parser(columns::TRAFFIC_LIGHT_STATE))]
    traffic_light: String,
    /// Weather condition
    #[arg(long, default_value = "Clear", value_parser = category_parser(columns::WEATHER_CONDITION))]
    weather: String,
    /// Accident report
    #[arg(long, default_value = "No", value_parser = category_parser(columns::ACCIDENT_REPORT))]
    accident: String,
    /// Time of day (hour)
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(i64).range(0..=23))]
    hour: i64,
    /// Vehicle count
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(i64).range(0..=1000))]
    vehicle_count: i64,
    /// Traffic speed (km/h)
    #[arg(long, default_value_t = 40.0, value_parser = parse_speed)]
    speed: f64,
    /// Road occupancy (%)
    #[arg(long, default_value_t = 50.0, value_parser = parse_road_occupancy)]
    road_occupancy: f64,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

impl PredictCommand {
    fn inputs(&self) -> TrafficInputs {
        TrafficInputs {
            traffic_light: self.traffic_light.clone(),
            weather: self.weather.clone(),
            accident: self.accident.clone(),
            hour: self.hour,
            vehicle_count: self.vehicle_count,
            speed: self.speed,
            road_occupancy: self.road_occupancy,
        }
    }
}

fn category_parser(column: &str) -> PossibleValuesParser {
    let values = EncodingTable::standard()
        .column(column)
        .map(|c| c.accepted_values())
        .unwrap_or_default();
    PossibleValuesParser::new(values)
}

fn parse_bounded(raw: &str, range: NumericRange) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{raw:?} is not a number: {e}"))?;
    if !range.contains(value) {
        return Err(format!("must be between {} and {}", range.min, range.max));
    }
    Ok(value)
}

fn parse_speed(raw: &str) -> Result<f64, String> {
    parse_bounded(raw, SPEED_RANGE)
}

fn parse_road_occupancy(raw: &str) -> Result<f64, String> {
    parse_bounded(raw, ROAD_OCCUPANCY_RANGE)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(model) = &cli.model {
        config.model.path = model.clone();
    }

    init_logging(&config.logging, cli.verbose)?;
    info!("Traffic prediction v{}", traffic_core::VERSION);

    let artifact = ArtifactCache::global()
        .get_or_load(&config.model.path, &config.model.loader())
        .with_context(|| format!("Cannot start without a model ({})", config.model.path.display()))?;

    match cli.command {
        Commands::Predict(cmd) => handle_predict(cmd, artifact, &config),
        Commands::Session => handle_session(artifact, &config),
        Commands::Inspect => handle_inspect(&artifact),
    }
}

fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    match config.format.as_str() {
        "json" => registry.with(layer.json()).try_init(),
        "pretty" => registry.with(layer.pretty()).try_init(),
        _ => registry.with(layer.compact()).try_init(),
    }
    .context("Failed to set tracing subscriber")
}

fn handle_predict(cmd: PredictCommand, artifact: Arc<Artifact>, config: &AppConfig) -> Result<ExitCode> {
    let invoker = Invoker::new(artifact, config.defaults.clone());
    let outcome = invoker.run(&cmd.inputs());

    let mut stdout = io::stdout().lock();
    if cmd.json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(&outcome)?)?;
    } else {
        write!(stdout, "{}", render::outcome_text(&outcome))?;
    }

    Ok(match outcome {
        Outcome::Predicted(_) => ExitCode::SUCCESS,
        Outcome::Failed { .. } => ExitCode::FAILURE,
    })
}

fn handle_session(artifact: Arc<Artifact>, config: &AppConfig) -> Result<ExitCode> {
    let invoker = Invoker::new(artifact, config.defaults.clone());
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut interactions = 0u64;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        interactions += 1;

        let outcome = match serde_json::from_str::<TrafficInputs>(&line) {
            Ok(inputs) => invoker.run(&inputs),
            Err(err) => Outcome::Failed {
                message: FAILURE_MESSAGE.to_string(),
                diagnostic: format!("invalid input line: {err}"),
            },
        };
        writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?;
        stdout.flush()?;
    }

    debug!(interactions, "session finished");
    Ok(ExitCode::SUCCESS)
}

fn handle_inspect(artifact: &Artifact) -> Result<ExitCode> {
    print!("{}", render::artifact_summary(artifact));
    Ok(ExitCode::SUCCESS)
}
