//! flowprep entrypoint: `prepare` runs the preparation pipeline; `score` and
//! `health` exercise the scoring boundary against a written bundle.

use clap::{Args, Parser, Subcommand};
use flowprep::{
    config::PipelineConfig,
    logging::StructuredLogger,
    pipeline::Pipeline,
    scoring::{FlowRecord, Scorer},
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "flowprep", version, about = "UNSW-NB15 flow preparation and scoring artifacts")]
struct Cli {
    /// JSON configuration file (missing file means defaults)
    #[arg(long, global = true, env = "FLOWPREP_CONFIG", default_value = "flowprep.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every stage and write the cleaned table, bundle and report
    Prepare(PrepareArgs),
    /// Score one JSON flow record against a bundle
    Score(ScoreArgs),
    /// Print the scorer health report for a bundle
    Health(BundleArgs),
}

#[derive(Args, Debug)]
struct PrepareArgs {
    /// Directory scanned for raw capture files (overrides config)
    #[arg(long)]
    raw_dir: Option<PathBuf>,

    /// Feature-definition file (overrides config)
    #[arg(long)]
    features: Option<PathBuf>,

    /// Cleaned table destination (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BundleArgs {
    /// Artifact bundle (defaults to the configured bundle path)
    #[arg(short, long)]
    bundle: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    #[command(flatten)]
    bundle: BundleArgs,

    /// Flow record as a JSON object; `-` reads stdin
    #[arg(short, long, default_value = "-")]
    record: PathBuf,
}

#[derive(Serialize)]
struct ErrorLine {
    error: String,
}

type MainResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn print_json(value: &impl Serialize) -> MainResult {
    StructuredLogger::emit_json(value, &mut std::io::stdout().lock())?;
    Ok(())
}

fn run_prepare(mut config: PipelineConfig, args: PrepareArgs) -> MainResult {
    if let Some(dir) = args.raw_dir {
        config.inputs.raw_dir = Some(dir);
    }
    if let Some(features) = args.features {
        config.inputs.feature_definitions = features;
    }
    if let Some(output) = args.output {
        config.output.table_path = output;
    }
    let output = Pipeline::new(config).run()?;
    info!(
        rows = output.report.rows_written,
        features = output.bundle.feature_order.len(),
        "preparation finished"
    );
    print_json(&output.report)
}

fn read_record(path: &Path) -> Result<FlowRecord, Box<dyn std::error::Error + Send + Sync>> {
    let mut text = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_string(&mut text)?;
    } else {
        text = std::fs::read_to_string(path)?;
    }
    Ok(serde_json::from_str(&text)?)
}

fn run_score(config: &PipelineConfig, args: ScoreArgs) -> MainResult {
    let bundle = args.bundle.bundle.unwrap_or_else(|| config.output.bundle_path.clone());
    let scorer = Scorer::load(&bundle);
    let record = read_record(&args.record)?;
    match scorer.score(&record) {
        Ok(prediction) => print_json(&prediction),
        Err(e) => {
            print_json(&ErrorLine { error: e.to_string() })?;
            Err(e.into())
        }
    }
}

fn run_health(config: &PipelineConfig, args: BundleArgs) -> MainResult {
    let bundle = args.bundle.unwrap_or_else(|| config.output.bundle_path.clone());
    print_json(&Scorer::load(&bundle).health())
}

fn main() -> MainResult {
    let cli = Cli::parse();
    let config = PipelineConfig::load(&cli.config)?;
    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %cli.config.display(), "flowprep starting");

    let result = match cli.command {
        Command::Prepare(args) => run_prepare(config, args),
        Command::Score(args) => run_score(&config, args),
        Command::Health(args) => run_health(&config, args),
    };
    if let Err(e) = &result {
        error!(error = %e, "command failed");
    }
    result
}
