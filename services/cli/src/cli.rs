use crate::commands::{run_recalculate, run_score, run_validate_config};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use shelter_risk::config::AppConfig;
use shelter_risk::error::AppError;
use shelter_risk::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Shelter Risk",
    about = "Score shelter animals for placement urgency from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one animal from a dataset and print its risk profile
    Score(ScoreArgs),
    /// Recalculate an organization's active population or an explicit list of animals
    Recalculate(RecalculateArgs),
    /// Load and validate a scoring config, then print it
    ValidateConfig(ValidateConfigArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Shelter dataset (JSON) holding animals and their supporting records
    #[arg(long)]
    pub(crate) dataset: PathBuf,
    /// Animal identifier to score
    #[arg(long)]
    pub(crate) animal: String,
    /// Reference date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Scoring config file; overrides RISK_CONFIG_PATH
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Print the full profile with factor breakdown instead of the summary view
    #[arg(long)]
    pub(crate) explain: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RecalculateArgs {
    /// Shelter dataset (JSON) holding animals and their supporting records
    #[arg(long)]
    pub(crate) dataset: PathBuf,
    /// Organization whose active animals are recalculated
    #[arg(long, conflicts_with = "animals", required_unless_present = "animals")]
    pub(crate) organization: Option<String>,
    /// Explicit animal identifiers (comma separated or repeated)
    #[arg(long = "animal", value_delimiter = ',')]
    pub(crate) animals: Vec<String>,
    /// Reference date (YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Scoring config file; overrides RISK_CONFIG_PATH
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Profiles from a previous run, used as the baseline for alerts
    #[arg(long)]
    pub(crate) previous: Option<PathBuf>,
    /// Write the resulting profiles to this file
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Override RISK_BATCH_CONCURRENCY (1 to 64)
    #[arg(long, value_parser = crate::infra::parse_concurrency)]
    pub(crate) concurrency: Option<usize>,
    /// Override RISK_ITEM_TIMEOUT_MS
    #[arg(long, value_parser = crate::infra::parse_timeout_ms)]
    pub(crate) timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct ValidateConfigArgs {
    /// Scoring config file; falls back to RISK_CONFIG_PATH, then the built-in standard
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Score(args) => run_score(&config, args),
        Command::Recalculate(args) => run_recalculate(&config, args).await,
        Command::ValidateConfig(args) => run_validate_config(&config, args),
    }
}
