// dupforge CLI - build labeled invoice-duplicate datasets
//
//   dupforge fetch     download the raw invoice dataset
//   dupforge inject    add labeled synthetic duplicates
//   dupforge validate  check the raw file against the minimal schema

mod config;
mod exit_codes;
mod fetch;
mod inject;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::DupforgeConfig;
use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "dupforge")]
#[command(about = "Build labeled invoice-duplicate datasets for classifier experiments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./dupforge.toml when present)
    #[arg(long, global = true, env = "DUPFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the raw invoice dataset and save it as the raw CSV
    #[command(after_help = "\
Examples:
  dupforge fetch
  dupforge fetch --dataset pradumn203/payment-date-prediction-for-invoices-dataset
  dupforge fetch --from-dir ~/Downloads/invoices
  KAGGLE_USERNAME=me KAGGLE_KEY=... dupforge fetch --out data/raw/invoices_raw.csv")]
    Fetch(fetch::FetchArgs),

    /// Inject labeled duplicate and near-duplicate rows into the raw CSV
    #[command(after_help = "\
Examples:
  dupforge inject
  dupforge inject --rate 0.05 --seed 42
  dupforge inject --input raw.csv --output labeled.csv --json")]
    Inject(inject::InjectArgs),

    /// Load the raw CSV and check the required columns without writing anything
    #[command(after_help = "\
Examples:
  dupforge validate
  dupforge validate --input data/raw/invoices_raw.csv")]
    Validate {
        /// Input CSV (default: paths.raw from config)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // `try_init` also installs the `log` bridge; ignore a second init.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    let result = DupforgeConfig::load(cli.config.as_deref())
        .map_err(CliError::from)
        .and_then(|config| match cli.command {
            Commands::Fetch(args) => fetch::cmd_fetch(args, &config),
            Commands::Inject(args) => inject::cmd_inject(args, &config),
            Commands::Validate { input } => inject::cmd_validate(input, &config),
        });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
