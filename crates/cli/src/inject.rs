//! `dupforge inject` and `dupforge validate`, the pipeline driver.

use std::path::{Path, PathBuf};

use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use dupforge_inject::inject::validate_rate;
use dupforge_inject::{inject_anomalies, sample_size, InvoiceTable, LabelSummary};

use crate::config::DupforgeConfig;
use crate::exit_codes::{inject_exit_code, EXIT_INJECT_MISSING_INPUT, EXIT_INJECT_WRITE};
use crate::CliError;

const RULE: &str = "------------------------------";

#[derive(Args, Debug)]
pub struct InjectArgs {
    /// Raw input CSV (default: paths.raw from config)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Labeled output CSV (default: paths.processed from config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Fraction of the input sampled per case, in (0, 1] (default: 0.01)
    #[arg(long)]
    pub rate: Option<f64>,

    /// Seed for reproducible sampling and perturbation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the label summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct InjectReport<'a> {
    input: String,
    output: String,
    rate: f64,
    per_case: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    summary: &'a LabelSummary,
}

pub fn cmd_inject(args: InjectArgs, config: &DupforgeConfig) -> Result<(), CliError> {
    let input = args.input.unwrap_or_else(|| config.paths.raw.clone());
    let output = args.output.unwrap_or_else(|| config.paths.processed.clone());
    let rate = args.rate.unwrap_or(config.inject.rate);
    let seed = args.seed.or(config.inject.seed);

    validate_rate(rate).map_err(|e| CliError::args(e.to_string()))?;

    let table = load_input(&input)?;
    let input_rows = table.len();

    if !args.json {
        println!("Injecting anomalies ({}% per case)...", format_pct(rate));
    }
    log::info!(
        "loaded {} rows from {}; {} synthetic rows per case",
        input_rows,
        input.display(),
        sample_size(input_rows, rate)
    );

    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let processed = inject_anomalies(table, rate, &mut rng)
        .map_err(|e| CliError::new(inject_exit_code(&e), e.to_string()))?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| {
                CliError::new(
                    EXIT_INJECT_WRITE,
                    format!("cannot create {}: {e}", dir.display()),
                )
            })?;
            log::info!("created directory {}", dir.display());
        }
    }

    processed
        .write_path(&output)
        .map_err(|e| CliError::new(EXIT_INJECT_WRITE, e.to_string()))?;
    log::info!("wrote {} rows to {}", processed.len(), output.display());

    let summary = LabelSummary::from_table(&processed);

    if args.json {
        let report = InjectReport {
            input: input.display().to_string(),
            output: output.display().to_string(),
            rate,
            per_case: sample_size(input_rows, rate),
            seed,
            summary: &summary,
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        println!("{RULE}");
        println!("Success! Processed file saved at: {}", output.display());
        println!();
        println!("Summary of records created:");
        print!("{}", render_summary(&summary));
        println!("{RULE}");
    }

    Ok(())
}

pub fn cmd_validate(input: Option<PathBuf>, config: &DupforgeConfig) -> Result<(), CliError> {
    let input = input.unwrap_or_else(|| config.paths.raw.clone());
    let table = load_input(&input)?;
    let schema = &table.schema;

    println!("{}: {} rows, {} columns", input.display(), table.len(), schema.headers.len());
    println!("  posting_date       column {}", schema.posting_date_idx + 1);
    println!("  doc_id             column {}", schema.doc_id_idx + 1);
    println!("  total_open_amount  column {}", schema.amount_idx + 1);
    if let Some(idx) = schema.label_idx {
        println!("  label              column {} (will be overwritten)", idx + 1);
    }
    if table.is_empty() {
        log::warn!("{} has no rows; inject will refuse it", input.display());
    }
    Ok(())
}

fn load_input(path: &Path) -> Result<InvoiceTable, CliError> {
    if !path.exists() {
        return Err(CliError::new(
            EXIT_INJECT_MISSING_INPUT,
            format!("{} not found.", path.display()),
        )
        .with_hint("run `dupforge fetch` first"));
    }
    InvoiceTable::from_path(path).map_err(|e| {
        CliError::new(inject_exit_code(&e), format!("{}: {e}", path.display()))
    })
}

/// `0.01` → `1`, `0.025` → `2.5`. Rounded to hide float noise.
fn format_pct(rate: f64) -> String {
    let pct = (rate * 100.0 * 1e6).round() / 1e6;
    format!("{pct}")
}

/// One line per label present, most frequent first.
fn render_summary(summary: &LabelSummary) -> String {
    let entries = summary.by_count();
    let width = entries
        .iter()
        .map(|(l, _)| l.as_str().len())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for (label, count) in entries {
        out.push_str(&format!("{:<width$}  {:>8}\n", label.as_str(), count, width = width));
    }
    out
}
