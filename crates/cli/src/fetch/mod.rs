//! `dupforge fetch`: acquire the raw invoice dataset.
//!
//! Downloads a Kaggle dataset (or reads a local directory), picks the first
//! `.csv` in directory-listing order, and rewrites it to the raw-data path.

mod common;
mod kaggle;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use crate::config::{split_dataset, DupforgeConfig};
use crate::exit_codes;
use crate::CliError;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Kaggle dataset `owner/slug` (default: source.dataset from config)
    #[arg(long)]
    pub dataset: Option<String>,

    /// Read CSVs from a local directory instead of downloading
    #[arg(long, value_name = "DIR")]
    pub from_dir: Option<PathBuf>,

    /// Output CSV path (default: paths.raw from config)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Where the downloaded archive is extracted (default: user cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Kaggle username (default: KAGGLE_USERNAME env, then kaggle.json)
    #[arg(long)]
    pub username: Option<String>,

    /// Kaggle API key (default: KAGGLE_KEY env, then kaggle.json)
    #[arg(long)]
    pub key: Option<String>,

    /// Kaggle API base URL (default: source.api_base from config)
    #[arg(long)]
    pub api_base: Option<String>,
}

pub fn cmd_fetch(args: FetchArgs, config: &DupforgeConfig) -> Result<(), CliError> {
    let out = args.out.unwrap_or_else(|| config.paths.raw.clone());

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .map_err(|e| CliError::general(format!("cannot create {}: {e}", dir.display())))?;
            println!("Folder created: {}", dir.display());
        }
    }

    let source_dir = match args.from_dir {
        Some(dir) => dir,
        None => {
            let dataset = args.dataset.unwrap_or_else(|| config.source.dataset.clone());
            let (owner, slug) = split_dataset(&dataset).map_err(CliError::args)?;
            let api_base = args.api_base.unwrap_or_else(|| config.source.api_base.clone());
            let cache_dir = match args.cache_dir {
                Some(dir) => dir,
                None => kaggle::default_cache_dir(owner, slug)?,
            };

            let credentials = kaggle::resolve_credentials(args.username, args.key)?;
            let bytes = kaggle::download_archive(&api_base, owner, slug, &credentials)?;
            kaggle::extract_archive(&bytes, &cache_dir)?;
            cache_dir
        }
    };

    let source = first_csv(&source_dir)?.ok_or_else(|| {
        CliError::new(
            exit_codes::EXIT_FETCH_EMPTY_SOURCE,
            format!("no CSV files found in {}", source_dir.display()),
        )
    })?;
    log::info!("using {}", source.display());

    let rows = normalize_csv(&source, &out)?;

    println!("Dataset saved on: {}", out.display());
    println!("Total rows saved: {rows}");
    Ok(())
}

/// First regular file ending in `.csv`, in directory-listing order.
/// No sorting and no content checks.
fn first_csv(dir: &Path) -> Result<Option<PathBuf>, CliError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CliError::general(format!("cannot list {}: {e}", dir.display())))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| CliError::general(format!("cannot list {}: {e}", dir.display())))?;
        let path = entry.path();
        let is_csv = entry
            .file_name()
            .to_str()
            .map(|name| name.ends_with(".csv"))
            .unwrap_or(false);
        if is_csv && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Re-serialize `source` through the CSV reader/writer into `dest`, going
/// through a temp file so a failed read leaves `dest` untouched. Returns the
/// number of data rows (header excluded).
fn normalize_csv(source: &Path, dest: &Path) -> Result<usize, CliError> {
    let read_err =
        |e: csv::Error| CliError::general(format!("cannot read {}: {e}", source.display()));
    let write_err = |msg: String| CliError::general(format!("cannot write {}: {msg}", dest.display()));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(source)
        .map_err(read_err)?;

    let mut tmp_name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".part");
    let tmp = dest.with_file_name(tmp_name);

    let result = (|| -> Result<usize, CliError> {
        let file = std::fs::File::create(&tmp).map_err(|e| write_err(e.to_string()))?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(std::io::BufWriter::new(file));

        let mut records = 0usize;
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            writer.write_record(&record).map_err(|e| write_err(e.to_string()))?;
            records += 1;
        }
        let mut inner = writer.into_inner().map_err(|e| write_err(e.to_string()))?;
        inner.flush().map_err(|e| write_err(e.to_string()))?;
        drop(inner);

        std::fs::rename(&tmp, dest).map_err(|e| write_err(e.to_string()))?;
        Ok(records.saturating_sub(1))
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_csv_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "x").unwrap();
        std::fs::write(dir.path().join("data.CSV.bak"), "x").unwrap();
        assert!(first_csv(dir.path()).unwrap().is_none());

        std::fs::write(dir.path().join("invoices.csv"), "a\n1\n").unwrap();
        let found = first_csv(dir.path()).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "invoices.csv");
    }

    #[test]
    fn first_csv_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();
        assert!(first_csv(dir.path()).unwrap().is_none());
    }

    #[test]
    fn normalize_counts_rows_and_rewrites_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.csv");
        let dest = dir.path().join("raw.csv");
        std::fs::write(&src, "\"doc_id\",\"name\"\r\n\"1\",\"ACME, inc\"\r\n\"2\",\"plain\"\r\n").unwrap();

        let rows = normalize_csv(&src, &dest).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "doc_id,name\n1,\"ACME, inc\"\n2,plain\n"
        );
        assert!(!dir.path().join("raw.csv.part").exists());
    }

    #[test]
    fn normalize_header_only_is_zero_rows() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.csv");
        let dest = dir.path().join("raw.csv");
        std::fs::write(&src, "posting_date,doc_id,total_open_amount\n").unwrap();
        assert_eq!(normalize_csv(&src, &dest).unwrap(), 0);
    }
}
