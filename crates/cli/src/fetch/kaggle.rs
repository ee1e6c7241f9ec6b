//! Kaggle dataset download.
//!
//! API: `GET {api_base}/datasets/download/{owner}/{slug}` with HTTP Basic
//! auth, answering with a zip archive of the dataset files.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::common::{resolve_secret, FetchClient};
use crate::exit_codes;
use crate::CliError;

/// Kaggle API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(super) struct Credentials {
    pub username: String,
    pub key: String,
}

/// Resolve credentials: flags > `KAGGLE_USERNAME`/`KAGGLE_KEY` >
/// `kaggle.json` (in `$KAGGLE_CONFIG_DIR` or `~/.kaggle`).
pub(super) fn resolve_credentials(
    username: Option<String>,
    key: Option<String>,
) -> Result<Credentials, CliError> {
    let username = resolve_secret(username, "--username", "KAGGLE_USERNAME")?;
    let key = resolve_secret(key, "--key", "KAGGLE_KEY")?;

    if let (Some(username), Some(key)) = (username.clone(), key.clone()) {
        return Ok(Credentials { username, key });
    }

    if let Some(path) = credentials_file() {
        if path.exists() {
            let from_file = read_credentials_file(&path)?;
            log::debug!("using Kaggle credentials from {}", path.display());
            return Ok(Credentials {
                username: username.unwrap_or(from_file.username),
                key: key.unwrap_or(from_file.key),
            });
        }
    }

    Err(CliError::new(
        exit_codes::EXIT_FETCH_NOT_AUTH,
        "missing Kaggle credentials",
    )
    .with_hint("use --username/--key, set KAGGLE_USERNAME and KAGGLE_KEY, or create ~/.kaggle/kaggle.json"))
}

fn credentials_file() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("KAGGLE_CONFIG_DIR") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir).join("kaggle.json"));
        }
    }
    dirs::home_dir().map(|home| home.join(".kaggle").join("kaggle.json"))
}

pub(super) fn read_credentials_file(path: &Path) -> Result<Credentials, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(
            exit_codes::EXIT_FETCH_NOT_AUTH,
            format!("cannot read {}: {e}", path.display()),
        )
    })?;
    serde_json::from_str(&text).map_err(|e| {
        CliError::new(
            exit_codes::EXIT_FETCH_NOT_AUTH,
            format!("invalid credentials file {}: {e}", path.display()),
        )
    })
}

pub(super) fn download_url(api_base: &str, owner: &str, slug: &str) -> String {
    format!(
        "{}/datasets/download/{}/{}",
        api_base.trim_end_matches('/'),
        owner,
        slug
    )
}

/// Default extraction directory: `<cache_dir>/dupforge/datasets/<owner>/<slug>`.
pub(super) fn default_cache_dir(owner: &str, slug: &str) -> Result<PathBuf, CliError> {
    let base = dirs::cache_dir()
        .ok_or_else(|| CliError::general("cannot determine cache directory; use --cache-dir"))?;
    Ok(base.join("dupforge").join("datasets").join(owner).join(slug))
}

/// Download the dataset archive and return its bytes.
pub(super) fn download_archive(
    api_base: &str,
    owner: &str,
    slug: &str,
    credentials: &Credentials,
) -> Result<Vec<u8>, CliError> {
    let client = FetchClient::new("Kaggle")?;
    let url = download_url(api_base, owner, slug);
    log::info!("downloading {owner}/{slug}");
    log::debug!("GET {url}");

    let bytes = client.download_with_retry(|http| {
        http.get(&url)
            .basic_auth(&credentials.username, Some(&credentials.key))
    })?;
    log::info!("downloaded {} bytes", bytes.len());
    Ok(bytes)
}

/// Extract a zip archive into `dest`, overwriting existing files. Entries
/// whose paths would escape `dest` are skipped. Returns the number of files
/// written.
pub(super) fn extract_archive(bytes: &[u8], dest: &Path) -> Result<usize, CliError> {
    let archive_err = |msg: String| CliError::new(exit_codes::EXIT_FETCH_ARCHIVE, msg);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| archive_err(format!("downloaded file is not a zip archive: {e}")))?;

    std::fs::create_dir_all(dest)
        .map_err(|e| archive_err(format!("cannot create {}: {e}", dest.display())))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_err(format!("corrupt archive entry {i}: {e}")))?;

        let Some(rel) = entry.enclosed_name() else {
            log::warn!("skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let target = dest.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&target)
                .map_err(|e| archive_err(format!("cannot create {}: {e}", target.display())))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| archive_err(format!("cannot create {}: {e}", parent.display())))?;
        }
        let mut out = std::fs::File::create(&target)
            .map_err(|e| archive_err(format!("cannot create {}: {e}", target.display())))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| archive_err(format!("cannot extract {}: {e}", target.display())))?;
        written += 1;
    }

    log::debug!("extracted {written} files into {}", dest.display());
    Ok(written)
}
