//! Shared infrastructure for `dupforge fetch`.
//!
//! - `FetchClient`: blocking HTTP client with retry / backoff / error
//!   classification, returning the raw response body
//! - `resolve_secret`: flag > env > error

use std::thread;
use std::time::Duration;

use crate::exit_codes;
use crate::CliError;

// ── Constants ───────────────────────────────────────────────────────

pub(super) const MAX_RETRIES: u32 = 3;
pub(super) const USER_AGENT: &str = concat!("dupforge/", env!("CARGO_PKG_VERSION"));

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// Callers own URL and auth. They pass a request-building closure to
/// [`FetchClient::download_with_retry`], which runs the retry loop and maps
/// HTTP status codes to the fetch exit codes.
pub(super) struct FetchClient {
    pub(super) http: reqwest::blocking::Client,
    source_name: String,
    initial_backoff: Duration,
}

impl FetchClient {
    pub(super) fn new(source_name: &str) -> Result<Self, CliError> {
        // Dataset archives can be large; no overall request timeout.
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(None)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                CliError::new(
                    exit_codes::EXIT_FETCH_UPSTREAM,
                    format!("failed to build HTTP client: {e}"),
                )
            })?;

        Ok(Self {
            http,
            source_name: source_name.to_string(),
            initial_backoff: Duration::from_secs(1),
        })
    }

    #[cfg(test)]
    pub(super) fn with_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Send a GET with retry + exponential backoff and return the body bytes.
    ///
    /// `build_request` is called once per attempt. 401/403, 400 and other
    /// 4xx fail immediately; 429, 5xx and network errors are retried.
    pub(super) fn download_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<Vec<u8>, CliError> {
        let mut backoff = self.initial_backoff;

        for attempt in 0..=MAX_RETRIES {
            let result = build_request(&self.http).send();

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    // Auth errors: fail immediately
                    if status == 401 || status == 403 {
                        let msg = error_message(resp);
                        return Err(CliError::new(
                            exit_codes::EXIT_FETCH_AUTH,
                            format!("{} auth failed ({}): {}", self.source_name, status, msg),
                        )
                        .with_hint("check KAGGLE_USERNAME / KAGGLE_KEY or ~/.kaggle/kaggle.json"));
                    }

                    // Bad request: fail immediately
                    if status == 400 {
                        let msg = error_message(resp);
                        return Err(CliError::new(
                            exit_codes::EXIT_FETCH_VALIDATION,
                            format!("{} request rejected ({}): {}", self.source_name, status, msg),
                        ));
                    }

                    // Other 4xx (not 429): fail immediately
                    if (400..500).contains(&status) && status != 429 {
                        let msg = error_message(resp);
                        return Err(CliError::new(
                            exit_codes::EXIT_FETCH_UPSTREAM,
                            format!("{} error ({}): {}", self.source_name, status, msg),
                        ));
                    }

                    // Retryable: 429, 5xx
                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            let code = if status == 429 {
                                exit_codes::EXIT_FETCH_RATE_LIMIT
                            } else {
                                exit_codes::EXIT_FETCH_UPSTREAM
                            };
                            return Err(CliError::new(
                                code,
                                format!(
                                    "{} {} after {} attempts ({})",
                                    self.source_name,
                                    if status == 429 { "rate limited" } else { "upstream error" },
                                    MAX_RETRIES,
                                    status,
                                ),
                            ));
                        }

                        // Respect Retry-After header for 429
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .map(Duration::from_secs)
                                .unwrap_or(backoff)
                        } else {
                            backoff
                        };

                        log::warn!(
                            "retry {}/{} in {:?} (HTTP {})",
                            attempt + 1,
                            MAX_RETRIES,
                            wait,
                            status,
                        );
                        thread::sleep(wait);
                        backoff *= 2;
                        continue;
                    }

                    let bytes = resp.bytes().map_err(|e| {
                        CliError::new(
                            exit_codes::EXIT_FETCH_UPSTREAM,
                            format!("failed to read {} response body: {}", self.source_name, e),
                        )
                    })?;
                    return Ok(bytes.to_vec());
                }
                Err(e) => {
                    // Network/timeout errors: retry
                    if attempt == MAX_RETRIES {
                        return Err(CliError::new(
                            exit_codes::EXIT_FETCH_UPSTREAM,
                            format!(
                                "{} upstream error after {} attempts: {}",
                                self.source_name, MAX_RETRIES, e,
                            ),
                        ));
                    }

                    log::warn!("retry {}/{} in {:?} ({})", attempt + 1, MAX_RETRIES, backoff, e);
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        Err(CliError::new(
            exit_codes::EXIT_FETCH_UPSTREAM,
            format!("{} upstream error: retries exhausted", self.source_name),
        ))
    }
}

/// Pull a human message out of an error response. Kaggle answers with
/// `{"code": 404, "message": "..."}`; anything else is echoed truncated.
fn error_message(resp: reqwest::blocking::Response) -> String {
    let text = resp.text().unwrap_or_default();
    if let Ok(body) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(msg) = body.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "no details".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// Resolve a credential: flag value > environment variable > `None`.
///
/// An explicitly empty flag is an error rather than a silent fallback.
pub(super) fn resolve_secret(
    flag: Option<String>,
    flag_name: &str,
    env_var: &str,
) -> Result<Option<String>, CliError> {
    if let Some(value) = flag {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            return Err(CliError::new(
                exit_codes::EXIT_FETCH_NOT_AUTH,
                format!("{flag_name} is empty"),
            ));
        }
        return Ok(Some(trimmed));
    }

    if let Ok(value) = std::env::var(env_var) {
        let trimmed = value.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed));
        }
    }

    Ok(None)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_resolve_secret_flag_priority() {
        let v = resolve_secret(Some("  token_123  ".into()), "--key", "__DUPFORGE_TEST_A").unwrap();
        assert_eq!(v.as_deref(), Some("token_123"));
    }

    #[test]
    fn test_resolve_secret_empty_flag() {
        let err = resolve_secret(Some("  ".into()), "--key", "__DUPFORGE_TEST_B").unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_NOT_AUTH);
        assert!(err.message.contains("--key"));
    }

    #[test]
    fn test_resolve_secret_missing() {
        std::env::remove_var("__DUPFORGE_TEST_MISSING");
        let v = resolve_secret(None, "--key", "__DUPFORGE_TEST_MISSING").unwrap();
        assert!(v.is_none());
    }

    #[test]
    fn test_download_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/file");
            then.status(200).body("payload");
        });

        let client = FetchClient::new("Test").unwrap();
        let url = server.url("/file");
        let bytes = client.download_with_retry(|http| http.get(&url)).unwrap();
        assert_eq!(bytes, b"payload");
        mock.assert();
    }

    #[test]
    fn test_download_auth_failure_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/file");
            then.status(401).body(r#"{"code":401,"message":"Unauthenticated"}"#);
        });

        let client = FetchClient::new("Test").unwrap();
        let url = server.url("/file");
        let err = client.download_with_retry(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("Unauthenticated"));
        mock.assert_hits(1);
    }

    #[test]
    fn test_download_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/file");
            then.status(404).body("missing");
        });

        let client = FetchClient::new("Test").unwrap();
        let url = server.url("/file");
        let err = client.download_with_retry(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("404"));
    }

    #[test]
    fn test_download_retries_server_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/file");
            then.status(503);
        });

        let client = FetchClient::new("Test")
            .unwrap()
            .with_backoff(Duration::from_millis(1));
        let url = server.url("/file");
        let err = client.download_with_retry(|http| http.get(&url)).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        mock.assert_hits((MAX_RETRIES + 1) as usize);
    }
}
