//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3-9     | inject           | Pipeline driver / config codes           |
//! | 50-59   | fetch            | Dataset acquisition codes                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use dupforge_inject::InjectError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, out-of-range values.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Inject (3-9)
// =============================================================================

/// Raw input file does not exist. Nothing was written.
pub const EXIT_INJECT_MISSING_INPUT: u8 = 3;

/// Raw input has a header but no rows.
pub const EXIT_INJECT_EMPTY_INPUT: u8 = 4;

/// Required column missing, a date/amount cell failed to parse, or a
/// sampled date cannot be shifted.
pub const EXIT_INJECT_SCHEMA: u8 = 5;

/// Output directory or file could not be written.
pub const EXIT_INJECT_WRITE: u8 = 6;

/// Config file unreadable, malformed, or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 7;

// =============================================================================
// Fetch (50-59)
// =============================================================================

/// No credentials provided (flag, env and kaggle.json all empty).
pub const EXIT_FETCH_NOT_AUTH: u8 = 50;

/// Auth rejected by upstream (401/403).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Request rejected by upstream (400).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Rate limited after retries (429).
pub const EXIT_FETCH_RATE_LIMIT: u8 = 53;

/// Upstream error (other 4xx, 5xx) or network failure after retries.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

/// No CSV file found in the downloaded dataset. Raw file left untouched.
pub const EXIT_FETCH_EMPTY_SOURCE: u8 = 55;

/// Downloaded archive could not be opened or extracted.
pub const EXIT_FETCH_ARCHIVE: u8 = 56;

// =============================================================================
// Engine error mapping
// =============================================================================

/// Map an engine error raised while loading or injecting to its exit code.
pub fn inject_exit_code(err: &InjectError) -> u8 {
    match err {
        InjectError::EmptyInput => EXIT_INJECT_EMPTY_INPUT,
        InjectError::InvalidRate(_) => EXIT_USAGE,
        InjectError::Csv(_) => EXIT_INJECT_SCHEMA,
        InjectError::Io(_) => EXIT_ERROR,
        e if e.is_schema() => EXIT_INJECT_SCHEMA,
        _ => EXIT_ERROR,
    }
}
