//! `posting_date` coercion.
//!
//! Dates are held as `NaiveDateTime`. A column whose times are all midnight
//! renders as `YYYY-MM-DD`; otherwise every cell renders with seconds, plus
//! fractional seconds when any cell of the column carries them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATETIME_FRACTION_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const DATETIME_INPUTS: &[&str] = &[
    DATETIME_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    DATETIME_FRACTION_FORMAT,
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_INPUTS: &[&str] = &[DATE_FORMAT, "%Y/%m/%d", "%Y%m%d", "%m/%d/%Y"];

/// Parse a date-like cell. Returns `None` when no known form matches.
///
/// Idempotent: `coerce_date(&render_date(d, style))` is `Some(d)` for the
/// style chosen by [`DateStyle::for_column`].
pub fn coerce_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // Float-typed integer dates from spreadsheet exports, e.g. "20200126.0"
    let value = value.strip_suffix(".0").unwrap_or(value);

    for fmt in DATETIME_INPUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_INPUTS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Text form of a whole `posting_date` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// `YYYY-MM-DD HH:MM:SS.fff`, digits as needed (3, 6 or 9)
    DateTimeFraction,
}

impl DateStyle {
    /// Narrowest style that loses nothing for any of `dates`.
    pub fn for_column<'a>(dates: impl IntoIterator<Item = &'a NaiveDateTime>) -> Self {
        let mut style = Self::Date;
        for d in dates {
            if d.nanosecond() != 0 {
                return Self::DateTimeFraction;
            }
            if d.time() != NaiveTime::MIN {
                style = Self::DateTime;
            }
        }
        style
    }

    fn format(self) -> &'static str {
        match self {
            Self::Date => DATE_FORMAT,
            Self::DateTime => DATETIME_FORMAT,
            Self::DateTimeFraction => DATETIME_FRACTION_FORMAT,
        }
    }
}

pub fn render_date(date: &NaiveDateTime, style: DateStyle) -> String {
    date.format(style.format()).to_string()
}
