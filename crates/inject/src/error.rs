use std::fmt;

#[derive(Debug)]
pub enum InjectError {
    /// A required column is absent from the header row.
    MissingColumn { column: String },
    /// `posting_date` cell could not be coerced to a date.
    DateParse { row: usize, value: String },
    /// `total_open_amount` cell is not numeric.
    AmountParse { row: usize, value: String },
    /// A data row has a different number of fields than the header.
    RowWidth { row: usize, expected: usize, found: usize },
    /// Input table has no rows.
    EmptyInput,
    /// A sampled `posting_date` cannot be shifted without leaving the
    /// representable date range.
    DateOverflow { doc_id: String, days: i64 },
    /// Injection rate outside (0, 1].
    InvalidRate(f64),
    /// CSV read/write error.
    Csv(String),
    /// IO error (file read/write, etc.).
    Io(String),
}

impl InjectError {
    /// True for errors caused by the input not honouring the minimal schema.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. }
                | Self::DateParse { .. }
                | Self::AmountParse { .. }
                | Self::RowWidth { .. }
                | Self::DateOverflow { .. }
        )
    }
}

impl fmt::Display for InjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { column } => write!(f, "missing required column '{column}'"),
            Self::DateParse { row, value } => {
                write!(f, "row {row}: cannot parse posting_date '{value}'")
            }
            Self::AmountParse { row, value } => {
                write!(f, "row {row}: cannot parse total_open_amount '{value}'")
            }
            Self::RowWidth { row, expected, found } => {
                write!(f, "row {row}: expected {expected} fields, found {found}")
            }
            Self::EmptyInput => write!(f, "input table has no rows; nothing to sample"),
            Self::DateOverflow { doc_id, days } => write!(
                f,
                "doc_id '{doc_id}': posting_date cannot be shifted by {days} days"
            ),
            Self::InvalidRate(rate) => {
                write!(f, "injection rate must be in (0, 1], got {rate}")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for InjectError {}

impl From<csv::Error> for InjectError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<std::io::Error> for InjectError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
