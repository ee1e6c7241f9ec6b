use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const POSTING_DATE: &str = "posting_date";
pub const DOC_ID: &str = "doc_id";
pub const TOTAL_OPEN_AMOUNT: &str = "total_open_amount";
pub const LABEL: &str = "label";

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// Ground-truth tag carried by every output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Original,
    DuplicateExact,
    DuplicateFuzzyRef,
    DuplicateDiffAmount,
    DuplicateDiffDate,
    RiskDuplicateDifferentId,
}

impl Label {
    pub const ALL: [Label; 6] = [
        Label::Original,
        Label::DuplicateExact,
        Label::DuplicateFuzzyRef,
        Label::DuplicateDiffAmount,
        Label::DuplicateDiffDate,
        Label::RiskDuplicateDifferentId,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::DuplicateExact => "duplicate_exact",
            Self::DuplicateFuzzyRef => "duplicate_fuzzy_ref",
            Self::DuplicateDiffAmount => "duplicate_diff_amount",
            Self::DuplicateDiffDate => "duplicate_diff_date",
            Self::RiskDuplicateDifferentId => "risk_duplicate_different_id",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown label '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Header row plus the positions of the columns the engine reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub headers: Vec<String>,
    pub posting_date_idx: usize,
    pub doc_id_idx: usize,
    pub amount_idx: usize,
    /// Position of a pre-existing `label` column. It is overwritten in place
    /// rather than appended.
    pub label_idx: Option<usize>,
}

impl Schema {
    /// Header row as written: input headers, plus `label` when the input had none.
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        if self.label_idx.is_none() {
            headers.push(LABEL.to_string());
        }
        headers
    }

    /// Positions whose cells are carried through untouched.
    pub fn is_passthrough(&self, idx: usize) -> bool {
        idx != self.posting_date_idx
            && idx != self.doc_id_idx
            && idx != self.amount_idx
            && Some(idx) != self.label_idx
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One invoice row. Typed fields are the source of truth for their columns;
/// `cells` keeps the remaining columns verbatim, indexed like the header.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRecord {
    pub posting_date: NaiveDateTime,
    pub doc_id: String,
    pub total_open_amount: f64,
    pub label: Option<Label>,
    pub cells: Vec<String>,
}

impl InvoiceRecord {
    /// Same record with the label cleared. Used to compare synthetic rows
    /// against their source.
    pub fn unlabeled(&self) -> Self {
        Self {
            label: None,
            ..self.clone()
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }
}

/// An ordered collection of records sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceTable {
    pub schema: Schema,
    pub rows: Vec<InvoiceRecord>,
}

impl InvoiceTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows carrying `label`.
    pub fn count_label(&self, label: Label) -> usize {
        self.rows.iter().filter(|r| r.label == Some(label)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips_through_str() {
        for label in Label::ALL {
            assert_eq!(label.as_str().parse::<Label>().unwrap(), label);
            assert_eq!(label.to_string(), label.as_str());
        }
        assert!("duplicate".parse::<Label>().is_err());
    }

    #[test]
    fn label_serializes_snake_case() {
        let json = serde_json::to_string(&Label::RiskDuplicateDifferentId).unwrap();
        assert_eq!(json, "\"risk_duplicate_different_id\"");
    }

    #[test]
    fn output_headers_append_label_once() {
        let schema = Schema {
            headers: vec!["posting_date".into(), "doc_id".into(), "total_open_amount".into()],
            posting_date_idx: 0,
            doc_id_idx: 1,
            amount_idx: 2,
            label_idx: None,
        };
        assert_eq!(schema.output_headers().last().unwrap(), "label");

        let relabeled = Schema {
            headers: vec![
                "label".into(),
                "posting_date".into(),
                "doc_id".into(),
                "total_open_amount".into(),
            ],
            posting_date_idx: 1,
            doc_id_idx: 2,
            amount_idx: 3,
            label_idx: Some(0),
        };
        assert_eq!(relabeled.output_headers(), relabeled.headers);
        assert!(!relabeled.is_passthrough(0));
    }
}
