use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{InvoiceTable, Label};

/// Row counts per label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub total: usize,
    /// Every label, including those with zero rows.
    pub counts: BTreeMap<Label, usize>,
    #[serde(skip_serializing_if = "is_zero")]
    pub unlabeled: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl LabelSummary {
    pub fn from_table(table: &InvoiceTable) -> Self {
        let mut counts: BTreeMap<Label, usize> = Label::ALL.iter().map(|&l| (l, 0)).collect();
        let mut unlabeled = 0;
        for row in &table.rows {
            match row.label {
                Some(label) => *counts.entry(label).or_default() += 1,
                None => unlabeled += 1,
            }
        }
        Self {
            total: table.len(),
            counts,
            unlabeled,
        }
    }

    pub fn get(&self, label: Label) -> usize {
        self.counts.get(&label).copied().unwrap_or(0)
    }

    /// Labels present in the table, most frequent first. Ties keep label
    /// declaration order.
    pub fn by_count(&self) -> Vec<(Label, usize)> {
        let mut entries: Vec<(Label, usize)> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(&l, &n)| (l, n))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}
