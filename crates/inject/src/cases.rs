//! The five duplicate archetypes and their perturbation rules.
//!
//! | Case | Mutates | Rule |
//! |------|---------|------|
//! | `ExactDuplicate` | nothing | verbatim copy |
//! | `FuzzyReference` | `doc_id` | last character replaced by a random digit |
//! | `DifferentAmount` | `total_open_amount` | scaled by a factor in [0.95, 1.05] |
//! | `DifferentDate` | `posting_date` | shifted forward 1..=29 days |
//! | `DifferentIdentifier` | `doc_id` | replaced by a random 7-digit number |

use std::ops::RangeInclusive;

use chrono::Duration;
use rand::Rng;
use serde::Serialize;

use crate::error::InjectError;
use crate::model::{InvoiceRecord, Label};

pub const AMOUNT_FACTOR: RangeInclusive<f64> = 0.95..=1.05;
pub const DATE_SHIFT_DAYS: RangeInclusive<i64> = 1..=29;
pub const RANDOM_ID: RangeInclusive<u32> = 1_000_000..=9_999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCase {
    /// Verbatim resubmission.
    ExactDuplicate,
    /// Clerical typo in the reference.
    FuzzyReference,
    /// Partial or adjusted payment.
    DifferentAmount,
    /// Delayed resubmission.
    DifferentDate,
    /// Same invoice under a fully different reference.
    DifferentIdentifier,
}

impl DuplicateCase {
    /// Injection order. Synthetic blocks are concatenated in this order
    /// before the final shuffle.
    pub const ALL: [DuplicateCase; 5] = [
        DuplicateCase::ExactDuplicate,
        DuplicateCase::FuzzyReference,
        DuplicateCase::DifferentAmount,
        DuplicateCase::DifferentDate,
        DuplicateCase::DifferentIdentifier,
    ];

    pub fn label(&self) -> Label {
        match self {
            Self::ExactDuplicate => Label::DuplicateExact,
            Self::FuzzyReference => Label::DuplicateFuzzyRef,
            Self::DifferentAmount => Label::DuplicateDiffAmount,
            Self::DifferentDate => Label::DuplicateDiffDate,
            Self::DifferentIdentifier => Label::RiskDuplicateDifferentId,
        }
    }

    /// Mutate `record` in place according to this case. Only the fields in
    /// the case's scope are touched; the label is left to the caller.
    ///
    /// Fails only for `DifferentDate` when the shifted date is out of range;
    /// the record is left untouched in that case.
    pub fn perturb<R: Rng + ?Sized>(
        &self,
        record: &mut InvoiceRecord,
        rng: &mut R,
    ) -> Result<(), InjectError> {
        match self {
            Self::ExactDuplicate => {}
            Self::FuzzyReference => {
                // The new digit may equal the old one.
                let digit: u8 = rng.gen_range(0..=9);
                record.doc_id.pop();
                record.doc_id.push(char::from(b'0' + digit));
            }
            Self::DifferentAmount => {
                let factor = rng.gen_range(AMOUNT_FACTOR);
                record.total_open_amount *= factor;
            }
            Self::DifferentDate => {
                let days = rng.gen_range(DATE_SHIFT_DAYS);
                record.posting_date = record
                    .posting_date
                    .checked_add_signed(Duration::days(days))
                    .ok_or_else(|| InjectError::DateOverflow {
                        doc_id: record.doc_id.clone(),
                        days,
                    })?;
            }
            Self::DifferentIdentifier => {
                // No collision check against existing ids.
                record.doc_id = rng.gen_range(RANDOM_ID).to_string();
            }
        }
        Ok(())
    }

    /// Clone `source`, perturb the copy, and label it.
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        source: &InvoiceRecord,
        rng: &mut R,
    ) -> Result<InvoiceRecord, InjectError> {
        let mut copy = source.clone();
        self.perturb(&mut copy, rng)?;
        Ok(copy.with_label(self.label()))
    }
}

impl std::fmt::Display for DuplicateCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactDuplicate => write!(f, "exact_duplicate"),
            Self::FuzzyReference => write!(f, "fuzzy_reference"),
            Self::DifferentAmount => write!(f, "different_amount"),
            Self::DifferentDate => write!(f, "different_date"),
            Self::DifferentIdentifier => write!(f, "different_identifier"),
        }
    }
}
