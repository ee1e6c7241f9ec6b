use rand::seq::index;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cases::DuplicateCase;
use crate::error::InjectError;
use crate::model::{InvoiceRecord, InvoiceTable, Label};

/// Fraction of the input sampled per case when nothing else is configured.
pub const DEFAULT_RATE: f64 = 0.01;

/// Rows sampled per case: `floor(rate × rows)`, never less than one.
pub fn sample_size(rows: usize, rate: f64) -> usize {
    let n = (rows as f64 * rate).floor() as usize;
    n.max(1)
}

pub fn validate_rate(rate: f64) -> Result<(), InjectError> {
    if rate.is_finite() && rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(InjectError::InvalidRate(rate))
    }
}

/// Inject the five duplicate archetypes into `table`.
///
/// Every input row is labeled `original`. For each case, `n` distinct rows
/// are sampled from the full input (samples of different cases may overlap),
/// copied, perturbed and labeled. Originals and synthetic rows are then
/// shuffled together. The result has `len + 5n` rows.
///
/// Fails without output when a sampled date cannot be shifted, rather than
/// emitting a `duplicate_diff_date` row that breaks its own rule.
pub fn inject_anomalies<R: Rng + ?Sized>(
    table: InvoiceTable,
    rate: f64,
    rng: &mut R,
) -> Result<InvoiceTable, InjectError> {
    validate_rate(rate)?;
    if table.is_empty() {
        return Err(InjectError::EmptyInput);
    }

    let InvoiceTable { schema, rows } = table;
    let n = sample_size(rows.len(), rate);
    log::debug!("sampling {n} rows per case from {} input rows", rows.len());

    // All samples are drawn up front from the untouched input.
    let samples: Vec<(DuplicateCase, Vec<usize>)> = DuplicateCase::ALL
        .iter()
        .map(|&case| (case, index::sample(rng, rows.len(), n).into_vec()))
        .collect();

    let mut anomalies: Vec<InvoiceRecord> = Vec::with_capacity(n * samples.len());
    for (case, picks) in &samples {
        for &i in picks {
            anomalies.push(case.synthesize(&rows[i], rng)?);
        }
        log::debug!("case {case}: {} rows labeled {}", picks.len(), case.label());
    }

    let mut combined: Vec<InvoiceRecord> = rows
        .into_iter()
        .map(|r| r.with_label(Label::Original))
        .collect();
    combined.extend(anomalies);
    combined.shuffle(rng);

    Ok(InvoiceTable {
        schema,
        rows: combined,
    })
}
