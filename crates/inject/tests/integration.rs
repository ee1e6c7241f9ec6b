use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;

use dupforge_inject::model::{InvoiceRecord, InvoiceTable, Label};
use dupforge_inject::{inject_anomalies, sample_size, DuplicateCase, LabelSummary, DEFAULT_RATE};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture() -> InvoiceTable {
    InvoiceTable::from_path(&fixtures_dir().join("invoices_sample.csv")).unwrap()
}

/// The original row a synthetic row was derived from. Passthrough cells are
/// never perturbed and `cust_number` is unique in the fixture.
fn source_of<'a>(originals: &'a [InvoiceRecord], row: &InvoiceRecord) -> &'a InvoiceRecord {
    let matches: Vec<_> = originals.iter().filter(|o| o.cells == row.cells).collect();
    assert_eq!(matches.len(), 1, "expected exactly one source for {:?}", row.doc_id);
    matches[0]
}

#[test]
fn fixture_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("invoices_with_anomalies.csv");

    let input = load_fixture();
    assert_eq!(input.len(), 24);
    let input_headers = input.schema.headers.clone();

    let mut rng = StdRng::seed_from_u64(2024);
    let output = inject_anomalies(input, 0.1, &mut rng).unwrap();
    output.write_path(&out_path).unwrap();

    let reloaded = InvoiceTable::from_path(&out_path).unwrap();
    let n = sample_size(24, 0.1);
    assert_eq!(n, 2);
    assert_eq!(reloaded.len(), 24 + 5 * n);

    // Input columns in order, label appended
    let mut expected_headers = input_headers;
    expected_headers.push("label".into());
    assert_eq!(reloaded.schema.headers, expected_headers);
    assert_eq!(reloaded.schema.label_idx, Some(expected_headers.len() - 1));

    // Labels are read back from the label column
    let text = std::fs::read_to_string(&out_path).unwrap();
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let label_col = reader.headers().unwrap().len() - 1;
    let mut counts = std::collections::HashMap::new();
    for rec in reader.records() {
        let rec = rec.unwrap();
        let label: Label = rec.get(label_col).unwrap().parse().unwrap();
        *counts.entry(label).or_insert(0usize) += 1;
    }
    assert_eq!(counts[&Label::Original], 24);
    for case in DuplicateCase::ALL {
        assert_eq!(counts[&case.label()], n);
    }
}

#[test]
fn synthetic_rows_follow_their_case_rules() {
    let input = load_fixture();
    let originals = input.rows.clone();

    let mut rng = StdRng::seed_from_u64(17);
    let output = inject_anomalies(input, 0.25, &mut rng).unwrap();
    let summary = LabelSummary::from_table(&output);
    assert_eq!(summary.total, 24 + 5 * 6);

    for row in output.rows.iter().filter(|r| r.label != Some(Label::Original)) {
        let src = source_of(&originals, row);
        match row.label.unwrap() {
            Label::DuplicateExact => {
                assert_eq!(row.unlabeled(), src.unlabeled());
            }
            Label::DuplicateFuzzyRef => {
                let keep = src.doc_id.len() - 1;
                assert_eq!(row.doc_id.len(), src.doc_id.len());
                assert_eq!(row.doc_id[..keep], src.doc_id[..keep]);
                assert_eq!(row.total_open_amount, src.total_open_amount);
                assert_eq!(row.posting_date, src.posting_date);
            }
            Label::DuplicateDiffAmount => {
                let ratio = row.total_open_amount / src.total_open_amount;
                assert!(ratio >= 0.95 - 1e-12 && ratio <= 1.05 + 1e-12, "ratio {ratio}");
                assert_eq!(row.doc_id, src.doc_id);
                assert_eq!(row.posting_date, src.posting_date);
            }
            Label::DuplicateDiffDate => {
                let days = (row.posting_date - src.posting_date).num_days();
                assert!((1..=29).contains(&days));
                assert_eq!(row.doc_id, src.doc_id);
                assert_eq!(row.total_open_amount, src.total_open_amount);
            }
            Label::RiskDuplicateDifferentId => {
                let id: u32 = row.doc_id.parse().unwrap();
                assert!((1_000_000..=9_999_999).contains(&id));
                assert_eq!(row.total_open_amount, src.total_open_amount);
                assert_eq!(row.posting_date, src.posting_date);
            }
            Label::Original => unreachable!(),
        }
    }
}

#[test]
fn passthrough_text_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("out.csv");

    let output = inject_anomalies(load_fixture(), DEFAULT_RATE, &mut StdRng::seed_from_u64(1)).unwrap();
    output.write_path(&out_path).unwrap();

    // Float-looking and empty passthrough cells are written back verbatim.
    let text = std::fs::read_to_string(&out_path).unwrap();
    assert!(text.contains(",RV,1.0,,"));
    assert!(text.contains("NAA8"));
    assert!(text.contains(" 00:00:00,"));
}

#[test]
fn missing_input_file_is_io_error() {
    let err = InvoiceTable::from_path(&fixtures_dir().join("nope.csv")).unwrap_err();
    assert!(err.to_string().contains("cannot read"));
    assert!(!err.is_schema());
}
