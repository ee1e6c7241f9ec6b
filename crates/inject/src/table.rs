//! CSV load/write for invoice tables.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::date::{coerce_date, render_date, DateStyle};
use crate::error::InjectError;
use crate::model::{
    InvoiceRecord, InvoiceTable, Schema, DOC_ID, LABEL, POSTING_DATE, TOTAL_OPEN_AMOUNT,
};

impl Schema {
    /// Resolve the typed columns from a header row.
    pub fn from_headers(headers: Vec<String>) -> Result<Self, InjectError> {
        let idx = |name: &str| -> Result<usize, InjectError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| InjectError::MissingColumn { column: name.into() })
        };

        let posting_date_idx = idx(POSTING_DATE)?;
        let doc_id_idx = idx(DOC_ID)?;
        let amount_idx = idx(TOTAL_OPEN_AMOUNT)?;
        let label_idx = headers.iter().position(|h| h.trim() == LABEL);

        Ok(Self {
            headers,
            posting_date_idx,
            doc_id_idx,
            amount_idx,
            label_idx,
        })
    }
}

impl InvoiceTable {
    /// Load a comma-separated table with a header row.
    ///
    /// `posting_date` is coerced to a date and `total_open_amount` to `f64`;
    /// `doc_id` and every other column are kept as text. A pre-existing
    /// `label` column is ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, InjectError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let schema = Schema::from_headers(headers)?;
        let width = schema.headers.len();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 1;

            if record.len() != width {
                return Err(InjectError::RowWidth {
                    row,
                    expected: width,
                    found: record.len(),
                });
            }

            let date_str = record.get(schema.posting_date_idx).unwrap_or("");
            let posting_date = coerce_date(date_str).ok_or_else(|| InjectError::DateParse {
                row,
                value: date_str.into(),
            })?;

            let amount_str = record.get(schema.amount_idx).unwrap_or("");
            let total_open_amount: f64 =
                amount_str.trim().parse().map_err(|_| InjectError::AmountParse {
                    row,
                    value: amount_str.into(),
                })?;

            let doc_id = record.get(schema.doc_id_idx).unwrap_or("").to_string();

            // Typed and label positions are rendered from the record on write.
            let cells = record
                .iter()
                .enumerate()
                .map(|(idx, v)| {
                    if schema.is_passthrough(idx) {
                        v.to_string()
                    } else {
                        String::new()
                    }
                })
                .collect();

            rows.push(InvoiceRecord {
                posting_date,
                doc_id,
                total_open_amount,
                label: None,
                cells,
            });
        }

        log::debug!("loaded {} rows, {} columns", rows.len(), width);
        Ok(Self { schema, rows })
    }

    pub fn from_csv_str(data: &str) -> Result<Self, InjectError> {
        Self::from_reader(data.as_bytes())
    }

    pub fn from_path(path: &Path) -> Result<Self, InjectError> {
        let file = std::fs::File::open(path)
            .map_err(|e| InjectError::Io(format!("cannot read {}: {e}", path.display())))?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Write the table as CSV: input columns in order, typed columns rendered
    /// from the record, `label` last unless the input already had one.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), InjectError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        csv_writer.write_record(self.schema.output_headers())?;

        let date_style = DateStyle::for_column(self.rows.iter().map(|r| &r.posting_date));
        let width = self.schema.headers.len();
        let mut out: Vec<String> = Vec::with_capacity(width + 1);

        for row in &self.rows {
            out.clear();
            let label = row.label.map(|l| l.as_str()).unwrap_or("");
            for idx in 0..width {
                let cell = if idx == self.schema.posting_date_idx {
                    render_date(&row.posting_date, date_style)
                } else if idx == self.schema.doc_id_idx {
                    row.doc_id.clone()
                } else if idx == self.schema.amount_idx {
                    row.total_open_amount.to_string()
                } else if Some(idx) == self.schema.label_idx {
                    label.to_string()
                } else {
                    row.cells.get(idx).cloned().unwrap_or_default()
                };
                out.push(cell);
            }
            if self.schema.label_idx.is_none() {
                out.push(label.to_string());
            }
            csv_writer.write_record(&out)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, InjectError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| InjectError::Csv(e.to_string()))
    }

    /// Write to `path` through a sibling temp file and rename, so the target
    /// is either the previous file or the complete new one.
    pub fn write_path(&self, path: &Path) -> Result<(), InjectError> {
        let tmp = temp_sibling(path);
        let result = (|| -> Result<(), InjectError> {
            let file = std::fs::File::create(&tmp)
                .map_err(|e| InjectError::Io(format!("cannot create {}: {e}", tmp.display())))?;
            let mut buf = std::io::BufWriter::new(file);
            self.write_csv(&mut buf)?;
            buf.flush()?;
            drop(buf);
            std::fs::rename(&tmp, path).map_err(|e| {
                InjectError::Io(format!("cannot move output into {}: {e}", path.display()))
            })
        })();

        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Label;

    const SAMPLE: &str = "\
business_code,cust_number,name_customer,posting_date,doc_id,total_open_amount,invoice_currency
U001,0200769623,WAL-MAR corp,2020-01-26,1930438491,54273.28,USD
U001,0200980828,BEN E,2019-08-08,1929646410,79656.6,USD
CA02,0140105686,SYSC llc,2019-12-30,2960623488,2253.86,CAD
";

    #[test]
    fn load_basic() {
        let table = InvoiceTable::from_csv_str(SAMPLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.schema.posting_date_idx, 3);
        assert_eq!(table.schema.doc_id_idx, 4);
        assert_eq!(table.schema.amount_idx, 5);
        assert_eq!(table.schema.label_idx, None);

        let first = &table.rows[0];
        assert_eq!(first.doc_id, "1930438491");
        assert_eq!(first.total_open_amount, 54273.28);
        assert_eq!(first.posting_date.date().to_string(), "2020-01-26");
        assert_eq!(first.cells[1], "0200769623");
        assert_eq!(first.label, None);
    }

    #[test]
    fn load_missing_column() {
        let csv = "posting_date,doc_id\n2020-01-01,123\n";
        let err = InvoiceTable::from_csv_str(csv).unwrap_err();
        assert!(matches!(err, InjectError::MissingColumn { ref column } if column == "total_open_amount"));
        assert!(err.is_schema());
    }

    #[test]
    fn load_bad_amount_reports_row() {
        let csv = "posting_date,doc_id,total_open_amount\n2020-01-01,1,10\n2020-01-02,2,ten\n";
        let err = InvoiceTable::from_csv_str(csv).unwrap_err();
        assert_eq!(err.to_string(), "row 2: cannot parse total_open_amount 'ten'");
    }

    #[test]
    fn load_bad_date_reports_row() {
        let csv = "posting_date,doc_id,total_open_amount\nyesterday,1,10\n";
        let err = InvoiceTable::from_csv_str(csv).unwrap_err();
        assert!(matches!(err, InjectError::DateParse { row: 1, .. }));
    }

    #[test]
    fn load_ragged_row() {
        let csv = "posting_date,doc_id,total_open_amount\n2020-01-01,1\n";
        let err = InvoiceTable::from_csv_str(csv).unwrap_err();
        assert!(matches!(err, InjectError::RowWidth { row: 1, expected: 3, found: 2 }));
    }

    #[test]
    fn doc_id_keeps_leading_zeros() {
        let csv = "posting_date,doc_id,total_open_amount\n2020-01-01,0012,10\n";
        let table = InvoiceTable::from_csv_str(csv).unwrap();
        assert_eq!(table.rows[0].doc_id, "0012");
    }

    #[test]
    fn write_appends_label_column() {
        let mut table = InvoiceTable::from_csv_str(SAMPLE).unwrap();
        for row in &mut table.rows {
            row.label = Some(Label::Original);
        }
        let out = table.to_csv_string().unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "business_code,cust_number,name_customer,posting_date,doc_id,total_open_amount,invoice_currency,label"
        );
        assert_eq!(
            lines.next().unwrap(),
            "U001,0200769623,WAL-MAR corp,2020-01-26,1930438491,54273.28,USD,original"
        );
    }

    #[test]
    fn write_overwrites_existing_label_in_place() {
        let csv = "label,posting_date,doc_id,total_open_amount\nstale,2020-01-01,7,1.5\n";
        let mut table = InvoiceTable::from_csv_str(csv).unwrap();
        assert_eq!(table.schema.label_idx, Some(0));
        table.rows[0].label = Some(Label::DuplicateExact);
        let out = table.to_csv_string().unwrap();
        assert_eq!(out, "label,posting_date,doc_id,total_open_amount\nduplicate_exact,2020-01-01,7,1.5\n");
    }

    #[test]
    fn write_renders_canonical_dates() {
        let csv = "posting_date,doc_id,total_open_amount\n20200126,1,10\n2020/02/01,2,20\n";
        let table = InvoiceTable::from_csv_str(csv).unwrap();
        let out = table.to_csv_string().unwrap();
        assert!(out.contains("2020-01-26,1,10,"));
        assert!(out.contains("2020-02-01,2,20,"));

        // Canonical output loads back to the same values
        let reloaded = InvoiceTable::from_csv_str(&out).unwrap();
        assert_eq!(reloaded.rows[0].posting_date, table.rows[0].posting_date);
        assert_eq!(reloaded.rows[1].posting_date, table.rows[1].posting_date);
    }

    #[test]
    fn sub_second_dates_survive_a_round_trip() {
        let csv = "posting_date,doc_id,total_open_amount\n2020-01-26 10:00:00.250,1,10\n2020-01-27,2,20\n";
        let table = InvoiceTable::from_csv_str(csv).unwrap();
        let out = table.to_csv_string().unwrap();
        assert!(out.contains("2020-01-26 10:00:00.250,1,10,"), "{out}");
        assert!(out.contains("2020-01-27 00:00:00,2,20,"), "{out}");

        let reloaded = InvoiceTable::from_csv_str(&out).unwrap();
        assert_eq!(reloaded.rows[0].posting_date, table.rows[0].posting_date);
        assert_eq!(reloaded.rows[1].posting_date, table.rows[1].posting_date);
    }

    #[test]
    fn write_path_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old").unwrap();

        let table = InvoiceTable::from_csv_str(SAMPLE).unwrap();
        table.write_path(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("business_code,"));
        assert!(!dir.path().join("out.csv.tmp").exists());
    }
}
