use anyhow::{Context, Result};

use crate::usecase::ports::codec::SpreadsheetCodec;

/// Plain comma-separated rows; column widths have no meaning here.
pub struct CsvCodec;

impl SpreadsheetCodec for CsvCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Vec<String>>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context("failed to parse csv record")?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn serialize(&self, _sheet_name: &str, rows: &[Vec<String>], _column_widths: &[f64]) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in rows {
            writer
                .write_record(row)
                .context("failed to write csv record")?;
        }
        writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("failed to flush csv: {}", err.error()))
    }
}
