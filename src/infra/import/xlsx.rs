use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::usecase::ports::codec::SpreadsheetCodec;

pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v.to_string(),
        Data::DateTimeIso(v) => v.to_string(),
        Data::DurationIso(v) => v.to_string(),
        Data::Error(v) => format!("{v:?}"),
        Data::Empty => String::new(),
    }
}

fn xlsx_err(err: XlsxError) -> anyhow::Error {
    anyhow!("{err:?}")
}

/// Reads any workbook calamine understands; always writes `.xlsx`.
pub struct XlsxCodec;

impl SpreadsheetCodec for XlsxCodec {
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Vec<String>>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .context("failed to open workbook")?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("workbook has no sheets"))?
            .context("failed to read first sheet")?;
        Ok(range
            .rows()
            .map(|r| r.iter().map(cell_to_string).collect())
            .collect())
    }

    /// Every cell is written as text so prices keep their entered form.
    fn serialize(&self, sheet_name: &str, rows: &[Vec<String>], column_widths: &[f64]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet_name)
            .map_err(xlsx_err)
            .with_context(|| format!("invalid sheet name: {sheet_name}"))?;

        for (col, width) in column_widths.iter().enumerate() {
            worksheet
                .set_column_width(col as u16, *width)
                .map_err(xlsx_err)
                .context("failed to set column width")?;
        }

        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(row_idx as u32, col_idx as u16, value)
                    .map_err(xlsx_err)
                    .context("failed to write cell")?;
            }
        }

        workbook
            .save_to_buffer()
            .map_err(xlsx_err)
            .context("failed to serialize workbook")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_sheet_reads_back_as_text() {
        let rows = vec![
            vec!["Product Name".to_string(), "Old Price (RM)".to_string()],
            vec!["Rose Oil".to_string(), "17.00".to_string()],
            vec!["Clay".to_string(), String::new()],
        ];

        let bytes = XlsxCodec
            .serialize("Prices", &rows, &[35.0, 14.0])
            .expect("serialize should succeed");
        let parsed = XlsxCodec.parse(&bytes).expect("parse should succeed");

        assert_eq!(parsed[1], vec!["Rose Oil", "17.00"]);
        assert_eq!(parsed[2][0], "Clay");
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(XlsxCodec.parse(b"definitely not a workbook").is_err());
    }
}
