use anyhow::Result;

/// Opaque spreadsheet boundary: ordered rows of ordered string cells.
pub trait SpreadsheetCodec: Send + Sync {
    /// Rows of the first sheet, header row first.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<Vec<String>>>;

    fn serialize(&self, sheet_name: &str, rows: &[Vec<String>], column_widths: &[f64])
        -> Result<Vec<u8>>;
}
