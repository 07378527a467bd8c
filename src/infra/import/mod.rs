use std::path::Path;

use anyhow::{bail, Result};

use crate::usecase::ports::codec::SpreadsheetCodec;

pub mod csv;
pub mod xlsx;

/// Picks the codec from the file extension.
pub fn codec_for_path(path: &Path) -> Result<Box<dyn SpreadsheetCodec>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(Box::new(xlsx::XlsxCodec)),
        Some("csv") => Ok(Box::new(csv::CsvCodec)),
        _ => bail!("unsupported spreadsheet file: {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_codec() {
        assert!(codec_for_path(Path::new("prices.XLSX")).is_ok());
        assert!(codec_for_path(Path::new("prices.csv")).is_ok());
        assert!(codec_for_path(Path::new("prices.txt")).is_err());
        assert!(codec_for_path(Path::new("prices")).is_err());
    }
}
