use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, instrument};

use crate::domain::entities::product::{Overrides, Product};
use crate::domain::entities::reference::ReferenceList;
use crate::domain::pricing::{format_money, parse_decimal, parse_quantity};
use crate::domain::schema::{
    IDX_CNY_PRICE, IDX_NAME, IDX_NEW_CNY, IDX_OFFICE_STOCK, IDX_OLD_PRICE, IDX_ORDER_QTY,
    LEGACY_PRICE_COLUMNS, PRICE_COLUMNS, PRICE_COLUMN_WIDTHS, PRICE_SHEET_NAME,
    REFERENCE_SHEET_NAME,
};
use crate::infra::import::codec_for_path;
use crate::usecase::ports::codec::SpreadsheetCodec;
use crate::usecase::services::ledger::{LedgerAction, LedgerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceLayout {
    Full,
    Legacy,
}

/// Primary list read from a sheet, ready to replace the ledger contents.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSheet {
    pub layout: PriceLayout,
    pub products: Vec<Product>,
    pub overrides: Overrides,
}

impl PriceSheet {
    pub fn into_action(self) -> LedgerAction {
        LedgerAction::ReplacePrimary {
            products: self.products,
            overrides: self.overrides,
        }
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|v| v.trim()).unwrap_or("")
}

fn detect_layout(header: &[String]) -> Result<PriceLayout> {
    let mut names: Vec<&str> = header.iter().map(|h| h.trim()).collect();
    while names.last().is_some_and(|h| h.is_empty()) {
        names.pop();
    }
    if names == PRICE_COLUMNS {
        Ok(PriceLayout::Full)
    } else if names == LEGACY_PRICE_COLUMNS {
        Ok(PriceLayout::Legacy)
    } else {
        bail!(
            "unrecognised price sheet header: expected {:?} or {:?}, found {:?}",
            PRICE_COLUMNS,
            LEGACY_PRICE_COLUMNS,
            names
        )
    }
}

/// Maps fixed column positions to product fields. The header row must match
/// one of the known layouts exactly.
pub fn parse_price_sheet(rows: &[Vec<String>]) -> Result<PriceSheet> {
    let Some((header, body)) = rows.split_first() else {
        bail!("price sheet is empty");
    };
    let layout = detect_layout(header)?;

    let mut products = Vec::new();
    let mut overrides = Overrides::default();
    for row in body {
        let name = cell(row, IDX_NAME);
        if name.is_empty() {
            continue;
        }
        if layout == PriceLayout::Full {
            if let Some(cny) = parse_decimal(cell(row, IDX_NEW_CNY)).filter(|v| *v > 0.0) {
                overrides.cny.insert(name.to_string(), format_money(cny));
            }
            overrides.set_quantity(name, parse_quantity(cell(row, IDX_ORDER_QTY)));
        }
        products.push(Product {
            name: name.to_string(),
            old_price: cell(row, IDX_OLD_PRICE).to_string(),
            cny_price: cell(row, IDX_CNY_PRICE).to_string(),
            office_stock: cell(row, IDX_OFFICE_STOCK).to_string(),
            is_new: false,
        });
    }
    Ok(PriceSheet {
        layout,
        products,
        overrides,
    })
}

pub struct ImportService;

impl ImportService {
    pub fn read_prices(codec: &dyn SpreadsheetCodec, bytes: &[u8]) -> Result<PriceSheet> {
        let rows = codec.parse(bytes)?;
        parse_price_sheet(&rows)
    }

    pub fn write_prices(codec: &dyn SpreadsheetCodec, state: &LedgerState) -> Result<Vec<u8>> {
        codec.serialize(PRICE_SHEET_NAME, &state.export_rows(), &PRICE_COLUMN_WIDTHS)
    }

    /// `None` when the sheet has no data rows; the caller leaves the current
    /// reference list alone.
    pub fn read_reference(codec: &dyn SpreadsheetCodec, bytes: &[u8]) -> Result<Option<ReferenceList>> {
        Ok(ReferenceList::from_sheet(codec.parse(bytes)?))
    }

    pub fn write_reference(codec: &dyn SpreadsheetCodec, reference: &ReferenceList) -> Result<Vec<u8>> {
        codec.serialize(REFERENCE_SHEET_NAME, &reference.to_sheet(), &[])
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn import_prices(path: &Path) -> Result<PriceSheet> {
        let codec = codec_for_path(path)?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read spreadsheet: {}", path.display()))?;
        let sheet = Self::read_prices(codec.as_ref(), &bytes)
            .with_context(|| format!("failed to import price list: {}", path.display()))?;
        info!(products = sheet.products.len(), layout = ?sheet.layout, "price list imported");
        Ok(sheet)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn export_prices(path: &Path, state: &LedgerState) -> Result<()> {
        let codec = codec_for_path(path)?;
        let bytes = Self::write_prices(codec.as_ref(), state)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write spreadsheet: {}", path.display()))?;
        info!(products = state.products.len(), "price list exported");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn import_reference(path: &Path) -> Result<Option<ReferenceList>> {
        let codec = codec_for_path(path)?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read spreadsheet: {}", path.display()))?;
        let reference = Self::read_reference(codec.as_ref(), &bytes)?;
        match &reference {
            Some(list) => info!(rows = list.rows.len(), "reference list imported"),
            None => info!("reference sheet has no rows; nothing imported"),
        }
        Ok(reference)
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn export_reference(path: &Path, reference: &ReferenceList) -> Result<()> {
        let codec = codec_for_path(path)?;
        let bytes = Self::write_reference(codec.as_ref(), reference)?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write spreadsheet: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn full_layout_adopts_positive_overrides_only() {
        let mut rows = vec![PRICE_COLUMNS.iter().map(|c| c.to_string()).collect()];
        rows.extend(sheet(&[
            &["Serum", "30.00", "50.00", "40", "20.00", "10.00", "3", "60.00", "5"],
            &["Toner", "12.00", "20.00", "0", "", "", "0", "", ""],
            &["", "1", "1", "1", "", "", "", "", ""],
        ]));

        let parsed = parse_price_sheet(&rows).expect("sheet should parse");

        assert_eq!(parsed.layout, PriceLayout::Full);
        assert_eq!(parsed.products.len(), 2);
        assert_eq!(parsed.products[0].office_stock, "5");
        assert_eq!(parsed.overrides.price("Serum"), Some("40.00"));
        assert_eq!(parsed.overrides.quantity("Serum"), Some(3));
        assert_eq!(parsed.overrides.price("Toner"), None);
        assert!(!parsed.overrides.qty.contains_key("Toner"));
    }

    #[test]
    fn legacy_layout_reads_three_columns() {
        let rows = sheet(&[
            &["Product Name", "Old Price (RM)", "China Price (CNY)", ""],
            &["Clay", "9.90", "15.00"],
        ]);
        let parsed = parse_price_sheet(&rows).expect("legacy sheet should parse");
        assert_eq!(parsed.layout, PriceLayout::Legacy);
        assert_eq!(parsed.products[0].cny_price, "15.00");
        assert!(parsed.overrides.cny.is_empty());
    }

    #[test]
    fn shifted_header_fails_fast() {
        let rows = sheet(&[&["Old Price (RM)", "Product Name", "China Price (CNY)"], &["1", "X", "2"]]);
        let err = parse_price_sheet(&rows).expect_err("shifted columns should be rejected");
        assert!(err.to_string().contains("unrecognised price sheet header"));
        assert!(parse_price_sheet(&[]).is_err());
    }
}
