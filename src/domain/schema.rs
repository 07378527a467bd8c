//! Fixed table and column names shared by the remote store, the cache and the
//! spreadsheet layout.

pub const PRICE_TABLE: &str = "Price List";
pub const REFERENCE_TABLE: &str = "Full Product List";
pub const STOCK_BALANCE_TABLE: &str = "Stock Balance";
pub const STOCK_LOG_TABLE: &str = "Stock Log";

pub const COL_NAME: &str = "Product Name";
pub const COL_OLD_PRICE: &str = "Old Price (RM)";
pub const COL_CNY_PRICE: &str = "China Price (CNY)";
pub const COL_NEW_CNY: &str = "New Price (CNY)";
pub const COL_NEW_LOCAL: &str = "New Price (RM)";
pub const COL_SAVINGS: &str = "Savings (RM)";
pub const COL_ORDER_QTY: &str = "Order Qty";
pub const COL_TOTAL_VALUE: &str = "Total Value (RM)";
pub const COL_OFFICE_STOCK: &str = "Office Stock";

pub const COL_BALANCE: &str = "Balance";
pub const COL_DATE: &str = "Date";
pub const COL_TYPE: &str = "Type";
pub const COL_QTY: &str = "Qty";
pub const COL_ENDING_BALANCE: &str = "Ending Balance";

/// Export/import column order of the primary list.
pub const PRICE_COLUMNS: [&str; 9] = [
    COL_NAME,
    COL_OLD_PRICE,
    COL_CNY_PRICE,
    COL_NEW_CNY,
    COL_NEW_LOCAL,
    COL_SAVINGS,
    COL_ORDER_QTY,
    COL_TOTAL_VALUE,
    COL_OFFICE_STOCK,
];

/// Older sheets only carried the reference attributes.
pub const LEGACY_PRICE_COLUMNS: [&str; 3] = [COL_NAME, COL_OLD_PRICE, COL_CNY_PRICE];

pub const PRICE_COLUMN_WIDTHS: [f64; 9] = [35.0, 14.0, 16.0, 16.0, 14.0, 13.0, 10.0, 16.0, 12.0];

pub const PRICE_SHEET_NAME: &str = "New Product Prices";
pub const REFERENCE_SHEET_NAME: &str = "Full Product List";

pub const IDX_NAME: usize = 0;
pub const IDX_OLD_PRICE: usize = 1;
pub const IDX_CNY_PRICE: usize = 2;
pub const IDX_NEW_CNY: usize = 3;
pub const IDX_ORDER_QTY: usize = 6;
pub const IDX_OFFICE_STOCK: usize = 8;
