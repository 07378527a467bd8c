//! Retail price ledger: products with an old local price and a supplier
//! price, pending price updates converted at a user-set exchange rate,
//! spreadsheet import/export, and a daily stock-consumption log.

pub mod config;
pub mod domain;
pub mod infra;
pub mod usecase;

#[cfg(feature = "desktop")]
pub mod platform;
#[cfg(feature = "desktop")]
pub mod ui;

#[cfg(test)]
mod tests;
