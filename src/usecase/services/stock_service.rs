//! Daily stock consumption: per-product balances and a rolling usage log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::entities::stock::{
    retention_cutoff, StockBalance, StockLogEntry, UsageEntry,
};
use crate::domain::pricing::parse_f64;
use crate::domain::schema::{
    COL_BALANCE, COL_DATE, COL_ENDING_BALANCE, COL_NAME, COL_QTY, COL_TYPE, STOCK_BALANCE_TABLE,
    STOCK_LOG_TABLE,
};
use crate::usecase::ports::store::{value_text, Filter, Row, StoreError, TableStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    pub balances: Vec<StockBalance>,
    pub log: Vec<StockLogEntry>,
}

fn integer(row: &Row, column: &str) -> i64 {
    match row.get(column) {
        Some(Value::Number(number)) => number
            .as_i64()
            .unwrap_or_else(|| number.as_f64().map(|v| v.round() as i64).unwrap_or(0)),
        Some(other) => parse_f64(&value_text(other)).round() as i64,
        None => 0,
    }
}

fn text(row: &Row, column: &str) -> String {
    row.get(column).map(value_text).unwrap_or_default()
}

fn balance_from_row(row: &Row) -> Option<StockBalance> {
    let product_name = text(row, COL_NAME);
    if product_name.trim().is_empty() {
        return None;
    }
    Some(StockBalance {
        product_name,
        balance: integer(row, COL_BALANCE),
    })
}

fn log_from_row(row: &Row) -> Option<StockLogEntry> {
    let date = match text(row, COL_DATE).parse::<NaiveDate>() {
        Ok(date) => date,
        Err(err) => {
            warn!(%err, "skipping stock log row with unreadable date");
            return None;
        }
    };
    Some(StockLogEntry {
        date,
        product_name: text(row, COL_NAME),
        kind: text(row, COL_TYPE),
        qty: integer(row, COL_QTY),
        ending_balance: integer(row, COL_ENDING_BALANCE),
    })
}

fn log_row(date: NaiveDate, entry: &UsageEntry, ending_balance: i64) -> Row {
    let mut row = Row::new();
    row.insert(COL_DATE.into(), Value::from(date.to_string()));
    row.insert(COL_NAME.into(), Value::from(entry.product_name.trim()));
    row.insert(COL_TYPE.into(), Value::from(entry.kind.label()));
    row.insert(COL_QTY.into(), Value::from(entry.qty));
    row.insert(COL_ENDING_BALANCE.into(), Value::from(ending_balance));
    row
}

/// Balances whose product name contains `term`, ignoring case.
pub fn filter_balances<'a>(balances: &'a [StockBalance], term: &str) -> Vec<&'a StockBalance> {
    let needle = term.trim().to_lowercase();
    balances
        .iter()
        .filter(|b| needle.is_empty() || b.product_name.to_lowercase().contains(&needle))
        .collect()
}

pub struct StockService {
    store: Arc<dyn TableStore>,
}

impl StockService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Sorted by product name.
    pub fn balances(&self) -> Result<Vec<StockBalance>, StoreError> {
        let mut balances: Vec<StockBalance> = self
            .store
            .select_all(STOCK_BALANCE_TABLE)?
            .iter()
            .filter_map(balance_from_row)
            .collect();
        balances.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        Ok(balances)
    }

    /// Entries inside the retention window, newest first.
    pub fn recent_log(&self, today: NaiveDate) -> Result<Vec<StockLogEntry>, StoreError> {
        let cutoff = retention_cutoff(today).to_string();
        let mut log: Vec<StockLogEntry> = self
            .store
            .select(STOCK_LOG_TABLE, &[Filter::gte(COL_DATE, cutoff)])?
            .iter()
            .rev()
            .filter_map(log_from_row)
            .collect();
        log.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(log)
    }

    pub fn refresh(&self, today: NaiveDate) -> Result<StockSnapshot, StoreError> {
        Ok(StockSnapshot {
            balances: self.balances()?,
            log: self.recent_log(today)?,
        })
    }

    /// Records a batch of usage lines. Blank or zero lines are skipped; each
    /// accepted line logs its ending balance and moves the product's balance,
    /// so repeated products in one batch draw down cumulatively. Log rows past
    /// the retention window are pruned afterwards.
    #[instrument(skip_all, fields(lines = entries.len(), %today))]
    pub fn submit_usage(
        &self,
        entries: &[UsageEntry],
        today: NaiveDate,
    ) -> Result<StockSnapshot, StoreError> {
        let accepted: Vec<&UsageEntry> = entries.iter().filter(|e| e.is_submittable()).collect();
        if accepted.is_empty() {
            return self.refresh(today);
        }

        let mut running: HashMap<String, i64> = self
            .balances()?
            .into_iter()
            .map(|b| (b.product_name, b.balance))
            .collect();

        for entry in &accepted {
            let name = entry.product_name.trim();
            let current = running.get(name).copied().unwrap_or(0);
            let ending = current - entry.qty;

            self.store
                .insert(STOCK_LOG_TABLE, &log_row(today, entry, ending))?;

            let mut patch = Row::new();
            patch.insert(COL_BALANCE.into(), Value::from(ending));
            let touched = self
                .store
                .update(STOCK_BALANCE_TABLE, &[Filter::eq(COL_NAME, name)], &patch)?;
            if touched == 0 {
                warn!(product = name, "no balance row to update");
            }
            running.insert(name.to_string(), ending);
        }

        let cutoff = retention_cutoff(today).to_string();
        let pruned = self
            .store
            .delete(STOCK_LOG_TABLE, &[Filter::lt(COL_DATE, cutoff)])?;
        info!(submitted = accepted.len(), pruned, "stock usage recorded");

        self.refresh(today)
    }
}
