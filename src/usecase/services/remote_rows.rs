//! Mapping between ledger values and rows of the remote price and
//! reference tables.

use std::collections::HashMap;

use serde_json::{Number, Value};
use tracing::debug;

use crate::domain::entities::product::{Overrides, Product};
use crate::domain::entities::reference::ReferenceList;
use crate::domain::pricing::{format_money, parse_decimal};
use crate::domain::schema::{
    COL_CNY_PRICE, COL_NAME, COL_NEW_CNY, COL_NEW_LOCAL, COL_OFFICE_STOCK, COL_OLD_PRICE,
    COL_ORDER_QTY, COL_SAVINGS, COL_TOTAL_VALUE,
};
use crate::usecase::ports::store::{value_text, Row};
use crate::usecase::services::ledger::PendingUpdate;

/// Two-decimal JSON number, or null when the value is not finite.
pub fn money_value(value: f64) -> Value {
    parse_decimal(&format_money(value))
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Stored decimal strings go out as numbers; blanks as null; anything else verbatim.
pub fn decimal_value(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    parse_decimal(trimmed)
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(trimmed.to_string()))
}

fn optional<T>(value: Option<T>, into: impl Fn(T) -> Value) -> Value {
    value.map(into).unwrap_or(Value::Null)
}

fn write_pending(row: &mut Row, pending: &PendingUpdate) {
    row.insert(COL_NEW_CNY.into(), money_value(pending.new_cny));
    row.insert(COL_NEW_LOCAL.into(), money_value(pending.new_local));
    row.insert(COL_SAVINGS.into(), optional(pending.savings, money_value));
    row.insert(COL_ORDER_QTY.into(), optional(pending.quantity, Value::from));
    row.insert(COL_TOTAL_VALUE.into(), optional(pending.total_value, money_value));
}

pub fn pending_row(name: &str, pending: &PendingUpdate) -> Row {
    let mut row = Row::new();
    row.insert(COL_NAME.into(), Value::from(name));
    write_pending(&mut row, pending);
    row
}

/// Patch that nulls every pending-update column.
pub fn cleared_pending_patch() -> Row {
    [COL_NEW_CNY, COL_NEW_LOCAL, COL_SAVINGS, COL_ORDER_QTY, COL_TOTAL_VALUE]
        .into_iter()
        .map(|column| (column.to_string(), Value::Null))
        .collect()
}

pub fn product_row(product: &Product, pending: Option<&PendingUpdate>) -> Row {
    let mut row = Row::new();
    row.insert(COL_NAME.into(), Value::from(product.name.as_str()));
    row.insert(COL_OLD_PRICE.into(), decimal_value(&product.old_price));
    row.insert(COL_CNY_PRICE.into(), decimal_value(&product.cny_price));
    match pending {
        Some(pending) => write_pending(&mut row, pending),
        None => row.extend(cleared_pending_patch()),
    }
    row.insert(COL_OFFICE_STOCK.into(), decimal_value(&product.office_stock));
    row
}

/// Full row for a product as currently held, pending columns included.
pub fn snapshot_row(product: &Product, overrides: &Overrides, rate: f64) -> Row {
    let pending = overrides
        .price(&product.name)
        .and_then(parse_decimal)
        .map(|cny| {
            PendingUpdate::compute(
                Some(&product.old_price),
                cny,
                overrides.quantity(&product.name),
                rate,
            )
        });
    product_row(product, pending.as_ref())
}

/// Prices come back as numbers; keep them as two-decimal strings locally.
fn cell_text(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(Value::Number(number)) => number.as_f64().map(format_money).unwrap_or_default(),
        Some(value) => value_text(value).trim().to_string(),
        None => String::new(),
    }
}

fn positive_number(row: &Row, column: &str) -> Option<f64> {
    let value = row.get(column)?;
    let number = match value {
        Value::Number(number) => number.as_f64(),
        other => parse_decimal(&value_text(other)),
    }?;
    (number > 0.0).then_some(number)
}

/// Rebuilds products and overrides from remote rows. Rows without a name
/// are skipped; only positive pending values become overrides. A name that
/// appears on several rows keeps the last one, overrides included.
pub fn ledger_from_rows(rows: &[Row]) -> (Vec<Product>, Overrides) {
    let mut products: Vec<Product> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut overrides = Overrides::default();
    for row in rows {
        let name = cell_text(row, COL_NAME);
        if name.is_empty() {
            continue;
        }
        overrides.remove(&name);
        if let Some(cny) = positive_number(row, COL_NEW_CNY) {
            overrides.cny.insert(name.clone(), format_money(cny));
        }
        let quantity = positive_number(row, COL_ORDER_QTY).map(|qty| qty.round() as u32);
        overrides.set_quantity(&name, quantity);

        let product = Product {
            old_price: cell_text(row, COL_OLD_PRICE),
            cny_price: cell_text(row, COL_CNY_PRICE),
            office_stock: match row.get(COL_OFFICE_STOCK) {
                Some(Value::Number(number)) => number.to_string(),
                Some(value) => value_text(value),
                None => String::new(),
            },
            is_new: false,
            name,
        };
        match positions.get(&product.name) {
            Some(&idx) => {
                debug!(name = %product.name, "duplicate remote row; keeping the later one");
                products[idx] = product;
            }
            None => {
                positions.insert(product.name.clone(), products.len());
                products.push(product);
            }
        }
    }
    (products, overrides)
}

pub fn reference_rows(reference: &ReferenceList) -> Vec<Row> {
    reference
        .rows
        .iter()
        .map(|cells| {
            reference
                .headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let cell = cells.get(idx).cloned().unwrap_or_default();
                    (header.clone(), Value::String(cell))
                })
                .collect()
        })
        .collect()
}

/// Headers follow the column order of the first row.
pub fn reference_from_rows(rows: &[Row]) -> ReferenceList {
    let Some(first) = rows.first() else {
        return ReferenceList::default();
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let rows = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|header| row.get(header).map(value_text).unwrap_or_default())
                .collect()
        })
        .collect();
    ReferenceList { headers, rows }
}
