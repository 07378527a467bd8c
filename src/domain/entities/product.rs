use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::pricing::{format_money, parse_decimal, savings, to_local, total_value};

/// One row of the primary price list. Prices are kept as entered (decimal
/// strings); nothing derived is stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(rename = "oldPrice", default)]
    pub old_price: String,
    #[serde(rename = "cnyPrice", default)]
    pub cny_price: String,
    #[serde(rename = "officeStock", default)]
    pub office_stock: String,
    #[serde(rename = "_isNew", default, skip_serializing_if = "is_false")]
    pub is_new: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Product {
    pub fn new(name: impl Into<String>, old_price: impl Into<String>, cny_price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_price: old_price.into(),
            cny_price: cny_price.into(),
            office_stock: String::new(),
            is_new: false,
        }
    }

    pub fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceMode {
    #[default]
    Unit,
    Bundle,
}

/// Pending price updates keyed by product name, held beside the list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Overrides {
    pub cny: BTreeMap<String, String>,
    pub qty: BTreeMap<String, u32>,
}

impl Overrides {
    pub fn price(&self, name: &str) -> Option<&str> {
        self.cny.get(name).map(String::as_str)
    }

    pub fn quantity(&self, name: &str) -> Option<u32> {
        self.qty.get(name).copied().filter(|qty| *qty > 0)
    }

    pub fn set_quantity(&mut self, name: &str, qty: Option<u32>) {
        match qty.filter(|qty| *qty > 0) {
            Some(qty) => {
                self.qty.insert(name.to_string(), qty);
            }
            None => {
                self.qty.remove(name);
            }
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.cny.remove(name);
        self.qty.remove(name);
    }

    pub fn clear(&mut self) {
        self.cny.clear();
        self.qty.clear();
    }
}

/// Values shown for one product, computed from the stored fields, the
/// override maps and the current rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRow {
    pub name: String,
    pub old_price: Option<f64>,
    pub cny_price: Option<f64>,
    pub new_cny: Option<f64>,
    pub new_local: Option<f64>,
    pub savings: Option<f64>,
    pub quantity: Option<u32>,
    pub total_value: Option<f64>,
    pub office_stock: Option<f64>,
    pub is_new: bool,
}

impl PricedRow {
    pub fn derive(product: &Product, overrides: &Overrides, rate: f64) -> Self {
        let old_price = parse_decimal(&product.old_price);
        let new_cny = overrides.price(&product.name).and_then(parse_decimal);
        let new_local = new_cny.map(|cny| to_local(cny, rate));
        let quantity = overrides.quantity(&product.name);
        Self {
            name: product.name.clone(),
            old_price,
            cny_price: parse_decimal(&product.cny_price),
            new_cny,
            new_local,
            savings: match (old_price, new_local) {
                (Some(old), Some(local)) => Some(savings(old, local)),
                _ => None,
            },
            quantity,
            total_value: match (new_local, quantity) {
                (Some(local), Some(qty)) => Some(total_value(local, qty)),
                _ => None,
            },
            office_stock: parse_decimal(&product.office_stock),
            is_new: product.is_new,
        }
    }

    pub fn has_pending_price(&self) -> bool {
        self.new_cny.is_some()
    }

    /// Fixed-column export row; absent values are empty cells.
    pub fn to_export_row(&self, product: &Product, overrides: &Overrides) -> Vec<String> {
        let money = |value: Option<f64>| value.map(format_money).unwrap_or_default();
        vec![
            product.name.clone(),
            product.old_price.clone(),
            product.cny_price.clone(),
            money(self.new_cny),
            money(self.new_local),
            money(self.savings),
            overrides
                .quantity(&product.name)
                .map(|qty| qty.to_string())
                .unwrap_or_default(),
            money(self.total_value),
            product.office_stock.clone(),
        ]
    }
}
