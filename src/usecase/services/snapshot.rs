//! JSON shapes of the cached ledger blobs.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::entities::product::{Overrides, Product};
use crate::domain::entities::reference::ReferenceList;
use crate::domain::entities::sort::sort_by_name;

#[derive(Debug, Serialize)]
struct CachedLedgerOut<'a> {
    data: &'a [Product],
    #[serde(rename = "overrideCNY")]
    override_cny: &'a BTreeMap<String, String>,
    #[serde(rename = "overrideQty")]
    override_qty: &'a BTreeMap<String, u32>,
}

/// Accepts both the flat layout and the older split one, where imported and
/// manually added products were kept in separate arrays.
#[derive(Debug, Default, Deserialize)]
struct CachedLedgerIn {
    #[serde(default)]
    data: Option<Vec<Product>>,
    #[serde(rename = "importedData", default)]
    imported_data: Vec<Product>,
    #[serde(rename = "manualData", default)]
    manual_data: Vec<Product>,
    #[serde(rename = "overrideCNY", default)]
    override_cny: BTreeMap<String, String>,
    #[serde(rename = "overrideQty", default)]
    override_qty: BTreeMap<String, u32>,
}

pub fn encode_ledger(products: &[Product], overrides: &Overrides) -> Result<String> {
    serde_json::to_string(&CachedLedgerOut {
        data: products,
        override_cny: &overrides.cny,
        override_qty: &overrides.qty,
    })
    .context("failed to encode cached price list")
}

/// Later occurrences of a name replace earlier ones; the result is sorted.
pub fn decode_ledger(json: &str) -> Result<(Vec<Product>, Overrides)> {
    let cached: CachedLedgerIn =
        serde_json::from_str(json).context("cached price list is not valid JSON")?;

    let merged = match cached.data {
        Some(data) => data,
        None => cached
            .imported_data
            .into_iter()
            .chain(cached.manual_data)
            .collect(),
    };

    let mut by_name: BTreeMap<String, Product> = BTreeMap::new();
    for product in merged {
        if product.name.trim().is_empty() {
            continue;
        }
        by_name.insert(product.name.clone(), product);
    }
    let mut products: Vec<Product> = by_name.into_values().collect();
    sort_by_name(&mut products);

    let mut overrides = Overrides {
        cny: cached.override_cny,
        qty: BTreeMap::new(),
    };
    for (name, qty) in cached.override_qty {
        overrides.set_quantity(&name, Some(qty));
    }
    Ok((products, overrides))
}

pub fn encode_names(names: &BTreeSet<String>) -> Result<String> {
    serde_json::to_string(names).context("failed to encode new product names")
}

pub fn decode_names(json: &str) -> Result<BTreeSet<String>> {
    serde_json::from_str(json).context("cached new product names are not valid JSON")
}

pub fn encode_reference(reference: &ReferenceList) -> Result<(String, String)> {
    let headers = serde_json::to_string(&reference.headers).context("failed to encode headers")?;
    let rows = serde_json::to_string(&reference.rows).context("failed to encode rows")?;
    Ok((headers, rows))
}

pub fn decode_reference(headers: &str, rows: &str) -> Result<ReferenceList> {
    Ok(ReferenceList {
        headers: serde_json::from_str(headers).context("cached headers are not valid JSON")?,
        rows: serde_json::from_str(rows).context("cached rows are not valid JSON")?,
    })
}

/// Seeded on a first run with nothing cached.
pub fn sample_products() -> Vec<Product> {
    vec![
        Product::new("Collagen Face Mask", "45.00", "68.00"),
        Product::new("Hyaluronic Serum", "89.00", "120.00"),
        Product::new("Vitamin C Toner", "35.00", "52.00"),
    ]
}
