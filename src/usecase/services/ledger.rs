//! In-memory price ledger: the product list, the override maps, the exchange
//! rate and the reference catalogue, plus the mutators that change them.
//!
//! Mutators never touch the cache or the remote store themselves. Each one
//! returns [`Effects`] describing which cache blobs must be rewritten and
//! which remote writes must be issued; `LedgerStore` carries those out.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::domain::entities::product::{Overrides, PriceMode, PricedRow, Product};
use crate::domain::entities::reference::ReferenceList;
use crate::domain::entities::sort::{sort_by_name, sort_products, SortColumn, SortSpec};
use crate::domain::pricing::{
    effective_quantity, format_money, parse_decimal, savings, to_local, total_value,
    unit_foreign_price,
};
use crate::domain::schema::PRICE_COLUMNS;

pub const DEFAULT_RATE: f64 = 1.77;
pub const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    InvalidPrice(String),
    InvalidRate(String),
    DuplicateName(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyName => write!(f, "product name is required"),
            ValidationError::InvalidPrice(value) => write!(f, "not a valid price: {value:?}"),
            ValidationError::InvalidRate(value) => write!(f, "not a valid exchange rate: {value:?}"),
            ValidationError::DuplicateName(name) => write!(f, "product already exists: {name}"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerAction {
    CommitPrice {
        name: String,
        raw_value: String,
        mode: PriceMode,
        bundle_qty: u32,
        delivery: f64,
        qty: u32,
    },
    ClearPrice {
        name: String,
    },
    RemoveProduct {
        name: String,
    },
    AddNewProduct {
        name: String,
        foreign_price: String,
        qty: u32,
    },
    AddFromFullList {
        name: String,
        old_price: String,
        foreign_price: String,
    },
    UpdateRate(String),
    ClearAllData,
    /// Header click: flip the active column or start a new one ascending.
    ToggleSort(SortColumn),
    SortBy(SortSpec),
    ReplacePrimary {
        products: Vec<Product>,
        overrides: Overrides,
    },
    ReplaceReference(ReferenceList),
}

/// Cache blobs a mutation made stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Persist {
    Products,
    Rate,
    Reference,
    /// Drop the primary-list blob and the new-product set.
    ForgetProducts,
}

/// Derived pending-update columns sent with a committed price.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub new_cny: f64,
    pub new_local: f64,
    pub savings: Option<f64>,
    pub quantity: Option<u32>,
    pub total_value: Option<f64>,
}

impl PendingUpdate {
    pub fn compute(old_price: Option<&str>, unit_cny: f64, quantity: Option<u32>, rate: f64) -> Self {
        let new_local = to_local(unit_cny, rate);
        Self {
            new_cny: unit_cny,
            new_local,
            savings: old_price
                .and_then(parse_decimal)
                .map(|old| savings(old, new_local)),
            quantity,
            total_value: quantity.map(|qty| total_value(new_local, qty)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOp {
    UpsertPending { name: String, pending: PendingUpdate },
    ClearPending { name: String },
    Insert { product: Product, pending: Option<PendingUpdate> },
    Delete { name: String },
}

impl RemoteOp {
    pub fn product_name(&self) -> &str {
        match self {
            RemoteOp::UpsertPending { name, .. }
            | RemoteOp::ClearPending { name }
            | RemoteOp::Delete { name } => name,
            RemoteOp::Insert { product, .. } => &product.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Effects {
    pub persist: BTreeSet<Persist>,
    pub remote: Vec<RemoteOp>,
}

impl Effects {
    fn persist(mut self, target: Persist) -> Self {
        self.persist.insert(target);
        self
    }

    fn remote(mut self, op: RemoteOp) -> Self {
        self.remote.push(op);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.persist.is_empty() && self.remote.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderList {
    pub rows: Vec<PricedRow>,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub products: Vec<Product>,
    pub overrides: Overrides,
    pub rate: f64,
    pub reference: ReferenceList,
    pub sort: Option<SortSpec>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self::with_rate(DEFAULT_RATE)
    }
}

impl LedgerState {
    pub fn with_rate(rate: f64) -> Self {
        Self {
            products: Vec::new(),
            overrides: Overrides::default(),
            rate,
            reference: ReferenceList::default(),
            sort: None,
        }
    }

    pub fn product(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.name == name)
    }

    pub fn new_product_names(&self) -> BTreeSet<String> {
        self.products
            .iter()
            .filter(|product| product.is_new)
            .map(|product| product.name.clone())
            .collect()
    }

    pub fn apply(&mut self, action: LedgerAction) -> Result<Effects, ValidationError> {
        match action {
            LedgerAction::CommitPrice {
                name,
                raw_value,
                mode,
                bundle_qty,
                delivery,
                qty,
            } => self.commit_price(&name, &raw_value, mode, bundle_qty, delivery, qty),
            LedgerAction::ClearPrice { name } => Ok(self.clear_price(&name)),
            LedgerAction::RemoveProduct { name } => Ok(self.remove_product(&name)),
            LedgerAction::AddNewProduct {
                name,
                foreign_price,
                qty,
            } => self.add_new_product(&name, &foreign_price, qty),
            LedgerAction::AddFromFullList {
                name,
                old_price,
                foreign_price,
            } => self.add_from_full_list(&name, &old_price, &foreign_price),
            LedgerAction::UpdateRate(raw) => self.update_rate(&raw),
            LedgerAction::ClearAllData => Ok(self.clear_all_data()),
            LedgerAction::ToggleSort(column) => {
                let spec = SortSpec::toggle(self.sort, column);
                Ok(self.sort_data(spec))
            }
            LedgerAction::SortBy(spec) => Ok(self.sort_data(spec)),
            LedgerAction::ReplacePrimary {
                products,
                overrides,
            } => Ok(self.replace_primary(products, overrides)),
            LedgerAction::ReplaceReference(reference) => {
                self.reference = reference;
                Ok(Effects::default().persist(Persist::Reference))
            }
        }
    }

    fn commit_price(
        &mut self,
        name: &str,
        raw_value: &str,
        mode: PriceMode,
        bundle_qty: u32,
        delivery: f64,
        qty: u32,
    ) -> Result<Effects, ValidationError> {
        let raw = parse_decimal(raw_value)
            .ok_or_else(|| ValidationError::InvalidPrice(raw_value.to_string()))?;
        let unit_cny = unit_foreign_price(raw, mode, bundle_qty, delivery, qty);
        let quantity = effective_quantity(mode, bundle_qty, qty);

        self.overrides
            .cny
            .insert(name.to_string(), format_money(unit_cny));
        self.overrides.set_quantity(name, quantity);
        debug!(name, unit_cny, ?quantity, "committed price");

        let effects = Effects::default().persist(Persist::Products);
        let Some(product) = self.product(name) else {
            warn!(name, "committed price for a product that is not in the list; remote sync skipped");
            return Ok(effects);
        };
        let pending = PendingUpdate::compute(Some(&product.old_price), unit_cny, quantity, self.rate);
        Ok(effects.remote(RemoteOp::UpsertPending {
            name: name.to_string(),
            pending,
        }))
    }

    fn clear_price(&mut self, name: &str) -> Effects {
        self.overrides.remove(name);
        Effects::default()
            .persist(Persist::Products)
            .remote(RemoteOp::ClearPending {
                name: name.to_string(),
            })
    }

    fn remove_product(&mut self, name: &str) -> Effects {
        self.products.retain(|product| product.name != name);
        self.overrides.remove(name);
        Effects::default()
            .persist(Persist::Products)
            .remote(RemoteOp::Delete {
                name: name.to_string(),
            })
    }

    fn validate_new_name(&self, name: &str) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.product(name).is_some() {
            return Err(ValidationError::DuplicateName(name.to_string()));
        }
        Ok(name.to_string())
    }

    fn insert_sorted(&mut self, product: Product) {
        self.products.push(product);
        sort_by_name(&mut self.products);
    }

    fn add_new_product(
        &mut self,
        name: &str,
        foreign_price: &str,
        qty: u32,
    ) -> Result<Effects, ValidationError> {
        let name = self.validate_new_name(name)?;
        let cny = parse_decimal(foreign_price)
            .filter(|value| *value > 0.0)
            .ok_or_else(|| ValidationError::InvalidPrice(foreign_price.to_string()))?;

        let local = to_local(cny, self.rate);
        let product = Product {
            name: name.clone(),
            old_price: format_money(local),
            cny_price: format_money(cny),
            office_stock: "0".to_string(),
            is_new: true,
        };
        let quantity = (qty > 0).then_some(qty);
        let pending = PendingUpdate::compute(Some(&product.old_price), cny, quantity, self.rate);

        self.overrides.cny.insert(name.clone(), format_money(cny));
        self.overrides.set_quantity(&name, quantity);
        self.insert_sorted(product.clone());

        Ok(Effects::default()
            .persist(Persist::Products)
            .remote(RemoteOp::Insert {
                product,
                pending: Some(pending),
            }))
    }

    fn add_from_full_list(
        &mut self,
        name: &str,
        old_price: &str,
        foreign_price: &str,
    ) -> Result<Effects, ValidationError> {
        let name = self.validate_new_name(name)?;
        let product = Product {
            name,
            old_price: old_price.trim().to_string(),
            cny_price: foreign_price.trim().to_string(),
            office_stock: "0".to_string(),
            is_new: false,
        };
        self.insert_sorted(product.clone());
        Ok(Effects::default()
            .persist(Persist::Products)
            .remote(RemoteOp::Insert {
                product,
                pending: None,
            }))
    }

    fn update_rate(&mut self, raw: &str) -> Result<Effects, ValidationError> {
        let rate = parse_decimal(raw)
            .filter(|rate| *rate > 0.0)
            .ok_or_else(|| ValidationError::InvalidRate(raw.to_string()))?;
        self.rate = rate;
        Ok(Effects::default().persist(Persist::Rate))
    }

    fn clear_all_data(&mut self) -> Effects {
        self.products.clear();
        self.overrides.clear();
        self.sort = None;
        Effects::default().persist(Persist::ForgetProducts)
    }

    fn sort_data(&mut self, spec: SortSpec) -> Effects {
        sort_products(&mut self.products, spec, &self.overrides, self.rate);
        self.sort = Some(spec);
        Effects::default()
    }

    fn replace_primary(&mut self, mut products: Vec<Product>, overrides: Overrides) -> Effects {
        sort_by_name(&mut products);
        self.products = products;
        self.overrides = overrides;
        self.sort = None;
        Effects::default().persist(Persist::Products)
    }

    /// Replaces list and overrides wholesale with remote content, keeping the
    /// local `isNew` flags for names that survive.
    pub fn replace_from_remote(
        &mut self,
        mut products: Vec<Product>,
        overrides: Overrides,
        new_names: &BTreeSet<String>,
    ) {
        for product in &mut products {
            product.is_new = new_names.contains(&product.name);
        }
        sort_by_name(&mut products);
        self.products = products;
        self.overrides = overrides;
        self.sort = None;
    }

    pub fn priced_rows(&self) -> Vec<PricedRow> {
        self.products
            .iter()
            .map(|product| PricedRow::derive(product, &self.overrides, self.rate))
            .collect()
    }

    pub fn priced_row(&self, name: &str) -> Option<PricedRow> {
        self.product(name)
            .map(|product| PricedRow::derive(product, &self.overrides, self.rate))
    }

    pub fn search(&self, term: &str) -> Vec<&Product> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.products
            .iter()
            .filter(|product| product.name.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .collect()
    }

    /// Rows that carry both an order quantity and a pending price.
    pub fn order_list(&self) -> OrderList {
        let rows: Vec<PricedRow> = self
            .priced_rows()
            .into_iter()
            .filter(|row| row.quantity.is_some() && row.new_cny.is_some())
            .collect();
        let total_value = rows.iter().filter_map(|row| row.total_value).sum();
        OrderList { rows, total_value }
    }

    /// Header row plus one fixed-column row per product.
    pub fn export_rows(&self) -> Vec<Vec<String>> {
        let header = PRICE_COLUMNS.iter().map(|c| c.to_string()).collect();
        std::iter::once(header)
            .chain(self.products.iter().map(|product| {
                PricedRow::derive(product, &self.overrides, self.rate)
                    .to_export_row(product, &self.overrides)
            }))
            .collect()
    }
}
