//! Owned container around [`LedgerState`]: hands out snapshots, notifies
//! subscribers, and carries out the cache and remote effects of each action.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::entities::reference::ReferenceList;
use crate::domain::pricing::parse_decimal;
use crate::domain::schema::{COL_NAME, PRICE_TABLE, REFERENCE_TABLE};
use crate::usecase::ports::cache::{
    BlobCache, KEY_FULL_LIST_DATA, KEY_FULL_LIST_HEADERS, KEY_NEW_PRODUCTS, KEY_PRICE_DATA,
    KEY_RATE,
};
use crate::usecase::ports::store::{Row, StoreError, TableStore};
use crate::usecase::services::ledger::{
    Effects, LedgerAction, LedgerState, Persist, ValidationError,
};
use crate::usecase::services::remote_rows::{
    ledger_from_rows, reference_from_rows, reference_rows, snapshot_row,
};
use crate::usecase::services::snapshot::{
    decode_ledger, decode_names, decode_reference, encode_ledger, encode_names,
    encode_reference, sample_products,
};
use crate::usecase::services::sync::RemoteDispatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Uninitialized,
    CacheLoaded,
    RemoteReconciled,
    /// Remote fetch failed; the cache-loaded state stays visible.
    RemoteFetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&LedgerState)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub written: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub products: TableReport,
    pub reference: TableReport,
}

impl SaveReport {
    pub fn is_success(&self) -> bool {
        self.products.failures.is_empty() && self.reference.failures.is_empty()
    }
}

/// Raw remote rows for the price and reference tables. Fetching needs only
/// the store, so it can run on any thread while the cached state is shown.
#[derive(Debug)]
pub struct RemoteFetch {
    pub prices: Result<Vec<Row>, StoreError>,
    pub reference: Result<Vec<Row>, StoreError>,
}

impl RemoteFetch {
    #[instrument(skip_all)]
    pub fn fetch(store: &dyn TableStore) -> Self {
        Self {
            prices: store.select_all(PRICE_TABLE),
            reference: store.select_all(REFERENCE_TABLE),
        }
    }
}

pub struct LedgerStore {
    state: LedgerState,
    cache: Arc<dyn BlobCache>,
    remote: Arc<dyn RemoteDispatch>,
    phase: LoadPhase,
    reference_phase: LoadPhase,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl LedgerStore {
    pub fn new(cache: Arc<dyn BlobCache>, remote: Arc<dyn RemoteDispatch>, default_rate: f64) -> Self {
        Self {
            state: LedgerState::with_rate(default_rate),
            cache,
            remote,
            phase: LoadPhase::Uninitialized,
            reference_phase: LoadPhase::Uninitialized,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn snapshot(&self) -> &LedgerState {
        &self.state
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn reference_phase(&self) -> LoadPhase {
        self.reference_phase
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&LedgerState) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.state);
        }
    }

    /// Applies one action. Validation failures leave everything untouched.
    pub fn dispatch(&mut self, action: LedgerAction) -> Result<(), ValidationError> {
        let effects = self.state.apply(action)?;
        self.carry_out(effects);
        self.notify();
        Ok(())
    }

    fn carry_out(&self, effects: Effects) {
        for target in &effects.persist {
            self.persist(*target);
        }
        for op in effects.remote {
            self.remote.submit(op);
        }
    }

    fn cache_get(&self, key: &str) -> Option<String> {
        match self.cache.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "cache read failed");
                None
            }
        }
    }

    fn cache_set(&self, key: &str, value: anyhow::Result<String>) {
        let result = value
            .map_err(|err| err.to_string())
            .and_then(|value| self.cache.set(key, &value).map_err(|err| err.to_string()));
        if let Err(err) = result {
            warn!(key, %err, "cache write failed");
        }
    }

    fn cache_remove(&self, key: &str) {
        if let Err(err) = self.cache.remove(key) {
            warn!(key, %err, "cache remove failed");
        }
    }

    fn persist(&self, target: Persist) {
        match target {
            Persist::Products => {
                self.cache_set(
                    KEY_PRICE_DATA,
                    encode_ledger(&self.state.products, &self.state.overrides),
                );
                self.cache_set(KEY_NEW_PRODUCTS, encode_names(&self.state.new_product_names()));
            }
            Persist::Rate => {
                if let Err(err) = self.cache.set(KEY_RATE, &self.state.rate.to_string()) {
                    warn!(%err, "cache write failed for exchange rate");
                }
            }
            Persist::Reference => match encode_reference(&self.state.reference) {
                Ok((headers, rows)) => {
                    self.cache_set(KEY_FULL_LIST_HEADERS, Ok(headers));
                    self.cache_set(KEY_FULL_LIST_DATA, Ok(rows));
                }
                Err(err) => warn!(%err, "failed to encode reference list"),
            },
            Persist::ForgetProducts => {
                self.cache_remove(KEY_PRICE_DATA);
                self.cache_remove(KEY_NEW_PRODUCTS);
            }
        }
    }

    fn cached_new_names(&self) -> BTreeSet<String> {
        let Some(json) = self.cache_get(KEY_NEW_PRODUCTS) else {
            return BTreeSet::new();
        };
        decode_names(&json).unwrap_or_else(|err| {
            warn!(%err, "ignoring cached new product names");
            BTreeSet::new()
        })
    }

    /// First load phase: rate, price list and reference list from the cache.
    pub fn load_cache(&mut self) {
        if let Some(rate) = self
            .cache_get(KEY_RATE)
            .as_deref()
            .and_then(parse_decimal)
            .filter(|rate| *rate > 0.0)
        {
            self.state.rate = rate;
        }

        let new_names = self.cached_new_names();
        match self.cache_get(KEY_PRICE_DATA) {
            Some(json) => match decode_ledger(&json) {
                Ok((mut products, overrides)) => {
                    for product in &mut products {
                        product.is_new |= new_names.contains(&product.name);
                    }
                    info!(products = products.len(), "price list loaded from cache");
                    self.state.products = products;
                    self.state.overrides = overrides;
                }
                Err(err) => warn!(err = %format!("{err:#}"), "ignoring cached price list"),
            },
            None => {
                info!("no cached price list; seeding sample products");
                self.state.products = sample_products();
            }
        }

        if let (Some(headers), Some(rows)) = (
            self.cache_get(KEY_FULL_LIST_HEADERS),
            self.cache_get(KEY_FULL_LIST_DATA),
        ) {
            match decode_reference(&headers, &rows) {
                Ok(reference) => self.state.reference = reference,
                Err(err) => warn!(err = %format!("{err:#}"), "ignoring cached reference list"),
            }
        }

        self.phase = LoadPhase::CacheLoaded;
        self.reference_phase = LoadPhase::CacheLoaded;
        self.notify();
    }

    /// Second load phase for the price list. A successful fetch replaces the
    /// list and both override maps outright and rewrites the cache.
    pub fn reconcile_remote(&mut self, fetched: Result<Vec<Row>, StoreError>) {
        match fetched {
            Ok(rows) => {
                let (products, overrides) = ledger_from_rows(&rows);
                let mut new_names = self.cached_new_names();
                new_names.extend(self.state.new_product_names());
                info!(products = products.len(), "price list reconciled with remote");
                self.state.replace_from_remote(products, overrides, &new_names);
                self.persist(Persist::Products);
                self.phase = LoadPhase::RemoteReconciled;
            }
            Err(err) => {
                error!(%err, "remote price list fetch failed; keeping cached data");
                self.phase = LoadPhase::RemoteFetchFailed;
            }
        }
        self.notify();
    }

    pub fn reconcile_reference(&mut self, fetched: Result<Vec<Row>, StoreError>) {
        match fetched {
            Ok(rows) if rows.is_empty() => {
                debug!("remote reference list is empty; keeping cached copy");
                self.reference_phase = LoadPhase::RemoteReconciled;
            }
            Ok(rows) => {
                self.state.reference = reference_from_rows(&rows);
                info!(rows = rows.len(), "reference list reconciled with remote");
                self.persist(Persist::Reference);
                self.reference_phase = LoadPhase::RemoteReconciled;
            }
            Err(err) => {
                error!(%err, "remote reference list fetch failed; keeping cached data");
                self.reference_phase = LoadPhase::RemoteFetchFailed;
            }
        }
        self.notify();
    }

    /// Second load phase for both tables, once a fetch has come back.
    pub fn apply_remote(&mut self, fetched: RemoteFetch) {
        self.reconcile_remote(fetched.prices);
        self.reconcile_reference(fetched.reference);
    }

    /// Runs both load phases against `store`, blocking on the fetches.
    #[instrument(skip_all)]
    pub fn load(&mut self, store: &dyn TableStore) {
        self.load_cache();
        self.apply_remote(RemoteFetch::fetch(store));
    }

    /// Writes every product and reference row to `store` and waits for each.
    #[instrument(skip_all)]
    pub fn save_all(&self, store: &dyn TableStore) -> SaveReport {
        let mut report = SaveReport::default();
        for product in &self.state.products {
            let row = snapshot_row(product, &self.state.overrides, self.state.rate);
            match store.upsert(PRICE_TABLE, COL_NAME, &row) {
                Ok(()) => report.products.written += 1,
                Err(err) => {
                    error!(product = %product.name, %err, "save failed");
                    report.products.failures.push(product.name.clone());
                }
            }
        }

        report.reference = save_reference(store, &self.state.reference);
        self.persist(Persist::Products);
        self.persist(Persist::Reference);
        info!(
            products = report.products.written,
            reference = report.reference.written,
            "save all finished"
        );
        report
    }
}

fn save_reference(store: &dyn TableStore, reference: &ReferenceList) -> TableReport {
    let mut report = TableReport::default();
    let Some(key_column) = reference.headers.first() else {
        return report;
    };
    for row in reference_rows(reference) {
        let label = row
            .get(key_column)
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        if label.is_empty() {
            continue;
        }
        match store.upsert(REFERENCE_TABLE, key_column, &row) {
            Ok(()) => report.written += 1,
            Err(err) => {
                error!(row = %label, %err, "reference save failed");
                report.failures.push(label);
            }
        }
    }
    report
}
