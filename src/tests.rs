use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use crate::domain::entities::product::{Overrides, PriceMode, Product};
use crate::domain::entities::reference::ReferenceList;
use crate::domain::entities::stock::{StockLevel, UsageEntry, UsageKind};
use crate::domain::pricing::format_money;
use crate::domain::schema::*;
use crate::infra::cache::file::FileCache;
use crate::infra::cache::memory::MemoryCache;
use crate::infra::import::csv::CsvCodec;
use crate::infra::import::xlsx::XlsxCodec;
use crate::infra::sqlite::store::SqliteTableStore;
use crate::usecase::ports::cache::*;
use crate::usecase::ports::codec::SpreadsheetCodec;
use crate::usecase::ports::store::{Filter, Row, StoreError, TableStore};
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::ledger::{LedgerAction, LedgerState, RemoteOp};
use crate::usecase::services::ledger_store::{LedgerStore, LoadPhase, RemoteFetch};
use crate::usecase::services::snapshot::{decode_ledger, decode_names, sample_products};
use crate::usecase::services::stock_service::StockService;
use crate::usecase::services::sync::{RecordingDispatch, RemoteSync};

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("price-lookup-{prefix}-{nanos}"))
}

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("fixture should be an object")
}

fn names(state: &LedgerState) -> Vec<&str> {
    state.products.iter().map(|p| p.name.as_str()).collect()
}

fn memory_store() -> Arc<SqliteTableStore> {
    Arc::new(SqliteTableStore::open_in_memory().expect("in-memory store should open"))
}

fn ledger_with(cache: Arc<MemoryCache>) -> (LedgerStore, Arc<RecordingDispatch>) {
    let recording = Arc::new(RecordingDispatch::default());
    let store = LedgerStore::new(cache, recording.clone(), 2.0);
    (store, recording)
}

fn commit(name: &str, raw: &str, qty: u32) -> LedgerAction {
    LedgerAction::CommitPrice {
        name: name.to_string(),
        raw_value: raw.to_string(),
        mode: PriceMode::Unit,
        bundle_qty: 0,
        delivery: 0.0,
        qty,
    }
}

const CACHED_AB: &str = r#"{
    "data": [
        {"name": "B", "oldPrice": "20.00", "cnyPrice": "30.00"},
        {"name": "A", "oldPrice": "10.00", "cnyPrice": "15.00"}
    ],
    "overrideCNY": {"A": "12.00"},
    "overrideQty": {"A": 4}
}"#;

#[test]
fn remote_rows_fully_replace_cached_list() {
    init_test_tracing();
    let cache = Arc::new(MemoryCache::with_entries([(KEY_PRICE_DATA, CACHED_AB)]));
    let remote = memory_store();
    remote
        .insert(
            PRICE_TABLE,
            &row(json!({COL_NAME: "B", COL_OLD_PRICE: 20, COL_CNY_PRICE: 30})),
        )
        .expect("seed B");
    remote
        .insert(
            PRICE_TABLE,
            &row(json!({
                COL_NAME: "C",
                COL_OLD_PRICE: 8,
                COL_CNY_PRICE: 12,
                COL_NEW_CNY: 10,
                COL_ORDER_QTY: 2
            })),
        )
        .expect("seed C");
    let (mut ledger, _) = ledger_with(cache.clone());

    assert_eq!(ledger.phase(), LoadPhase::Uninitialized);
    ledger.load_cache();
    assert_eq!(ledger.phase(), LoadPhase::CacheLoaded);
    assert_eq!(names(ledger.snapshot()), vec!["A", "B"]);
    assert_eq!(ledger.snapshot().overrides.price("A"), Some("12.00"));

    ledger.reconcile_remote(remote.select_all(PRICE_TABLE));

    assert_eq!(ledger.phase(), LoadPhase::RemoteReconciled);
    let state = ledger.snapshot();
    assert_eq!(names(state), vec!["B", "C"]);
    assert_eq!(state.overrides.price("A"), None);
    assert_eq!(state.overrides.quantity("A"), None);
    assert_eq!(state.overrides.price("C"), Some("10.00"));
    assert_eq!(state.overrides.quantity("C"), Some(2));

    let cached = cache
        .get(KEY_PRICE_DATA)
        .expect("cache read")
        .expect("price list should be re-cached");
    let (cached_products, cached_overrides) = decode_ledger(&cached).expect("cache should decode");
    assert_eq!(cached_products.len(), 2);
    assert_eq!(cached_overrides, state.overrides);
}

#[test]
fn cached_list_is_shown_while_remote_fetch_runs_elsewhere() {
    init_test_tracing();
    let cache = Arc::new(MemoryCache::with_entries([(KEY_PRICE_DATA, CACHED_AB)]));
    let remote = memory_store();
    remote
        .insert(PRICE_TABLE, &row(json!({COL_NAME: "C", COL_OLD_PRICE: 8})))
        .expect("seed C");
    let (mut ledger, _) = ledger_with(cache);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    ledger.subscribe(move |state| {
        sink.borrow_mut()
            .push(state.products.iter().map(|p| p.name.clone()).collect::<Vec<_>>())
    });

    ledger.load_cache();
    let fetch_store = remote.clone();
    let fetching = std::thread::spawn(move || RemoteFetch::fetch(fetch_store.as_ref()));

    assert_eq!(ledger.phase(), LoadPhase::CacheLoaded);
    assert_eq!(names(ledger.snapshot()), vec!["A", "B"]);

    let fetched = fetching.join().expect("fetch thread should finish");
    assert_eq!(ledger.phase(), LoadPhase::CacheLoaded);
    ledger.apply_remote(fetched);

    assert_eq!(ledger.phase(), LoadPhase::RemoteReconciled);
    assert_eq!(ledger.reference_phase(), LoadPhase::RemoteReconciled);
    assert_eq!(names(ledger.snapshot()), vec!["C"]);
    assert_eq!(seen.borrow().first(), Some(&vec!["A".to_string(), "B".to_string()]));
    assert_eq!(seen.borrow().last(), Some(&vec!["C".to_string()]));
}

#[test]
fn remote_failure_keeps_cache_loaded_state() {
    init_test_tracing();
    let cache = Arc::new(MemoryCache::with_entries([(KEY_PRICE_DATA, CACHED_AB)]));
    let (mut ledger, _) = ledger_with(cache);

    ledger.load_cache();
    ledger.reconcile_remote(Err(StoreError::Message("offline".into())));
    ledger.reconcile_reference(Err(StoreError::Message("offline".into())));

    assert_eq!(ledger.phase(), LoadPhase::RemoteFetchFailed);
    assert_eq!(ledger.reference_phase(), LoadPhase::RemoteFetchFailed);
    assert_eq!(names(ledger.snapshot()), vec!["A", "B"]);
    assert_eq!(ledger.snapshot().overrides.quantity("A"), Some(4));
}

#[test]
fn empty_cache_seeds_sample_products_and_corrupt_cache_is_ignored() {
    let (mut fresh, _) = ledger_with(Arc::new(MemoryCache::new()));
    fresh.load_cache();
    assert_eq!(fresh.snapshot().products, sample_products());

    let corrupt = Arc::new(MemoryCache::with_entries([
        (KEY_PRICE_DATA, "{not json"),
        (KEY_RATE, "abc"),
    ]));
    let (mut ledger, _) = ledger_with(corrupt);
    ledger.load_cache();
    assert!(ledger.snapshot().products.is_empty());
    assert_eq!(ledger.snapshot().rate, 2.0);
    assert_eq!(ledger.phase(), LoadPhase::CacheLoaded);
}

#[test]
fn legacy_cache_and_new_product_flags_are_restored() {
    let legacy = r#"{
        "importedData": [{"name": "Rose", "oldPrice": "9.00", "cnyPrice": "16.00"}],
        "manualData": [{"name": "Zest", "oldPrice": "5.00", "cnyPrice": "10.00"}],
        "overrideCNY": {"Zest": "10.00"}
    }"#;
    let cache = Arc::new(MemoryCache::with_entries([
        (KEY_PRICE_DATA, legacy),
        (KEY_NEW_PRODUCTS, r#"["Zest"]"#),
        (KEY_RATE, "1.8"),
    ]));
    let remote = memory_store();
    remote
        .insert(PRICE_TABLE, &row(json!({COL_NAME: "Zest", COL_OLD_PRICE: 5})))
        .expect("seed Zest");
    let (mut ledger, _) = ledger_with(cache);

    ledger.load_cache();
    assert_eq!(ledger.snapshot().rate, 1.8);
    let zest = ledger.snapshot().product("Zest").expect("Zest should load");
    assert!(zest.is_new);
    assert!(!ledger.snapshot().product("Rose").expect("Rose").is_new);

    ledger.reconcile_remote(remote.select_all(PRICE_TABLE));
    assert!(ledger.snapshot().product("Zest").expect("Zest survives").is_new);
}

#[test]
fn dispatch_persists_locally_and_queues_remote_write() {
    let cache = Arc::new(MemoryCache::new());
    let (mut ledger, recording) = ledger_with(cache.clone());
    ledger.load_cache();

    ledger
        .dispatch(LedgerAction::AddNewProduct {
            name: "Z".into(),
            foreign_price: "50.00".into(),
            qty: 2,
        })
        .expect("add should succeed");

    let state = ledger.snapshot();
    let z = state.product("Z").expect("Z inserted");
    assert_eq!(z.old_price, "25.00");
    assert_eq!(z.cny_price, "50.00");
    assert_eq!(state.overrides.quantity("Z"), Some(2));
    let sorted: Vec<String> = state.products.iter().map(Product::sort_key).collect();
    let mut expected = sorted.clone();
    expected.sort();
    assert_eq!(sorted, expected);

    let cached = cache.get(KEY_PRICE_DATA).expect("read").expect("written");
    let (products, _) = decode_ledger(&cached).expect("decode");
    assert!(products.iter().any(|p| p.name == "Z" && p.is_new));
    let new_names = decode_names(&cache.get(KEY_NEW_PRODUCTS).expect("read").expect("written"))
        .expect("decode");
    assert_eq!(new_names, BTreeSet::from(["Z".to_string()]));

    let ops = recording.take();
    assert!(matches!(ops.as_slice(), [RemoteOp::Insert { pending: Some(_), .. }]));
}

#[test]
fn rejected_action_changes_nothing() {
    let cache = Arc::new(MemoryCache::new());
    let (mut ledger, recording) = ledger_with(cache.clone());
    let notified = Rc::new(RefCell::new(0_usize));
    let counter = notified.clone();
    ledger.subscribe(move |_| *counter.borrow_mut() += 1);

    let result = ledger.dispatch(LedgerAction::AddNewProduct {
        name: "   ".into(),
        foreign_price: "50".into(),
        qty: 0,
    });

    assert!(result.is_err());
    assert!(recording.take().is_empty());
    assert_eq!(cache.get(KEY_PRICE_DATA).expect("read"), None);
    assert_eq!(*notified.borrow(), 0);
}

#[test]
fn subscribers_see_every_change_until_unsubscribed() {
    let (mut ledger, _) = ledger_with(Arc::new(MemoryCache::new()));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let id = ledger.subscribe(move |state| sink.borrow_mut().push(state.rate));

    ledger
        .dispatch(LedgerAction::UpdateRate("1.5".into()))
        .expect("rate update");
    assert!(ledger.unsubscribe(id));
    ledger
        .dispatch(LedgerAction::UpdateRate("1.6".into()))
        .expect("rate update");

    assert_eq!(*seen.borrow(), vec![1.5]);
    assert!(!ledger.unsubscribe(id));
}

#[test]
fn rate_survives_reload_and_clear_all_keeps_it() {
    let cache = Arc::new(MemoryCache::new());
    let (mut ledger, _) = ledger_with(cache.clone());
    ledger.load_cache();
    ledger
        .dispatch(LedgerAction::UpdateRate("1.65".into()))
        .expect("rate update");
    ledger
        .dispatch(LedgerAction::ReplaceReference(ReferenceList {
            headers: vec!["Name".into()],
            rows: vec![vec!["Rose".into()]],
        }))
        .expect("reference replace");
    ledger
        .dispatch(LedgerAction::ClearAllData)
        .expect("clear all");

    assert_eq!(cache.get(KEY_PRICE_DATA).expect("read"), None);
    assert_eq!(cache.get(KEY_NEW_PRODUCTS).expect("read"), None);

    let (mut reloaded, _) = ledger_with(cache);
    reloaded.load_cache();
    assert_eq!(reloaded.snapshot().rate, 1.65);
    assert_eq!(reloaded.snapshot().reference.rows, vec![vec!["Rose".to_string()]]);
    assert_eq!(reloaded.snapshot().products, sample_products());
}

#[test]
fn remote_sync_applies_ops_in_order() {
    init_test_tracing();
    let remote = memory_store();
    let sync = Arc::new(RemoteSync::spawn(remote.clone()));
    let mut ledger = LedgerStore::new(Arc::new(MemoryCache::new()), sync.clone(), 2.0);
    let by_name = |name: &str| {
        remote
            .select(PRICE_TABLE, &[Filter::eq(COL_NAME, name)])
            .expect("select should succeed")
    };

    ledger
        .dispatch(LedgerAction::AddNewProduct {
            name: "Z".into(),
            foreign_price: "50".into(),
            qty: 2,
        })
        .expect("add");
    sync.flush();
    let inserted = by_name("Z");
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0][COL_OLD_PRICE], json!(25.0));
    assert_eq!(inserted[0][COL_NEW_LOCAL], json!(25.0));
    assert_eq!(inserted[0][COL_ORDER_QTY], json!(2));
    assert_eq!(inserted[0][COL_TOTAL_VALUE], json!(50.0));

    ledger.dispatch(commit("Z", "60", 3)).expect("commit");
    sync.flush();
    let committed = by_name("Z");
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0][COL_NEW_CNY], json!(60.0));
    assert_eq!(committed[0][COL_SAVINGS], json!(-5.0));
    assert_eq!(committed[0][COL_TOTAL_VALUE], json!(90.0));

    ledger
        .dispatch(LedgerAction::ClearPrice { name: "Z".into() })
        .expect("clear");
    sync.flush();
    let cleared = by_name("Z");
    assert_eq!(cleared[0][COL_NEW_CNY], Value::Null);
    assert_eq!(cleared[0][COL_ORDER_QTY], Value::Null);
    assert_eq!(cleared[0][COL_OLD_PRICE], json!(25.0));

    ledger
        .dispatch(LedgerAction::RemoveProduct { name: "Z".into() })
        .expect("remove");
    sync.flush();
    assert!(by_name("Z").is_empty());
    sync.shutdown();
}

#[test]
fn re_adding_a_cleared_product_keeps_one_remote_row() {
    init_test_tracing();
    let remote = memory_store();
    let sync = Arc::new(RemoteSync::spawn(remote.clone()));
    let cache = Arc::new(MemoryCache::new());
    let mut ledger = LedgerStore::new(cache.clone(), sync.clone(), 2.0);
    ledger.load(remote.as_ref());
    let add = |price: &str| LedgerAction::AddNewProduct {
        name: "X".into(),
        foreign_price: price.into(),
        qty: 0,
    };

    ledger.dispatch(add("10")).expect("first add");
    ledger.dispatch(LedgerAction::ClearAllData).expect("clear all");
    ledger.dispatch(add("14")).expect("second add");
    sync.flush();

    let rows = remote
        .select(PRICE_TABLE, &[Filter::eq(COL_NAME, "X")])
        .expect("select should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][COL_CNY_PRICE], json!(14.0));

    let (mut reloaded, _) = ledger_with(cache);
    reloaded.load(remote.as_ref());
    assert_eq!(names(reloaded.snapshot()), vec!["X"]);
    assert_eq!(reloaded.snapshot().overrides.price("X"), Some("14.00"));
    sync.shutdown();
}

fn priced_state() -> LedgerState {
    let mut state = LedgerState::with_rate(1.77);
    let mut rose = Product::new("Rose Oil", "17.00", "30.00");
    rose.office_stock = "4".into();
    state.products = vec![Product::new("clay mask", "9.90", ""), rose];
    state.overrides.cny.insert("Rose Oil".into(), "12.00".into());
    state.overrides.set_quantity("Rose Oil", Some(3));
    state
}

fn assert_round_trip(codec: &dyn SpreadsheetCodec) {
    let state = priced_state();
    let bytes = ImportService::write_prices(codec, &state).expect("export should succeed");
    let sheet = ImportService::read_prices(codec, &bytes).expect("import should succeed");

    let triples = |products: &[Product]| -> BTreeSet<(String, String, String)> {
        products
            .iter()
            .map(|p| (p.name.clone(), p.old_price.clone(), p.cny_price.clone()))
            .collect()
    };
    assert_eq!(triples(&sheet.products), triples(&state.products));
    assert_eq!(sheet.overrides, state.overrides);
}

#[test]
fn export_then_import_reproduces_products_xlsx() {
    assert_round_trip(&XlsxCodec);
}

#[test]
fn export_then_import_reproduces_products_csv() {
    assert_round_trip(&CsvCodec);
}

#[test]
fn export_rows_carry_derived_columns() {
    let rows = priced_state().export_rows();
    assert_eq!(rows[0], PRICE_COLUMNS.map(str::to_string).to_vec());
    let rose = rows
        .iter()
        .find(|r| r[0] == "Rose Oil")
        .expect("Rose row should be exported");
    assert_eq!(rose[IDX_NEW_CNY], "12.00");
    assert_eq!(rose[4], "6.78");
    assert_eq!(rose[5], "10.22");
    assert_eq!(rose[IDX_ORDER_QTY], "3");
    assert_eq!(rose[7], "20.34");
    assert_eq!(rose[IDX_OFFICE_STOCK], "4");
}

#[test]
fn import_replaces_list_and_clears_new_flags() {
    let cache = Arc::new(MemoryCache::new());
    let (mut ledger, recording) = ledger_with(cache);
    ledger
        .dispatch(LedgerAction::AddNewProduct {
            name: "Rose Oil".into(),
            foreign_price: "40".into(),
            qty: 0,
        })
        .expect("add");
    recording.take();

    let bytes = ImportService::write_prices(&CsvCodec, &priced_state()).expect("export");
    let sheet = ImportService::read_prices(&CsvCodec, &bytes).expect("import");
    ledger.dispatch(sheet.into_action()).expect("replace");

    let state = ledger.snapshot();
    assert_eq!(names(state), vec!["clay mask", "Rose Oil"]);
    assert!(state.products.iter().all(|p| !p.is_new));
    assert_eq!(state.overrides.price("Rose Oil"), Some("12.00"));
    assert!(recording.take().is_empty());
}

#[test]
fn save_all_upserts_products_and_reference_rows() {
    let remote = memory_store();
    let (mut ledger, _) = ledger_with(Arc::new(MemoryCache::new()));
    ledger
        .dispatch(LedgerAction::ReplacePrimary {
            products: priced_state().products,
            overrides: priced_state().overrides,
        })
        .expect("replace");
    ledger
        .dispatch(LedgerAction::ReplaceReference(ReferenceList {
            headers: vec!["Name".into(), "RM".into(), "CNY".into()],
            rows: vec![
                vec!["Rose Oil".into(), "17.00".into(), "30.00".into()],
                vec!["Clay".into(), "9.90".into(), "16.00".into()],
            ],
        }))
        .expect("reference");

    let first = ledger.save_all(remote.as_ref());
    let second = ledger.save_all(remote.as_ref());

    assert!(first.is_success());
    assert_eq!(first.products.written, 2);
    assert_eq!(second.reference.written, 2);
    assert_eq!(remote.select_all(PRICE_TABLE).expect("select").len(), 2);
    assert_eq!(remote.select_all(REFERENCE_TABLE).expect("select").len(), 2);
    let rose = remote
        .select(PRICE_TABLE, &[Filter::eq(COL_NAME, "Rose Oil")])
        .expect("select");
    assert_eq!(rose[0][COL_NEW_CNY], json!(12.0));
    assert_eq!(rose[0][COL_ORDER_QTY], json!(3));

    let (mut reloaded, _) = ledger_with(Arc::new(MemoryCache::new()));
    reloaded.load(remote.as_ref());
    assert_eq!(reloaded.phase(), LoadPhase::RemoteReconciled);
    assert_eq!(reloaded.snapshot().overrides, priced_state().overrides);
    assert_eq!(reloaded.snapshot().reference.rows.len(), 2);
    assert_eq!(reloaded.snapshot().reference.headers, vec!["Name", "RM", "CNY"]);
}

#[test]
fn reference_sheet_import_replaces_and_seeds() {
    let sheet = b"Name,RM,CNY\nRose Oil,17.00,30.00\n,,\nClay,9.90,16.00\n";
    let reference = ImportService::read_reference(&CsvCodec, sheet)
        .expect("parse should succeed")
        .expect("rows should be found");
    assert_eq!(reference.rows.len(), 2);
    assert!(ImportService::read_reference(&CsvCodec, b"Name,RM\n")
        .expect("parse should succeed")
        .is_none());

    let (mut ledger, recording) = ledger_with(Arc::new(MemoryCache::new()));
    ledger
        .dispatch(LedgerAction::ReplaceReference(reference))
        .expect("replace");
    let seed = ledger
        .snapshot()
        .reference
        .seed(1, Default::default())
        .expect("seed");
    ledger
        .dispatch(LedgerAction::AddFromFullList {
            name: seed.name,
            old_price: seed.old_price,
            foreign_price: seed.cny_price,
        })
        .expect("add from list");

    let clay = ledger.snapshot().product("Clay").expect("Clay seeded");
    assert_eq!(clay.old_price, "9.90");
    assert_eq!(clay.cny_price, "16.00");
    assert!(ledger.snapshot().overrides.cny.is_empty());
    assert!(matches!(recording.take().as_slice(), [RemoteOp::Insert { pending: None, .. }]));

    let exported = ImportService::write_reference(&CsvCodec, &ledger.snapshot().reference)
        .expect("export");
    let reparsed = CsvCodec.parse(&exported).expect("parse");
    assert_eq!(reparsed[0], vec!["Name", "RM", "CNY"]);
}

#[test]
fn rate_change_is_visible_in_every_derived_read() {
    let (mut ledger, _) = ledger_with(Arc::new(MemoryCache::new()));
    ledger
        .dispatch(LedgerAction::ReplacePrimary {
            products: vec![Product::new("X", "30.00", "50.00")],
            overrides: Overrides::default(),
        })
        .expect("replace");
    ledger.dispatch(commit("X", "40", 3)).expect("commit");

    ledger
        .dispatch(LedgerAction::UpdateRate("4".into()))
        .expect("rate");
    let row = ledger.snapshot().priced_row("X").expect("row");

    assert_eq!(row.new_local.map(format_money).as_deref(), Some("10.00"));
    assert_eq!(row.savings.map(format_money).as_deref(), Some("20.00"));
    assert_eq!(row.total_value.map(format_money).as_deref(), Some("30.00"));
    assert_eq!(format_money(ledger.snapshot().order_list().total_value), "30.00");
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn stock_usage_draws_down_running_balance_and_prunes_log() {
    init_test_tracing();
    let remote = memory_store();
    let today = day(2026, 3, 20);
    for (name, balance) in [("Oil", 10), ("Clay", 2)] {
        remote
            .insert(
                STOCK_BALANCE_TABLE,
                &row(json!({COL_NAME: name, COL_BALANCE: balance})),
            )
            .expect("seed balance");
    }
    for date in [day(2026, 2, 28), day(2026, 3, 17)] {
        remote
            .insert(
                STOCK_LOG_TABLE,
                &row(json!({
                    COL_DATE: date.to_string(),
                    COL_NAME: "Oil",
                    COL_TYPE: "Staff",
                    COL_QTY: 1,
                    COL_ENDING_BALANCE: 10
                })),
            )
            .expect("seed log");
    }
    let service = StockService::new(remote.clone());

    let snapshot = service
        .submit_usage(
            &[
                UsageEntry::new("Oil", UsageKind::SalonUse, 3),
                UsageEntry::new("", UsageKind::Staff, 1),
                UsageEntry::new("Oil", UsageKind::Customer, 2),
                UsageEntry::new("Clay", UsageKind::Staff, 0),
                UsageEntry::new("Clay", UsageKind::Staff, 5),
            ],
            today,
        )
        .expect("submit should succeed");

    let balances: Vec<(&str, i64)> = snapshot
        .balances
        .iter()
        .map(|b| (b.product_name.as_str(), b.balance))
        .collect();
    assert_eq!(balances, vec![("Clay", -3), ("Oil", 5)]);
    assert_eq!(snapshot.balances[0].level(), StockLevel::Out);

    let log: Vec<(NaiveDate, &str, i64)> = snapshot
        .log
        .iter()
        .map(|e| (e.date, e.product_name.as_str(), e.ending_balance))
        .collect();
    assert_eq!(
        log,
        vec![
            (today, "Clay", -3),
            (today, "Oil", 5),
            (today, "Oil", 7),
            (day(2026, 3, 17), "Oil", 10),
        ]
    );
    assert_eq!(snapshot.log[1].kind, "Customer");
    assert_eq!(remote.select_all(STOCK_LOG_TABLE).expect("select").len(), 4);
}

#[test]
fn stock_submit_with_only_blank_lines_writes_nothing() {
    let remote = memory_store();
    let service = StockService::new(remote.clone());
    let snapshot = service
        .submit_usage(&[UsageEntry::new(" ", UsageKind::Staff, 2)], day(2026, 3, 20))
        .expect("submit should succeed");
    assert!(snapshot.log.is_empty());
    assert!(remote.select_all(STOCK_LOG_TABLE).expect("select").is_empty());
}

#[test]
fn file_backed_cache_and_store_survive_restart() {
    let dir = unique_test_dir("restart");
    let cache_dir = dir.join("cache");
    let db_path = dir.join("remote.sqlite");

    {
        let cache = Arc::new(FileCache::open(&cache_dir).expect("cache should open"));
        let remote = Arc::new(SqliteTableStore::open(&db_path).expect("store should open"));
        let sync = Arc::new(RemoteSync::spawn(remote.clone()));
        let mut ledger = LedgerStore::new(cache, sync.clone(), 2.0);
        ledger.load(remote.as_ref());
        ledger
            .dispatch(LedgerAction::AddNewProduct {
                name: "Mist".into(),
                foreign_price: "8".into(),
                qty: 1,
            })
            .expect("add");
        sync.flush();
        sync.shutdown();
    }

    let cache = Arc::new(FileCache::open(&cache_dir).expect("cache should reopen"));
    let remote = SqliteTableStore::open(&db_path).expect("store should reopen");
    let mut ledger = LedgerStore::new(cache, Arc::new(RecordingDispatch::default()), 2.0);
    ledger.load(&remote);

    assert_eq!(ledger.phase(), LoadPhase::RemoteReconciled);
    assert_eq!(names(ledger.snapshot()), vec!["Mist"]);
    assert!(ledger.snapshot().product("Mist").expect("Mist").is_new);
    assert_eq!(ledger.snapshot().overrides.price("Mist"), Some("8.00"));
}
