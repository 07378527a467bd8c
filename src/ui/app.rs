use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use dioxus::prelude::*;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::domain::entities::product::{PriceMode, PricedRow};
use crate::domain::entities::reference::ReferenceColumns;
use crate::domain::entities::sort::{SortColumn, SortDirection};
use crate::domain::entities::stock::{StockLevel, UsageEntry, UsageKind};
use crate::domain::pricing::{format_money, parse_decimal, parse_quantity};
use crate::platform::desktop::blocking::run_blocking;
use crate::ui::state::app_state::{blank_usage_lines, AppState, Page, UsageLine};
use crate::usecase::ports::store::{StoreError, TableStore};
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::ledger::LedgerAction;
use crate::usecase::services::ledger_store::{LedgerStore, LoadPhase, RemoteFetch};
use crate::usecase::services::stock_service::{filter_balances, StockService};
use crate::usecase::services::sync::RemoteSync;

const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "ods", "csv"];
const REFERENCE_PREVIEW_ROWS: usize = 50;

/// Everything the view talks to, built once per window.
pub struct Runtime {
    pub store: Arc<dyn TableStore>,
    pub sync: Arc<RemoteSync>,
    pub ledger: RefCell<LedgerStore>,
    pub stock: StockService,
}

pub fn build_runtime(config: &AppConfig) -> Result<Runtime> {
    let cache = config.open_cache()?;
    let store = config.open_store()?;
    let sync = Arc::new(RemoteSync::spawn(store.clone()));
    let mut ledger = LedgerStore::new(cache, sync.clone(), config.default_rate);
    run_blocking("cache load", || ledger.load_cache());
    Ok(Runtime {
        stock: StockService::new(store.clone()),
        store,
        sync,
        ledger: RefCell::new(ledger),
    })
}

fn pick_spreadsheet() -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Spreadsheet", &SPREADSHEET_EXTENSIONS)
        .pick_file()
}

fn save_spreadsheet(default_name: &str) -> Option<PathBuf> {
    FileDialog::new()
        .add_filter("Spreadsheet", &SPREADSHEET_EXTENSIONS)
        .set_file_name(default_name)
        .save_file()
}

fn confirm(title: &str, description: &str) -> bool {
    MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::YesNo)
        .show()
        == MessageDialogResult::Yes
}

fn money(value: Option<f64>) -> String {
    value.map(format_money).unwrap_or_default()
}

fn sort_marker(current: Option<(SortColumn, SortDirection)>, column: SortColumn) -> &'static str {
    match current {
        Some((active, SortDirection::Asc)) if active == column => " ▲",
        Some((active, SortDirection::Desc)) if active == column => " ▼",
        _ => "",
    }
}

const PRICE_HEADERS: [(SortColumn, &str); 9] = [
    (SortColumn::Name, "Product"),
    (SortColumn::OldPrice, "Old (RM)"),
    (SortColumn::CnyPrice, "China (CNY)"),
    (SortColumn::NewCny, "New (CNY)"),
    (SortColumn::NewLocal, "New (RM)"),
    (SortColumn::Savings, "Savings (RM)"),
    (SortColumn::Quantity, "Qty"),
    (SortColumn::TotalValue, "Total (RM)"),
    (SortColumn::OfficeStock, "Office"),
];

#[component]
pub fn App() -> Element {
    let runtime = use_hook(|| {
        AppConfig::from_env()
            .and_then(|config| build_runtime(&config))
            .map(Rc::new)
            .map_err(|err| format!("{err:#}"))
    });
    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(err) => {
            return rsx! {
                div { p { "Unable to start: {err}" } }
            };
        }
    };
    use_context_provider(|| runtime.clone());

    let initial = runtime.ledger.borrow().snapshot().clone();
    let initial_phase = runtime.ledger.borrow().phase();
    let state = AppState::new(initial, initial_phase);
    let mut ledger_signal = state.ledger;
    let subscribe_runtime = runtime.clone();
    use_hook(move || {
        subscribe_runtime
            .ledger
            .borrow_mut()
            .subscribe(move |snapshot| ledger_signal.set(snapshot.clone()))
    });

    // The window paints from the cache; remote rows replace it when they land.
    let fetch_runtime = runtime.clone();
    let mut phase_signal = state.phase;
    use_hook(move || {
        spawn(async move {
            let store = fetch_runtime.store.clone();
            let fetched = tokio::task::spawn_blocking(move || RemoteFetch::fetch(store.as_ref()))
                .await
                .unwrap_or_else(|err| {
                    error!(%err, "remote load task failed");
                    let message = format!("remote load task failed: {err}");
                    RemoteFetch {
                        prices: Err(StoreError::Message(message.clone())),
                        reference: Err(StoreError::Message(message)),
                    }
                });
            let mut ledger = fetch_runtime.ledger.borrow_mut();
            ledger.apply_remote(fetched);
            phase_signal.set(ledger.phase());
        });
    });
    let phase = (state.phase)();

    let mut page = state.page;
    let status = state.status;
    let phase_note = match phase {
        LoadPhase::RemoteFetchFailed => "offline: showing cached data",
        LoadPhase::RemoteReconciled => "synced",
        LoadPhase::CacheLoaded | LoadPhase::Uninitialized => "loading",
    };

    rsx! {
        div {
            style: "font-family: sans-serif; padding: 12px; display: flex; flex-direction: column; gap: 12px;",
            div {
                style: "display: flex; gap: 8px; align-items: center;",
                button { onclick: move |_| page.set(Page::Prices), "Prices" }
                button { onclick: move |_| page.set(Page::Stock), "Stock" }
                span { style: "color: #666;", "{status} ({phase_note})" }
            }
            {match page() {
                Page::Prices => rsx! { PricesPage { state } },
                Page::Stock => rsx! { StockPage { state } },
            }}
        }
    }
}

fn dispatch(runtime: &Runtime, state: AppState, action: LedgerAction) -> bool {
    let mut validation = state.validation;
    match runtime.ledger.borrow_mut().dispatch(action) {
        Ok(()) => {
            validation.set(None);
            true
        }
        Err(err) => {
            validation.set(Some(err.to_string()));
            false
        }
    }
}

#[component]
fn PricesPage(state: AppState) -> Element {
    let runtime = use_context::<Rc<Runtime>>();
    let ledger = state.ledger.read().clone();
    let rows = ledger.priced_rows();
    let current_sort = ledger.sort.map(|spec| (spec.column, spec.direction));
    let validation = state.validation.read().clone();
    let mut status = state.status;
    let mut rate_input = state.rate_input;

    let rt_rate = runtime.clone();
    let rt_import = runtime.clone();
    let rt_export = runtime.clone();
    let rt_save = runtime.clone();
    let rt_clear = runtime.clone();

    rsx! {
        div {
            style: "display: flex; gap: 8px; align-items: center; flex-wrap: wrap;",
            label { "Rate (CNY per RM) " }
            input {
                value: "{rate_input}",
                oninput: move |event| rate_input.set(event.value()),
                onchange: move |event| {
                    dispatch(&rt_rate, state, LedgerAction::UpdateRate(event.value()));
                },
            }
            button {
                onclick: move |_| {
                    let Some(path) = pick_spreadsheet() else { return };
                    match run_blocking("import prices", || ImportService::import_prices(&path)) {
                        Ok(sheet) => {
                            let count = sheet.products.len();
                            if dispatch(&rt_import, state, sheet.into_action()) {
                                status.set(format!("Imported {count} products"));
                            }
                        }
                        Err(err) => {
                            error!(err = %format!("{err:#}"), "import failed");
                            status.set(format!("Import failed: {err:#}"));
                        }
                    }
                },
                "Import"
            }
            button {
                onclick: move |_| {
                    let Some(path) = save_spreadsheet("price-list.xlsx") else { return };
                    let snapshot = rt_export.ledger.borrow().snapshot().clone();
                    match run_blocking("export prices", || ImportService::export_prices(&path, &snapshot)) {
                        Ok(()) => status.set(format!("Exported to {}", path.display())),
                        Err(err) => status.set(format!("Export failed: {err:#}")),
                    }
                },
                "Export"
            }
            button {
                onclick: move |_| {
                    let report = run_blocking("save all", || {
                        rt_save.ledger.borrow().save_all(rt_save.store.as_ref())
                    });
                    if report.is_success() {
                        status.set(format!(
                            "Saved {} products and {} reference rows",
                            report.products.written, report.reference.written
                        ));
                    } else {
                        status.set(format!(
                            "Saved with {} failures",
                            report.products.failures.len() + report.reference.failures.len()
                        ));
                    }
                },
                "Save all"
            }
            button {
                onclick: move |_| {
                    if confirm("Clear all data", "Remove every product and pending price from this machine?") {
                        dispatch(&rt_clear, state, LedgerAction::ClearAllData);
                        status.set("Cleared".to_string());
                    }
                },
                "Clear all"
            }
        }
        if let Some(message) = validation {
            p { style: "color: #b00020;", "{message}" }
        }
        div {
            style: "display: flex; gap: 16px; align-items: flex-start;",
            div {
                style: "flex: 3; overflow-x: auto;",
                SearchBar { state }
                CommitPanel { state }
                table {
                    style: "border-collapse: collapse; width: 100%;",
                    thead {
                        tr {
                            for (column, label) in PRICE_HEADERS {
                                th {
                                    style: "cursor: pointer; border-bottom: 1px solid #ccc; padding: 4px 8px; text-align: left;",
                                    onclick: {
                                        let rt = runtime.clone();
                                        move |_| {
                                            dispatch(&rt, state, LedgerAction::ToggleSort(column));
                                        }
                                    },
                                    "{label}{sort_marker(current_sort, column)}"
                                }
                            }
                            th {}
                        }
                    }
                    tbody {
                        for row in rows {
                            PriceRow { key: "{row.name}", row: row.clone(), state }
                        }
                    }
                }
            }
            div {
                style: "flex: 1; display: flex; flex-direction: column; gap: 12px;",
                AddProductForm { state }
                OrderPanel { state }
                ReferencePanel { state }
            }
        }
    }
}

#[component]
fn PriceRow(row: PricedRow, state: AppState) -> Element {
    let runtime = use_context::<Rc<Runtime>>();
    let mut selected = state.selected;
    let name = row.name.clone();
    let background = if row.is_new { "#fff8e1" } else { "transparent" };
    let remove_name = row.name.clone();
    let quantity = row.quantity.map(|qty| qty.to_string()).unwrap_or_default();
    let office_stock = row.office_stock.map(|v| v.to_string()).unwrap_or_default();

    rsx! {
        tr {
            style: "background: {background};",
            td {
                style: "padding: 4px 8px; cursor: pointer;",
                onclick: move |_| selected.set(Some(name.clone())),
                "{row.name}"
            }
            td { "{money(row.old_price)}" }
            td { "{money(row.cny_price)}" }
            td { "{money(row.new_cny)}" }
            td { "{money(row.new_local)}" }
            td { "{money(row.savings)}" }
            td { "{quantity}" }
            td { "{money(row.total_value)}" }
            td { "{office_stock}" }
            td {
                button {
                    onclick: move |_| {
                        if confirm("Remove product", &format!("Remove {remove_name}?")) {
                            dispatch(&runtime, state, LedgerAction::RemoveProduct { name: remove_name.clone() });
                        }
                    },
                    "✕"
                }
            }
        }
    }
}

#[component]
fn SearchBar(state: AppState) -> Element {
    let mut search = state.search;
    let mut selected = state.selected;
    let term = search.read().clone();
    let ledger = state.ledger.read().clone();
    let matches: Vec<String> = ledger.search(&term).into_iter().map(|p| p.name.clone()).collect();

    rsx! {
        div {
            input {
                placeholder: "Search products",
                value: "{term}",
                oninput: move |event| search.set(event.value()),
            }
            for name in matches {
                div {
                    key: "{name}",
                    style: "cursor: pointer; padding: 2px 6px;",
                    onclick: {
                        let name = name.clone();
                        move |_| {
                            selected.set(Some(name.clone()));
                            search.set(String::new());
                        }
                    },
                    "{name}"
                }
            }
        }
    }
}

#[component]
fn CommitPanel(state: AppState) -> Element {
    let runtime = use_context::<Rc<Runtime>>();
    let Some(name) = state.selected.read().clone() else {
        return rsx! {};
    };
    let mut price_input = state.price_input;
    let mut price_mode = state.price_mode;
    let mut bundle_qty = state.bundle_qty;
    let mut delivery = state.delivery;
    let mut order_qty = state.order_qty;
    let mut selected = state.selected;
    let is_bundle = price_mode() == PriceMode::Bundle;
    let commit_name = name.clone();
    let clear_name = name.clone();
    let rt_clear = runtime.clone();

    rsx! {
        div {
            style: "border: 1px solid #ddd; border-radius: 6px; padding: 8px; margin: 8px 0; display: flex; gap: 6px; flex-wrap: wrap; align-items: center;",
            strong { "{name}" }
            input {
                placeholder: "New price (CNY)",
                value: "{price_input}",
                oninput: move |event| price_input.set(event.value()),
            }
            label {
                input {
                    r#type: "checkbox",
                    checked: is_bundle,
                    onchange: move |event| {
                        price_mode.set(if event.checked() { PriceMode::Bundle } else { PriceMode::Unit });
                    },
                }
                " bundle"
            }
            if is_bundle {
                input {
                    placeholder: "Bundle qty",
                    value: "{bundle_qty}",
                    oninput: move |event| bundle_qty.set(event.value()),
                }
            } else {
                input {
                    placeholder: "Order qty",
                    value: "{order_qty}",
                    oninput: move |event| order_qty.set(event.value()),
                }
            }
            input {
                placeholder: "Delivery (CNY)",
                value: "{delivery}",
                oninput: move |event| delivery.set(event.value()),
            }
            button {
                onclick: move |_| {
                    let action = LedgerAction::CommitPrice {
                        name: commit_name.clone(),
                        raw_value: price_input(),
                        mode: price_mode(),
                        bundle_qty: parse_quantity(&bundle_qty()).unwrap_or(0),
                        delivery: parse_decimal(&delivery()).unwrap_or(0.0),
                        qty: parse_quantity(&order_qty()).unwrap_or(0),
                    };
                    if dispatch(&runtime, state, action) {
                        info!(product = %commit_name, "price committed from form");
                        price_input.set(String::new());
                        delivery.set(String::new());
                        selected.set(None);
                    }
                },
                "Commit"
            }
            button {
                onclick: move |_| {
                    dispatch(&rt_clear, state, LedgerAction::ClearPrice { name: clear_name.clone() });
                },
                "Clear price"
            }
        }
    }
}

#[component]
fn AddProductForm(state: AppState) -> Element {
    let runtime = use_context::<Rc<Runtime>>();
    let mut new_name = state.new_name;
    let mut new_price = state.new_price;
    let mut new_qty = state.new_qty;

    rsx! {
        div {
            style: "border: 1px solid #ddd; border-radius: 6px; padding: 8px; display: flex; flex-direction: column; gap: 4px;",
            strong { "New product" }
            input { placeholder: "Name", value: "{new_name}", oninput: move |e| new_name.set(e.value()) }
            input { placeholder: "Price (CNY)", value: "{new_price}", oninput: move |e| new_price.set(e.value()) }
            input { placeholder: "Qty", value: "{new_qty}", oninput: move |e| new_qty.set(e.value()) }
            button {
                onclick: move |_| {
                    let action = LedgerAction::AddNewProduct {
                        name: new_name(),
                        foreign_price: new_price(),
                        qty: parse_quantity(&new_qty()).unwrap_or(0),
                    };
                    if dispatch(&runtime, state, action) {
                        new_name.set(String::new());
                        new_price.set(String::new());
                        new_qty.set(String::new());
                    }
                },
                "Add"
            }
        }
    }
}

#[component]
fn OrderPanel(state: AppState) -> Element {
    let orders = state.ledger.read().order_list();
    let total = format_money(orders.total_value);

    rsx! {
        div {
            style: "border: 1px solid #ddd; border-radius: 6px; padding: 8px;",
            strong { "Order list" }
            if orders.rows.is_empty() {
                p { style: "color: #666;", "Nothing to order yet" }
            }
            for row in orders.rows {
                div {
                    key: "{row.name}",
                    "{row.name} × {row.quantity.unwrap_or(0)} @ {money(row.new_local)} = {money(row.total_value)}"
                }
            }
            p { strong { "Total: RM {total}" } }
        }
    }
}

#[component]
fn ReferencePanel(state: AppState) -> Element {
    let runtime = use_context::<Rc<Runtime>>();
    let mut filter = state.reference_filter;
    let mut status = state.status;
    let ledger = state.ledger.read().clone();
    let term = filter.read().clone();
    let visible: Vec<(usize, String)> = ledger
        .reference
        .filter(&term)
        .into_iter()
        .take(REFERENCE_PREVIEW_ROWS)
        .map(|(idx, row)| (idx, row.join(" | ")))
        .collect();
    let rt_import = runtime.clone();
    let rt_export = runtime.clone();

    rsx! {
        div {
            style: "border: 1px solid #ddd; border-radius: 6px; padding: 8px;",
            strong { "Full product list ({ledger.reference.rows.len()})" }
            div {
                button {
                    onclick: move |_| {
                        let Some(path) = pick_spreadsheet() else { return };
                        match run_blocking("import reference", || ImportService::import_reference(&path)) {
                            Ok(Some(reference)) => {
                                dispatch(&rt_import, state, LedgerAction::ReplaceReference(reference));
                            }
                            Ok(None) => status.set("Reference sheet was empty".to_string()),
                            Err(err) => status.set(format!("Import failed: {err:#}")),
                        }
                    },
                    "Import"
                }
                button {
                    onclick: move |_| {
                        let Some(path) = save_spreadsheet("full-product-list.xlsx") else { return };
                        let reference = rt_export.ledger.borrow().snapshot().reference.clone();
                        if let Err(err) = ImportService::export_reference(&path, &reference) {
                            status.set(format!("Export failed: {err:#}"));
                        }
                    },
                    "Export"
                }
            }
            input {
                placeholder: "Filter",
                value: "{term}",
                oninput: move |e| filter.set(e.value()),
            }
            for (idx, label) in visible {
                div {
                    key: "{idx}",
                    style: "display: flex; justify-content: space-between; gap: 6px;",
                    span { "{label}" }
                    button {
                        onclick: {
                            let rt = runtime.clone();
                            move |_| {
                                let seed = rt
                                    .ledger
                                    .borrow()
                                    .snapshot()
                                    .reference
                                    .seed(idx, ReferenceColumns::default());
                                if let Some(seed) = seed {
                                    dispatch(&rt, state, LedgerAction::AddFromFullList {
                                        name: seed.name,
                                        old_price: seed.old_price,
                                        foreign_price: seed.cny_price,
                                    });
                                }
                            }
                        },
                        "+"
                    }
                }
            }
        }
    }
}

#[component]
fn StockPage(state: AppState) -> Element {
    let runtime = use_context::<Rc<Runtime>>();
    let mut stock = state.stock;
    let mut status = state.status;
    let mut stock_filter = state.stock_filter;
    let mut usage_lines = state.usage_lines;

    let rt_load = runtime.clone();
    use_hook(move || {
        let today = Local::now().date_naive();
        match run_blocking("load stock", || rt_load.stock.refresh(today)) {
            Ok(snapshot) => stock.set(snapshot),
            Err(err) => status.set(format!("Stock load failed: {err}")),
        }
    });

    let snapshot = stock.read().clone();
    let term = stock_filter.read().clone();
    let balances: Vec<_> = filter_balances(&snapshot.balances, &term)
        .into_iter()
        .cloned()
        .collect();
    let lines = usage_lines.read().clone();

    rsx! {
        div {
            style: "display: flex; gap: 16px; align-items: flex-start;",
            div {
                style: "flex: 1;",
                strong { "Balances" }
                input { placeholder: "Filter", value: "{term}", oninput: move |e| stock_filter.set(e.value()) }
                for balance in balances {
                    div {
                        key: "{balance.product_name}",
                        style: match balance.level() {
                            StockLevel::Out => "color: #b00020;",
                            StockLevel::Low => "color: #b26a00;",
                            StockLevel::Ok => "",
                        },
                        "{balance.product_name}: {balance.balance}"
                    }
                }
            }
            div {
                style: "flex: 1;",
                strong { "Today's usage" }
                for (idx, line) in lines.into_iter().enumerate() {
                    div {
                        key: "{idx}",
                        input {
                            placeholder: "Product",
                            value: "{line.product_name}",
                            oninput: move |e| usage_lines.write()[idx].product_name = e.value(),
                        }
                        select {
                            value: "{line.kind.label()}",
                            onchange: move |e| {
                                if let Some(kind) = UsageKind::from_label(&e.value()) {
                                    usage_lines.write()[idx].kind = kind;
                                }
                            },
                            for kind in UsageKind::ALL {
                                option { value: "{kind.label()}", "{kind.label()}" }
                            }
                        }
                        input {
                            value: "{line.qty}",
                            oninput: move |e| usage_lines.write()[idx].qty = e.value(),
                        }
                    }
                }
                button { onclick: move |_| usage_lines.write().push(UsageLine::default()), "Add line" }
                button {
                    onclick: move |_| {
                        let entries: Vec<UsageEntry> = usage_lines
                            .read()
                            .iter()
                            .map(|line| UsageEntry::new(
                                line.product_name.clone(),
                                line.kind,
                                parse_quantity(&line.qty).map(i64::from).unwrap_or(0),
                            ))
                            .collect();
                        let today = Local::now().date_naive();
                        match run_blocking("submit usage", || runtime.stock.submit_usage(&entries, today)) {
                            Ok(snapshot) => {
                                stock.set(snapshot);
                                usage_lines.set(blank_usage_lines());
                                status.set("Usage recorded".to_string());
                            }
                            Err(err) => status.set(format!("Submit failed: {err}")),
                        }
                    },
                    "Submit"
                }
                strong { "Last 14 days" }
                for (idx, entry) in snapshot.log.into_iter().enumerate() {
                    div {
                        key: "{idx}",
                        "{entry.date} {entry.product_name} {entry.kind} −{entry.qty} → {entry.ending_balance}"
                    }
                }
            }
        }
    }
}
