use dioxus::prelude::{use_signal, Signal};

use crate::domain::entities::product::PriceMode;
use crate::domain::entities::stock::UsageKind;
use crate::usecase::services::ledger::LedgerState;
use crate::usecase::services::ledger_store::LoadPhase;
use crate::usecase::services::stock_service::StockSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Prices,
    Stock,
}

/// One editable line of the daily usage form.
#[derive(Clone, Debug, PartialEq)]
pub struct UsageLine {
    pub product_name: String,
    pub kind: UsageKind,
    pub qty: String,
}

impl Default for UsageLine {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            kind: UsageKind::SalonUse,
            qty: "1".to_string(),
        }
    }
}

pub const BLANK_USAGE_LINES: usize = 5;

pub fn blank_usage_lines() -> Vec<UsageLine> {
    vec![UsageLine::default(); BLANK_USAGE_LINES]
}

/// Every field is a signal handle, so the whole state is `Copy` and can be
/// handed to child components as a prop.
#[derive(Clone, Copy, PartialEq)]
pub struct AppState {
    pub page: Signal<Page>,
    pub ledger: Signal<LedgerState>,
    pub phase: Signal<LoadPhase>,
    pub status: Signal<String>,
    pub busy: Signal<bool>,
    pub rate_input: Signal<String>,
    pub search: Signal<String>,
    pub selected: Signal<Option<String>>,
    pub price_input: Signal<String>,
    pub price_mode: Signal<PriceMode>,
    pub bundle_qty: Signal<String>,
    pub delivery: Signal<String>,
    pub order_qty: Signal<String>,
    pub new_name: Signal<String>,
    pub new_price: Signal<String>,
    pub new_qty: Signal<String>,
    pub validation: Signal<Option<String>>,
    pub reference_filter: Signal<String>,
    pub stock: Signal<StockSnapshot>,
    pub stock_filter: Signal<String>,
    pub usage_lines: Signal<Vec<UsageLine>>,
}

impl AppState {
    pub fn new(initial: LedgerState, phase: LoadPhase) -> Self {
        let rate = initial.rate.to_string();
        Self {
            page: use_signal(|| Page::Prices),
            ledger: use_signal(move || initial),
            phase: use_signal(move || phase),
            status: use_signal(|| "Ready".to_string()),
            busy: use_signal(|| false),
            rate_input: use_signal(move || rate),
            search: use_signal(String::new),
            selected: use_signal(|| None::<String>),
            price_input: use_signal(String::new),
            price_mode: use_signal(PriceMode::default),
            bundle_qty: use_signal(String::new),
            delivery: use_signal(String::new),
            order_qty: use_signal(String::new),
            new_name: use_signal(String::new),
            new_price: use_signal(String::new),
            new_qty: use_signal(String::new),
            validation: use_signal(|| None::<String>),
            reference_filter: use_signal(String::new),
            stock: use_signal(StockSnapshot::default),
            stock_filter: use_signal(String::new),
            usage_lines: use_signal(blank_usage_lines),
        }
    }
}
