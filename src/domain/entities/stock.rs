use chrono::NaiveDate;

/// Days of stock log kept before pruning.
pub const LOG_RETENTION_DAYS: i64 = 14;
pub const LOW_STOCK_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    SalonUse,
    Customer,
    Staff,
}

impl UsageKind {
    pub const ALL: [UsageKind; 3] = [UsageKind::SalonUse, UsageKind::Customer, UsageKind::Staff];

    pub fn label(self) -> &'static str {
        match self {
            UsageKind::SalonUse => "Salon Use",
            UsageKind::Customer => "Customer",
            UsageKind::Staff => "Staff",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockBalance {
    pub product_name: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    Out,
    Low,
    Ok,
}

impl StockBalance {
    pub fn level(&self) -> StockLevel {
        if self.balance <= 0 {
            StockLevel::Out
        } else if self.balance <= LOW_STOCK_THRESHOLD {
            StockLevel::Low
        } else {
            StockLevel::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLogEntry {
    pub date: NaiveDate,
    pub product_name: String,
    pub kind: String,
    pub qty: i64,
    pub ending_balance: i64,
}

/// One line of the daily usage form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    pub product_name: String,
    pub kind: UsageKind,
    pub qty: i64,
}

impl UsageEntry {
    pub fn new(product_name: impl Into<String>, kind: UsageKind, qty: i64) -> Self {
        Self {
            product_name: product_name.into(),
            kind,
            qty,
        }
    }

    pub fn is_submittable(&self) -> bool {
        !self.product_name.trim().is_empty() && self.qty > 0
    }
}

pub fn retention_cutoff(today: NaiveDate) -> NaiveDate {
    today - chrono::Duration::days(LOG_RETENTION_DAYS)
}
