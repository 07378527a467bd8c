use std::cmp::Ordering;

use serde_json::{Map, Value};

/// One remote row: column name to JSON value, in column order.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Message(String),
    Status { code: u16, body: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Message(message) => write!(f, "{message}"),
            StoreError::Status { code, body } => write!(f, "remote store returned {code}: {body}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        StoreError::Message(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Lt(String, Value),
    Gte(String, Value),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lt(column.to_string(), value.into())
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(column.to_string(), value.into())
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::Lt(column, _) | Filter::Gte(column, _) => column,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Filter::Eq(_, value) | Filter::Lt(_, value) | Filter::Gte(_, value) => value,
        }
    }

    /// Evaluates the filter against a row; a missing column never matches.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(self.column()) else {
            return false;
        };
        match self {
            Filter::Eq(_, expected) => compare_values(actual, expected) == Some(Ordering::Equal),
            Filter::Lt(_, bound) => compare_values(actual, bound) == Some(Ordering::Less),
            Filter::Gte(_, bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        }
    }
}

/// Numbers compare numerically, everything else by its text form.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        _ => Some(value_text(a).cmp(&value_text(b))),
    }
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Row-oriented CRUD over named tables of a hosted relational backend.
pub trait TableStore: Send + Sync {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError>;
    fn insert(&self, table: &str, row: &Row) -> Result<(), StoreError>;
    /// Merges `patch` into every matching row; returns the number of rows touched.
    fn update(&self, table: &str, filters: &[Filter], patch: &Row) -> Result<usize, StoreError>;
    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, StoreError>;

    fn select_all(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        self.select(table, &[])
    }

    /// Update by key column, inserting when nothing matched.
    fn upsert(&self, table: &str, key_column: &str, row: &Row) -> Result<(), StoreError> {
        let key = row
            .get(key_column)
            .cloned()
            .ok_or_else(|| StoreError::Message(format!("row is missing key column {key_column}")))?;
        let touched = self.update(table, &[Filter::Eq(key_column.to_string(), key)], row)?;
        if touched == 0 {
            self.insert(table, row)?;
        }
        Ok(())
    }
}
