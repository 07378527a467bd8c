use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::usecase::ports::store::{value_text, Filter, Row, StoreError, TableStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hosted table API speaking the PostgREST dialect: one resource per table,
/// filters as `column=op.value` query pairs.
pub struct RestTableStore {
    http: Client,
    base: Url,
    api_key: String,
}

fn filter_pair(filter: &Filter) -> (String, String) {
    let op = match filter {
        Filter::Eq(..) => "eq",
        Filter::Lt(..) => "lt",
        Filter::Gte(..) => "gte",
    };
    (
        filter.column().to_string(),
        format!("{op}.{}", value_text(filter.value())),
    )
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Message(format!("remote request failed: {err}"))
}

fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(StoreError::Status {
        code: status.as_u16(),
        body,
    })
}

fn rows_of(response: Response) -> Result<Vec<Row>, StoreError> {
    let values: Vec<Value> = response
        .json()
        .map_err(|err| StoreError::Message(format!("unreadable remote rows: {err}")))?;
    Ok(values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect())
}

impl RestTableStore {
    /// `base_url` is the project root; requests go to `<base_url>/rest/v1/<table>`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid remote url: {base_url}"))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("remote url cannot be a base: {base_url}"));
        }
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base,
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Message("remote url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        Ok(url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        table: &str,
        filters: &[Filter],
    ) -> Result<RequestBuilder, StoreError> {
        let pairs: Vec<(String, String)> = filters.iter().map(filter_pair).collect();
        Ok(self
            .http
            .request(method, self.table_url(table)?)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&pairs))
    }
}

impl TableStore for RestTableStore {
    fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Row>, StoreError> {
        debug!(table, filters = filters.len(), "remote select");
        let response = self
            .request(reqwest::Method::GET, table, filters)?
            .query(&[("select", "*")])
            .send()
            .map_err(transport)?;
        rows_of(check(response)?)
    }

    fn insert(&self, table: &str, row: &Row) -> Result<(), StoreError> {
        debug!(table, "remote insert");
        let response = self
            .request(reqwest::Method::POST, table, &[])?
            .header("Prefer", "return=minimal")
            .json(&[row])
            .send()
            .map_err(transport)?;
        check(response).map(|_| ())
    }

    fn update(&self, table: &str, filters: &[Filter], patch: &Row) -> Result<usize, StoreError> {
        debug!(table, filters = filters.len(), "remote update");
        let response = self
            .request(reqwest::Method::PATCH, table, filters)?
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .map_err(transport)?;
        Ok(rows_of(check(response)?)?.len())
    }

    fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, StoreError> {
        debug!(table, filters = filters.len(), "remote delete");
        let response = self
            .request(reqwest::Method::DELETE, table, filters)?
            .header("Prefer", "return=representation")
            .send()
            .map_err(transport)?;
        Ok(rows_of(check(response)?)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_use_postgrest_operators() {
        assert_eq!(
            filter_pair(&Filter::eq("Product Name", "Rose Oil")),
            ("Product Name".to_string(), "eq.Rose Oil".to_string())
        );
        assert_eq!(
            filter_pair(&Filter::lt("Date", "2026-03-01")),
            ("Date".to_string(), "lt.2026-03-01".to_string())
        );
        assert_eq!(
            filter_pair(&Filter::gte("Qty", 3)),
            ("Qty".to_string(), "gte.3".to_string())
        );
    }

    #[test]
    fn table_names_are_path_encoded() {
        let store = RestTableStore::new("https://example.test/", "key").expect("store should build");
        let url = store.table_url("Price List").expect("url should build");
        assert_eq!(url.as_str(), "https://example.test/rest/v1/Price%20List");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(RestTableStore::new("not a url", "key").is_err());
    }
}
