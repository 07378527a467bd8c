use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use tracing::info;

use crate::domain::pricing::parse_decimal;
use crate::infra::cache::file::FileCache;
use crate::infra::rest::store::RestTableStore;
use crate::infra::sqlite::store::SqliteTableStore;
use crate::usecase::ports::cache::BlobCache;
use crate::usecase::ports::store::TableStore;
use crate::usecase::services::ledger::DEFAULT_RATE;

pub const ENV_DATA_DIR: &str = "PRICE_LOOKUP_DATA_DIR";
pub const ENV_REMOTE_URL: &str = "PRICE_LOOKUP_REMOTE_URL";
pub const ENV_REMOTE_KEY: &str = "PRICE_LOOKUP_REMOTE_KEY";
pub const ENV_DEFAULT_RATE: &str = "PRICE_LOOKUP_DEFAULT_RATE";

const LOCAL_REMOTE_FILE: &str = "remote.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteConfig {
    Rest { url: String, api_key: String },
    LocalSqlite { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub remote: RemoteConfig,
    pub default_rate: f64,
}

pub fn default_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "boudoir", "price-lookup")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().to_path_buf())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = match non_empty(lookup(ENV_DATA_DIR)) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let remote = match (non_empty(lookup(ENV_REMOTE_URL)), non_empty(lookup(ENV_REMOTE_KEY))) {
            (Some(url), Some(api_key)) => RemoteConfig::Rest { url, api_key },
            _ => RemoteConfig::LocalSqlite {
                path: data_dir.join(LOCAL_REMOTE_FILE),
            },
        };

        let default_rate = match non_empty(lookup(ENV_DEFAULT_RATE)) {
            Some(raw) => parse_decimal(&raw)
                .filter(|rate| *rate > 0.0)
                .with_context(|| format!("{ENV_DEFAULT_RATE} must be a positive number, got {raw:?}"))?,
            None => DEFAULT_RATE,
        };

        Ok(Self {
            data_dir,
            remote,
            default_rate,
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn webview_dir(&self) -> PathBuf {
        self.data_dir.join("webview2")
    }

    pub fn open_cache(&self) -> Result<Arc<dyn BlobCache>> {
        Ok(Arc::new(FileCache::open(&self.cache_dir())?))
    }

    pub fn open_store(&self) -> Result<Arc<dyn TableStore>> {
        match &self.remote {
            RemoteConfig::Rest { url, api_key } => {
                info!(%url, "using hosted table store");
                Ok(Arc::new(RestTableStore::new(url, api_key)?))
            }
            RemoteConfig::LocalSqlite { path } => {
                info!(path = %path.display(), "using local sqlite table store");
                Ok(Arc::new(open_local_store(path)?))
            }
        }
    }
}

fn open_local_store(path: &Path) -> Result<SqliteTableStore> {
    SqliteTableStore::open(path)
        .with_context(|| format!("failed to open local store: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn remote_falls_back_to_local_sqlite() {
        let config = AppConfig::from_lookup(lookup(&[(ENV_DATA_DIR, "/tmp/pl")]))
            .expect("config should load");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pl"));
        assert_eq!(
            config.remote,
            RemoteConfig::LocalSqlite {
                path: PathBuf::from("/tmp/pl/remote.sqlite")
            }
        );
        assert_eq!(config.default_rate, DEFAULT_RATE);
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/pl/cache"));
    }

    #[test]
    fn url_and_key_select_rest_store() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/tmp/pl"),
            (ENV_REMOTE_URL, "https://example.test"),
            (ENV_REMOTE_KEY, "secret"),
            (ENV_DEFAULT_RATE, "1.65"),
        ]))
        .expect("config should load");
        assert!(matches!(config.remote, RemoteConfig::Rest { .. }));
        assert_eq!(config.default_rate, 1.65);
    }

    #[test]
    fn url_without_key_is_not_enough() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/tmp/pl"),
            (ENV_REMOTE_URL, "https://example.test"),
        ]))
        .expect("config should load");
        assert!(matches!(config.remote, RemoteConfig::LocalSqlite { .. }));
    }

    #[test]
    fn bad_rate_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            (ENV_DATA_DIR, "/tmp/pl"),
            (ENV_DEFAULT_RATE, "zero"),
        ]))
        .expect_err("non-numeric rate should fail");
        assert!(err.to_string().contains(ENV_DEFAULT_RATE));
    }
}
