pub const KEY_RATE: &str = "exchangeRate";
pub const KEY_PRICE_DATA: &str = "priceLookupData";
pub const KEY_NEW_PRODUCTS: &str = "newProducts";
pub const KEY_FULL_LIST_HEADERS: &str = "fullListHeaders";
pub const KEY_FULL_LIST_DATA: &str = "fullListData";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    Message(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Message(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Scoped string key/value blob store kept on the local machine.
pub trait BlobCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}
