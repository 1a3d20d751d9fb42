use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repositories::errors::store_errors::StoreError;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub etag: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub metadata: ObjectMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub key: String,
    pub metadata: ObjectMetadata,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub entries: Vec<ListEntry>,
    pub next_page_token: Option<String>,
}

/// Flat key/value object storage with unconditional writes.
///
/// Implementations report a missing object as `Ok(None)` from `get` and `head`.
/// Nothing here is atomic across calls: there is no compare-and-swap.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;

    async fn head(&self, key: &str) -> Result<Option<ObjectMetadata>, StoreError>;

    /// Writes `body` under `key`, returning the new etag when the store reports one.
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        page_token: Option<String>,
    ) -> Result<ListPage, StoreError>;
}
