use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use xxhash_rust::xxh3::xxh3_64;

use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::object_store::{
    ListEntry, ListPage, ObjectMetadata, ObjectStore, StoredObject,
};

/// Number of calls made against an [`InMemoryObjectStore`], per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub get: usize,
    pub head: usize,
    pub put: usize,
    pub delete: usize,
    pub list: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.get + self.head + self.put + self.delete + self.list
    }
}

#[derive(Default)]
struct CallCounters {
    get: AtomicUsize,
    head: AtomicUsize,
    put: AtomicUsize,
    delete: AtomicUsize,
    list: AtomicUsize,
}

/// Process-local object store keyed in lexical order.
///
/// Etags are derived from content (xxh3, quoted like S3 etags), so writing the
/// same bytes twice yields the same etag.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    calls: CallCounters,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            get: self.calls.get.load(Ordering::SeqCst),
            head: self.calls.head.load(Ordering::SeqCst),
            put: self.calls.put.load(Ordering::SeqCst),
            delete: self.calls.delete.load(Ordering::SeqCst),
            list: self.calls.list.load(Ordering::SeqCst),
        }
    }

    pub fn reset_calls(&self) {
        for counter in [
            &self.calls.get,
            &self.calls.head,
            &self.calls.put,
            &self.calls.delete,
            &self.calls.list,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn objects(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>, StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

pub fn content_etag(body: &[u8]) -> String {
    format!("\"{:016x}\"", xxh3_64(body))
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects()?.get(key).cloned())
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMetadata>, StoreError> {
        self.calls.head.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects()?.get(key).map(|object| object.metadata.clone()))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<Option<String>, StoreError> {
        self.calls.put.fetch_add(1, Ordering::SeqCst);
        let etag = content_etag(&body);
        let metadata = ObjectMetadata {
            etag: etag.clone(),
            size: body.len() as u64,
            modified_at: Some(Utc::now()),
        };
        self.objects()?
            .insert(key.to_string(), StoredObject { body, metadata });
        Ok(Some(etag))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.objects()?.remove(key);
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        page_token: Option<String>,
    ) -> Result<ListPage, StoreError> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        let objects = self.objects()?;
        // A token from another prefix must not start the scan before `prefix`.
        let start = match page_token {
            Some(token) if token.as_str() >= prefix => Bound::Excluded(token),
            _ => Bound::Included(prefix.to_string()),
        };

        let mut matching = objects
            .range((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ListEntry {
                key: key.clone(),
                metadata: object.metadata.clone(),
            });

        let entries: Vec<ListEntry> = matching.by_ref().take(max_keys).collect();
        let next_page_token = match (matching.next(), entries.last()) {
            (Some(_), Some(last)) => Some(last.key.clone()),
            _ => None,
        };

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }
}
