use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::repositories::errors::store_errors::StoreError;
use crate::repositories::object_store::{
    ListEntry, ListPage, ObjectMetadata, ObjectStore, StoredObject,
};

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

fn to_chrono(timestamp: Option<&S3DateTime>) -> Option<DateTime<Utc>> {
    timestamp.and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
}

fn require_etag(key: &str, etag: Option<&str>) -> Result<String, StoreError> {
    etag.map(str::to_string)
        .ok_or_else(|| StoreError::InvalidResponse(format!("no etag returned for {}", key)))
}

fn to_size(size: Option<i64>) -> u64 {
    size.and_then(|s| u64::try_from(s).ok()).unwrap_or(0)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    return Ok(None);
                }
                return Err(StoreError::Backend(
                    DisplayErrorContext(&service_error).to_string(),
                ));
            }
        };

        let metadata = ObjectMetadata {
            etag: require_etag(key, output.e_tag())?,
            size: to_size(output.content_length()),
            modified_at: to_chrono(output.last_modified()),
        };
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(Some(StoredObject { body, metadata }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMetadata>, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(Some(ObjectMetadata {
                etag: require_etag(key, output.e_tag())?,
                size: to_size(output.content_length()),
                modified_at: to_chrono(output.last_modified()),
            })),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(StoreError::Backend(
                        DisplayErrorContext(&service_error).to_string(),
                    ))
                }
            }
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<Option<String>, StoreError> {
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;

        if output.e_tag().is_none() {
            debug!("S3 did not return an etag for {}", key);
        }
        Ok(output.e_tag().map(str::to_string))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn list(
        &self,
        prefix: &str,
        max_keys: usize,
        page_token: Option<String>,
    ) -> Result<ListPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX))
            .set_continuation_token(page_token)
            .send()
            .await
            .map_err(|e| StoreError::Backend(DisplayErrorContext(&e).to_string()))?;

        let mut entries = Vec::with_capacity(output.contents().len());
        for object in output.contents() {
            let Some(key) = object.key() else {
                continue;
            };
            entries.push(ListEntry {
                key: key.to_string(),
                metadata: ObjectMetadata {
                    etag: require_etag(key, object.e_tag())?,
                    size: to_size(object.size()),
                    modified_at: to_chrono(object.last_modified()),
                },
            });
        }

        let next_page_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }
}
