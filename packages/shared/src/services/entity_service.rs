use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::models::entity::{DocumentMetadata, Entity, Page};
use crate::repositories::document_repository::{DocumentRepository, Preconditions, SaveOptions};
use crate::repositories::errors::repository_errors::RepositoryError;
use crate::repositories::etag::etag_matches;

/// Free-form JSON documents with no shape beyond being valid JSON.
#[derive(Clone)]
pub struct EntityService {
    repository: Arc<dyn DocumentRepository>,
}

impl EntityService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        EntityService { repository }
    }

    pub async fn get(
        &self,
        id: &str,
        preconditions: Preconditions,
    ) -> Result<Entity, RepositoryError> {
        self.repository
            .find_by_id(id, &preconditions.find_options())
            .await
    }

    /// Version information only. `If-None-Match` is honoured the same way as
    /// for [`EntityService::get`].
    pub async fn metadata(
        &self,
        id: &str,
        preconditions: Preconditions,
    ) -> Result<DocumentMetadata, RepositoryError> {
        let metadata = self.repository.get_metadata(id).await?;
        if let Some(condition) = preconditions.if_none_match.as_deref() {
            if etag_matches(condition, &metadata.etag) {
                return Err(RepositoryError::NotModified(metadata.etag));
            }
        }
        Ok(metadata)
    }

    /// Stores `data` under a freshly generated id.
    pub async fn create(&self, data: Value) -> Result<Entity, RepositoryError> {
        let entity = Entity::new(Uuid::new_v4().to_string(), data);
        self.repository
            .save(&entity, &SaveOptions::create_only())
            .await
    }

    /// Replaces the document verbatim. Without preconditions this is an upsert.
    pub async fn put(
        &self,
        id: &str,
        data: Value,
        preconditions: Preconditions,
    ) -> Result<Entity, RepositoryError> {
        self.repository
            .save(&Entity::new(id, data), &preconditions.save_options(false))
            .await
    }

    pub async fn patch(
        &self,
        id: &str,
        patch: Value,
        preconditions: Preconditions,
    ) -> Result<Entity, RepositoryError> {
        self.repository
            .save(&Entity::new(id, patch), &preconditions.save_options(true))
            .await
    }

    pub async fn delete(
        &self,
        id: &str,
        preconditions: Preconditions,
    ) -> Result<(), RepositoryError> {
        self.repository
            .delete(id, &preconditions.delete_options())
            .await
    }

    pub async fn list(
        &self,
        prefix: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<Entity>, RepositoryError> {
        self.repository.find_all(prefix, limit, cursor).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        self.repository.exists(id).await
    }
}
