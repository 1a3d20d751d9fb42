use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::models::entity::{to_entity, Entity, Page, Versioned};
use crate::models::user::{CreateUserRequest, ReplaceUserRequest, User};
use crate::repositories::document_repository::{DocumentRepository, Preconditions, SaveOptions};
use crate::repositories::errors::repository_errors::RepositoryError;

pub struct UserService {
    repository: Arc<dyn DocumentRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        UserService { repository }
    }

    pub async fn create_user(
        &self,
        request: CreateUserRequest,
    ) -> Result<Versioned<User>, RepositoryError> {
        let user = User::new(request.id, &request.name, request.email)?;
        let saved = self
            .repository
            .save(&to_entity(&user.id, &user)?, &SaveOptions::create_only())
            .await?;
        debug!("Created user {}", user.id);
        Versioned::from_entity(saved)
    }

    pub async fn get_user(
        &self,
        user_id: &str,
        preconditions: Preconditions,
    ) -> Result<Versioned<User>, RepositoryError> {
        let entity = self
            .repository
            .find_by_id(user_id, &preconditions.find_options())
            .await?;
        Versioned::from_entity(entity)
    }

    pub async fn replace_user(
        &self,
        user_id: &str,
        request: ReplaceUserRequest,
        preconditions: Preconditions,
    ) -> Result<Versioned<User>, RepositoryError> {
        let mut user = User::new(Some(user_id.to_string()), &request.name, request.email)?;
        if let Some(created_at) = request.created_at {
            user.created_at = created_at;
        }
        let saved = self
            .repository
            .save(&to_entity(user_id, &user)?, &preconditions.save_options(false))
            .await?;
        Versioned::from_entity(saved)
    }

    pub async fn patch_user(
        &self,
        user_id: &str,
        patch: Value,
        preconditions: Preconditions,
    ) -> Result<Versioned<User>, RepositoryError> {
        let patch = User::normalize_patch(patch)?;
        let saved = self
            .repository
            .save(&Entity::new(user_id, patch), &preconditions.save_options(true))
            .await?;
        debug!("Patched user {}", user_id);
        Versioned::from_entity(saved)
    }

    pub async fn delete_user(
        &self,
        user_id: &str,
        preconditions: Preconditions,
    ) -> Result<(), RepositoryError> {
        self.repository
            .delete(user_id, &preconditions.delete_options())
            .await?;
        debug!("Deleted user {}", user_id);
        Ok(())
    }

    pub async fn list_users(
        &self,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<Entity>, RepositoryError> {
        self.repository.find_all("", limit, cursor).await
    }
}
