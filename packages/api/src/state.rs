use std::sync::Arc;

use shared::config::{AppConfig, ConfigError, ENTITIES_PREFIX, GAMES_PREFIX, USERS_PREFIX};
use shared::repositories::document_repository::ObjectStoreDocumentRepository;
use shared::repositories::key_codec::KeyCodec;
use shared::repositories::object_store::ObjectStore;
use shared::services::auth_service::AuthService;
use shared::services::entity_service::EntityService;
use shared::services::game_service::GameService;
use shared::services::user_service::UserService;

#[derive(Clone)]
pub struct AppState {
    pub entity_service: Arc<EntityService>,
    pub user_service: Arc<UserService>,
    pub game_service: Arc<GameService>,
    pub auth_service: Arc<AuthService>,
    /// Largest request body axum will buffer.
    pub request_body_limit: usize,
}

/// Headroom over the stored payload limit for pretty-printed request bodies.
/// Anything between the two limits is rejected by the repository with a
/// problem body carrying `limitBytes`.
const REQUEST_BODY_SLACK: usize = 64 * 1024;

impl AppState {
    /// Wires one repository per resource family over the shared object store.
    pub fn from_config(
        store: Arc<dyn ObjectStore>,
        config: &AppConfig,
    ) -> Result<Self, ConfigError> {
        let jwt_secret = config
            .jwt_secret
            .clone()
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let repository = |prefix: &str| {
            Arc::new(ObjectStoreDocumentRepository::new(
                store.clone(),
                KeyCodec::json(prefix),
                config.repository,
            ))
        };

        Ok(AppState {
            entity_service: Arc::new(EntityService::new(repository(ENTITIES_PREFIX))),
            user_service: Arc::new(UserService::new(repository(USERS_PREFIX))),
            game_service: Arc::new(GameService::new(repository(GAMES_PREFIX))),
            auth_service: Arc::new(AuthService::with_jwt_secret(jwt_secret)),
            request_body_limit: config
                .repository
                .max_payload_bytes
                .saturating_mul(2)
                .saturating_add(REQUEST_BODY_SLACK),
        })
    }
}
