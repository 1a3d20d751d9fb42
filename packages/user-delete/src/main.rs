use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use shared::config::{AppConfig, StoreBackend, USERS_PREFIX};
use shared::repositories::document_repository::{ObjectStoreDocumentRepository, Preconditions};
use shared::repositories::errors::repository_errors::RepositoryError;
use shared::repositories::in_memory_object_store::InMemoryObjectStore;
use shared::repositories::key_codec::KeyCodec;
use shared::repositories::object_store::ObjectStore;
use shared::repositories::s3_object_store::S3ObjectStore;
use shared::services::user_service::UserService;

#[derive(Deserialize)]
struct EventBridgeEvent {
    detail: Detail,
}

#[derive(Deserialize)]
struct Detail {
    #[serde(rename = "userName")]
    user_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt().init();

    let config = AppConfig::from_env()?;
    let store: Arc<dyn ObjectStore> = match &config.store {
        StoreBackend::S3 { bucket } => {
            let aws_config = aws_config::load_from_env().await;
            Arc::new(S3ObjectStore::new(
                aws_sdk_s3::Client::new(&aws_config),
                bucket.clone(),
            ))
        }
        StoreBackend::Memory => Arc::new(InMemoryObjectStore::new()),
    };
    let repository = ObjectStoreDocumentRepository::new(
        store,
        KeyCodec::json(USERS_PREFIX),
        config.repository,
    );
    let user_service = Arc::new(UserService::new(Arc::new(repository)));

    run(service_fn(move |event: LambdaEvent<EventBridgeEvent>| {
        let user_service = user_service.clone();
        async move { user_delete_handler(&user_service, event.payload).await }
    }))
    .await
}

async fn user_delete_handler(
    user_service: &UserService,
    event: EventBridgeEvent,
) -> Result<(), Error> {
    let user_id = event.detail.user_name;

    info!("Deleting user: {}", user_id);

    match user_service
        .delete_user(&user_id, Preconditions::default())
        .await
    {
        Ok(()) => {
            info!("User deleted successfully: {}", user_id);
            Ok(())
        }
        Err(RepositoryError::NotFound(_)) => {
            warn!("User {} was already deleted", user_id);
            Ok(())
        }
        Err(e) => Err(Error::from(format!(
            "Failed to delete user {}: {}",
            user_id, e
        ))),
    }
}
