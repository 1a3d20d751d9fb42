use lambda_http::{run, tracing, Error};
use std::env::set_var;
use std::sync::Arc;

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use shared::config::{AppConfig, StoreBackend};
use shared::repositories::in_memory_object_store::InMemoryObjectStore;
use shared::repositories::object_store::ObjectStore;
use shared::repositories::s3_object_store::S3ObjectStore;

#[tokio::main]
async fn main() -> Result<(), Error> {
    set_var("AWS_LAMBDA_HTTP_IGNORE_STAGE_IN_PATH", "true");

    // required to enable CloudWatch error logging by the runtime
    tracing::init_default_subscriber();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn ObjectStore> = match &config.store {
        StoreBackend::S3 { bucket } => {
            let aws_config = aws_config::load_from_env().await;
            let client = aws_sdk_s3::Client::new(&aws_config);
            tracing::info!("Serving documents from bucket {}", bucket);
            Arc::new(S3ObjectStore::new(client, bucket.clone()))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store; data is lost on restart");
            Arc::new(InMemoryObjectStore::new())
        }
    };

    let app_state = state::AppState::from_config(store, &config)?;

    run(routes::router(app_state)).await
}
