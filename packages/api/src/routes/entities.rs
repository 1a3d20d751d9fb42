use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use lambda_http::tracing::{debug, error};
use serde_json::Value;
use shared::models::entity::{Entity, Page};
use shared::repositories::etag::quote_etag;

use crate::{
    error::ApiError,
    middleware::{auth::AuthenticatedUser, preconditions::ConditionalHeaders},
    routes::{created_response, put_status, versioned_response, ListParams},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entities", get(list_entities).post(create_entity))
        .route(
            "/entities/{id}",
            get(get_entity)
                .head(head_entity)
                .put(put_entity)
                .patch(patch_entity)
                .delete(delete_entity),
        )
}

async fn list_entities(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Entity>>, ApiError> {
    state
        .entity_service
        .list(
            params.prefix.as_deref().unwrap_or(""),
            params.limit,
            params.cursor.as_deref(),
        )
        .await
        .map(Json)
        .map_err(ApiError::from)
}

async fn create_entity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(data): Json<Value>,
) -> Result<Response, ApiError> {
    let entity = state.entity_service.create(data).await.map_err(|e| {
        error!("Failed to create entity for {}: {}", user.user_id, e);
        ApiError::from(e)
    })?;
    debug!("Entity {} created by {}", entity.id, user.user_id);
    Ok(created_response(
        format!("/entities/{}", entity.id),
        entity.etag.as_deref(),
        &entity,
    ))
}

async fn get_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
) -> Result<Response, ApiError> {
    let entity = state.entity_service.get(&id, preconditions).await?;
    Ok(versioned_response(
        StatusCode::OK,
        entity.etag.as_deref(),
        &entity,
    ))
}

async fn head_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let metadata = state.entity_service.metadata(&id, preconditions).await?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&quote_etag(&metadata.etag)) {
        headers.insert(header::ETAG, value);
    }
    if let Some(last_modified) = metadata.last_modified {
        let http_date = last_modified
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        if let Ok(value) = HeaderValue::from_str(&http_date) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }
    Ok((StatusCode::OK, headers))
}

async fn put_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    user: AuthenticatedUser,
    Json(data): Json<Value>,
) -> Result<Response, ApiError> {
    let status = put_status(preconditions.if_none_match.as_deref());
    let entity = state.entity_service.put(&id, data, preconditions).await?;
    debug!("Entity {} replaced by {}", id, user.user_id);
    Ok(versioned_response(status, entity.etag.as_deref(), &entity))
}

async fn patch_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    user: AuthenticatedUser,
    Json(patch): Json<Value>,
) -> Result<Response, ApiError> {
    let entity = state.entity_service.patch(&id, patch, preconditions).await?;
    debug!("Entity {} patched by {}", id, user.user_id);
    Ok(versioned_response(
        StatusCode::OK,
        entity.etag.as_deref(),
        &entity,
    ))
}

async fn delete_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.entity_service.delete(&id, preconditions).await?;
    debug!("Entity {} deleted by {}", id, user.user_id);
    Ok(StatusCode::NO_CONTENT)
}
