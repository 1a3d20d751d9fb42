use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use lambda_http::tracing::{debug, error};
use serde_json::Value;
use shared::models::entity::{Entity, Page};
use shared::models::user::{CreateUserRequest, ReplaceUserRequest};

use crate::{
    error::ApiError,
    middleware::{auth::AuthenticatedUser, preconditions::ConditionalHeaders},
    routes::{created_response, put_status, versioned_response, ListParams},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user)
                .put(replace_user)
                .patch(patch_user)
                .delete(delete_user),
        )
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Entity>>, ApiError> {
    state
        .user_service
        .list_users(params.limit, params.cursor.as_deref())
        .await
        .map(Json)
        .map_err(ApiError::from)
}

async fn create_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<Response, ApiError> {
    let user = state.user_service.create_user(request).await.map_err(|e| {
        error!("Failed to create user for {}: {}", caller.user_id, e);
        ApiError::from(e)
    })?;
    debug!("User {} created by {}", user.value.id, caller.user_id);
    Ok(created_response(
        format!("/users/{}", user.value.id),
        user.etag.as_deref(),
        &user.value,
    ))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
) -> Result<Response, ApiError> {
    let user = state.user_service.get_user(&id, preconditions).await?;
    Ok(versioned_response(
        StatusCode::OK,
        user.etag.as_deref(),
        &user.value,
    ))
}

async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
    Json(request): Json<ReplaceUserRequest>,
) -> Result<Response, ApiError> {
    let status = put_status(preconditions.if_none_match.as_deref());
    let user = state
        .user_service
        .replace_user(&id, request, preconditions)
        .await?;
    debug!("User {} replaced by {}", id, caller.user_id);
    Ok(versioned_response(status, user.etag.as_deref(), &user.value))
}

async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
    Json(patch): Json<Value>,
) -> Result<Response, ApiError> {
    let user = state
        .user_service
        .patch_user(&id, patch, preconditions)
        .await?;
    debug!("User {} patched by {}", id, caller.user_id);
    Ok(versioned_response(
        StatusCode::OK,
        user.etag.as_deref(),
        &user.value,
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConditionalHeaders(preconditions): ConditionalHeaders,
    caller: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state
        .user_service
        .delete_user(&id, preconditions)
        .await
        .map_err(|e| {
            error!("Failed to delete user {}: {}", id, e);
            ApiError::from(e)
        })?;
    debug!("User {} deleted by {}", id, caller.user_id);
    Ok(StatusCode::NO_CONTENT)
}
