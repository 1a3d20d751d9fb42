use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::repositories::etag::quote_etag;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

pub mod entities;
pub mod games;
pub mod health;
pub mod users;


#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
    pub prefix: Option<String>,
}

pub fn router(state: AppState) -> Router {
    // Conditional request headers must be readable and settable from browsers.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::ETAG, header::LOCATION]);
    let body_limit = DefaultBodyLimit::max(state.request_body_limit);

    Router::new()
        .route("/health", get(health::health_check))
        .merge(entities::routes())
        .merge(users::routes())
        .merge(games::routes())
        .layer(body_limit)
        .layer(cors)
        .with_state(state)
}

fn etag_headers(etag: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(value) = etag.and_then(|e| HeaderValue::from_str(&quote_etag(e)).ok()) {
        headers.insert(header::ETAG, value);
    }
    headers
}

/// JSON response carrying the document version in an `ETag` header.
pub(crate) fn versioned_response<T: Serialize>(
    status: StatusCode,
    etag: Option<&str>,
    body: &T,
) -> Response {
    (status, etag_headers(etag), Json(body)).into_response()
}

/// `201 Created` with `Location` and `ETag`.
pub(crate) fn created_response<T: Serialize>(
    location: String,
    etag: Option<&str>,
    body: &T,
) -> Response {
    let mut headers = etag_headers(etag);
    if let Ok(value) = HeaderValue::from_str(&location) {
        headers.insert(header::LOCATION, value);
    }
    (StatusCode::CREATED, headers, Json(body)).into_response()
}

/// Status for a PUT: `If-None-Match: *` turns it into a create.
pub(crate) fn put_status(if_none_match: Option<&str>) -> StatusCode {
    match if_none_match {
        Some(condition) if condition.trim() == "*" => StatusCode::CREATED,
        _ => StatusCode::OK,
    }
}
