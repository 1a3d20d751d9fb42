use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use lambda_http::tracing::{error, warn};
use serde_json::{json, Map, Value};
use shared::repositories::errors::repository_errors::RepositoryError;
use shared::repositories::etag::quote_etag;
use shared::services::errors::auth_service_errors::AuthServiceError;

#[derive(Debug)]
pub enum ApiError {
    Repository(RepositoryError),
    Auth(AuthServiceError),
    BadRequest(String),
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        ApiError::Repository(error)
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(error: AuthServiceError) -> Self {
        ApiError::Auth(error)
    }
}

fn etag_header(etag: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&quote_etag(etag)).ok()
}

/// `application/problem+json` body with optional extension members.
fn problem(status: StatusCode, detail: String, extensions: Map<String, Value>) -> Response {
    let mut body = Map::new();
    body.insert("type".to_string(), json!("about:blank"));
    body.insert(
        "title".to_string(),
        json!(status.canonical_reason().unwrap_or("Error")),
    );
    body.insert("status".to_string(), json!(status.as_u16()));
    body.insert("detail".to_string(), json!(detail));
    body.extend(extensions);

    (
        status,
        [(header::CONTENT_TYPE, "application/problem+json")],
        Json(Value::Object(body)),
    )
        .into_response()
}

fn extension(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Repository(RepositoryError::NotModified(etag)) => {
                let mut response = StatusCode::NOT_MODIFIED.into_response();
                if let Some(value) = etag_header(&etag) {
                    response.headers_mut().insert(header::ETAG, value);
                }
                response
            }
            ApiError::Repository(RepositoryError::PreconditionFailed { expected, actual }) => {
                warn!("Precondition failed: expected {}, current {}", expected, actual);
                let mut response = problem(
                    StatusCode::PRECONDITION_FAILED,
                    format!("Expected etag {} but the current etag is {}", expected, actual),
                    extension("currentEtag", json!(actual)),
                );
                if let Some(value) = etag_header(&actual) {
                    response.headers_mut().insert(header::ETAG, value);
                }
                response
            }
            ApiError::Repository(err @ RepositoryError::NotFound(_)) => {
                problem(StatusCode::NOT_FOUND, err.to_string(), Map::new())
            }
            ApiError::Repository(err @ RepositoryError::AlreadyExists(_)) => {
                warn!("{}", err);
                problem(StatusCode::CONFLICT, err.to_string(), Map::new())
            }
            ApiError::Repository(RepositoryError::PayloadTooLarge { limit_bytes }) => problem(
                StatusCode::PAYLOAD_TOO_LARGE,
                RepositoryError::PayloadTooLarge { limit_bytes }.to_string(),
                extension("limitBytes", json!(limit_bytes)),
            ),
            ApiError::Repository(RepositoryError::Validation { field, message }) => problem(
                StatusCode::BAD_REQUEST,
                message,
                extension("field", json!(field)),
            ),
            ApiError::Repository(
                err @ (RepositoryError::Serialization(_) | RepositoryError::Store(_)),
            ) => {
                error!("Repository failure: {}", err);
                problem(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The document store could not complete the request".to_string(),
                    Map::new(),
                )
            }
            ApiError::Auth(err) => {
                let mut response = problem(StatusCode::UNAUTHORIZED, err.to_string(), Map::new());
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::BadRequest(message) => {
                problem(StatusCode::BAD_REQUEST, message, Map::new())
            }
        }
    }
}
