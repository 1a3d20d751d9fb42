use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderName},
};
use shared::repositories::document_repository::Preconditions;

use crate::error::ApiError;

/// `If-Match` / `If-None-Match` request headers.
#[derive(Debug, Clone, Default)]
pub struct ConditionalHeaders(pub Preconditions);

fn header_value(parts: &Parts, name: HeaderName) -> Result<Option<String>, ApiError> {
    parts
        .headers
        .get(&name)
        .map(|value| {
            value
                .to_str()
                .map(|text| text.trim().to_string())
                .map_err(|_| ApiError::BadRequest(format!("{} header must be ASCII", name)))
        })
        .transpose()
}

impl<S> FromRequestParts<S> for ConditionalHeaders
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConditionalHeaders(Preconditions {
            if_match: header_value(parts, header::IF_MATCH)?,
            if_none_match: header_value(parts, header::IF_NONE_MATCH)?,
        }))
    }
}
