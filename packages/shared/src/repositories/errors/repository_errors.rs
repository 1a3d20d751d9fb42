use crate::repositories::errors::store_errors::StoreError;

/// Outcomes of repository operations other than plain success.
///
/// Each kind maps to exactly one transport status at the HTTP boundary; the
/// repository itself never deals in status codes.
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryError {
    NotFound(String),
    AlreadyExists(String),
    PreconditionFailed { expected: String, actual: String },
    PayloadTooLarge { limit_bytes: usize },
    /// The caller already holds the current version, carried here.
    NotModified(String),
    Validation { field: String, message: String },
    Serialization(String),
    Store(StoreError),
}

impl RepositoryError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RepositoryError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::NotFound(id) => write!(f, "Document {} not found", id),
            RepositoryError::AlreadyExists(id) => write!(f, "Document {} already exists", id),
            RepositoryError::PreconditionFailed { expected, actual } => write!(
                f,
                "Precondition failed: expected etag {} but current etag is {}",
                expected, actual
            ),
            RepositoryError::PayloadTooLarge { limit_bytes } => {
                write!(f, "Payload exceeds the limit of {} bytes", limit_bytes)
            }
            RepositoryError::NotModified(etag) => write!(f, "Not modified (etag {})", etag),
            RepositoryError::Validation { field, message } => {
                write!(f, "Validation error on {}: {}", field, message)
            }
            RepositoryError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            RepositoryError::Store(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        RepositoryError::Store(err)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
