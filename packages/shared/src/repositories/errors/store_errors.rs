/// Failures reported by a backing object store adapter. Not-found is not an
/// error at this level; adapters report it as `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Backend(String),
    InvalidResponse(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "Object store error: {}", msg),
            StoreError::InvalidResponse(msg) => {
                write!(f, "Invalid object store response: {}", msg)
            }
        }
    }
}

impl std::error::Error for StoreError {}
