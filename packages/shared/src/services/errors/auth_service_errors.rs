use std::fmt;

#[derive(Debug, PartialEq)]
pub enum AuthServiceError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
    JwtError(String),
}

impl fmt::Display for AuthServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthServiceError::MissingToken => write!(f, "Missing bearer token"),
            AuthServiceError::InvalidToken => write!(f, "Invalid JWT token"),
            AuthServiceError::ExpiredToken => write!(f, "JWT token has expired"),
            AuthServiceError::JwtError(msg) => write!(f, "JWT error: {}", msg),
        }
    }
}

impl std::error::Error for AuthServiceError {}
