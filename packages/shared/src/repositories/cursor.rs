use base64::{engine::general_purpose, Engine as _};

use crate::repositories::errors::repository_errors::RepositoryError;

/// Wraps a store continuation token so it is not handed to clients verbatim.
/// This is an encoding, not a protection: anyone can decode it.
pub fn encode_cursor(store_token: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(store_token.as_bytes())
}

pub fn decode_cursor(cursor: &str) -> Result<String, RepositoryError> {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| RepositoryError::validation("cursor", "cursor is not valid base64url"))?;
    String::from_utf8(bytes)
        .map_err(|_| RepositoryError::validation("cursor", "cursor does not decode to text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_hides_token() {
        let cursor = encode_cursor("users/bob.json");
        assert_ne!(cursor, "users/bob.json");
        assert!(!cursor.contains('/'));
        assert_eq!(decode_cursor(&cursor).unwrap(), "users/bob.json");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_cursor("not*base64!").unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { ref field, .. } if field == "cursor"));
    }

    #[test]
    fn test_decode_rejects_non_utf8() {
        let cursor = general_purpose::URL_SAFE_NO_PAD.encode([0xff, 0xfe]);
        assert!(decode_cursor(&cursor).is_err());
    }
}
