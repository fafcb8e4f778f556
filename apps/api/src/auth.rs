use axum::http::HeaderMap;
use uuid::Uuid;

use crate::errors::AppError;

/// Extracts the authenticated user id from the `X-User-Id` header.
///
/// Session verification happens upstream of this service; the id arrives as
/// an opaque UUID and only its shape is checked here. Missing or malformed
/// ids reject with 401.
pub fn require_user(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_parses() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", id.to_string().parse().unwrap());
        assert_eq!(require_user(&headers).unwrap(), id);
    }

    #[test]
    fn test_missing_or_malformed_rejects() {
        assert!(matches!(
            require_user(&HeaderMap::new()),
            Err(AppError::Unauthorized)
        ));
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "not-a-uuid".parse().unwrap());
        assert!(matches!(
            require_user(&headers),
            Err(AppError::Unauthorized)
        ));
    }
}
