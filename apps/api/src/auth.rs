//! Caller identity extraction.
//!
//! Session verification lives at the gateway in front of this service; by the
//! time a request reaches us the gateway has resolved the session cookie and
//! injected the owning user id as the `x-user-id` header. A request without
//! that header is unauthenticated.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;

/// The authenticated caller. Extracted from the gateway-injected header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_malformed_uuid_is_unauthorized() {
        let request = Request::builder()
            .uri("/")
            .header("x-user-id", "not-a-uuid")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let result = AuthUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_valid_uuid_extracts() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .uri("/")
            .header("x-user-id", id.to_string())
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        let AuthUser(extracted) = AuthUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, id);
    }
}
