//! Bearer token authentication
//!
//! `Caller` is an axum extractor: handlers that take it require a valid
//! `Authorization: Bearer <token>` header naming an existing user, and get
//! 401 otherwise. Handlers that take `Option<Caller>` treat a missing or bad
//! token as anonymous.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

use folkmart_common::api::auth::verify_token;
use folkmart_common::time::now_millis;

use crate::db::users;
use crate::error::ApiError;
use crate::models::Caller;
use crate::AppState;

/// Token from an `Authorization` header value
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let token = bearer_token(header).ok_or_else(|| {
            ApiError::Unauthorized("Authorization header must use the Bearer scheme".to_string())
        })?;

        let user_id = verify_token(token, state.shared_secret, state.token_ttl_ms, now_millis())
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                ApiError::Unauthorized("Invalid or expired token".to_string())
            })?;

        let identity = users::find_user(&state.db, user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

        Ok(Caller::from(&identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
