//! Bearer-token request authentication.
//!
//! Protected handlers take [`CurrentUser`] as their first extractor: the
//! token is verified and its subject resolved to a stored user before the
//! handler body runs, and nothing proceeds on failure.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::response::ApiError;
use crate::storage::models::User;
use crate::AppState;

/// The user resolved from the request's bearer token
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("authorization header is not a bearer token"))?;

        let claims = state
            .tokens
            .verify(token)
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;

        let user = state
            .db
            .get_user(&claims.sub)
            .map_err(|e| ApiError::internal(format!("user lookup failed: {e}")))?
            .ok_or_else(|| ApiError::unauthorized("token subject no longer exists"))?;

        Ok(CurrentUser(user))
    }
}
