use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::api::auth_extract::CurrentUser;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::auth::password;
use crate::storage::models::User;
use crate::storage::DatabaseError;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub phone: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CredentialsRequest>,
) -> Result<(StatusCode, Json<JSend<UserResponse>>), ApiError> {
    validate_credentials(&req)?;

    let password_hash = password::hash(&req.password)
        .map_err(|e| ApiError::internal(format!("failed to hash password: {e}")))?;

    let user = User {
        created_at: Utc::now(),
        email: req.email,
        password_hash,
        phone: None,
    };

    match state.db.create_user(&user) {
        Ok(()) => {}
        Err(DatabaseError::DuplicateEmail) => {
            return Err(ApiError::bad_request("email already registered"))
        }
        Err(e) => return Err(ApiError::internal(format!("failed to store user: {e}"))),
    }

    tracing::debug!(email = %user.email, "registered user");

    Ok((
        StatusCode::CREATED,
        JSend::success(UserResponse {
            email: user.email,
            phone: None,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .db
        .get_user(&req.email)
        .map_err(|e| ApiError::internal(format!("user lookup failed: {e}")))?;

    // Same failure for unknown email and wrong password
    let Some(user) = user else {
        return Err(ApiError::bad_request("invalid credentials"));
    };

    let verified = password::verify(&req.password, &user.password_hash)
        .map_err(|e| ApiError::internal(format!("failed to verify password: {e}")))?;
    if !verified {
        return Err(ApiError::bad_request("invalid credentials"));
    }

    let access_token = state
        .tokens
        .issue(&user.email)
        .map_err(|e| ApiError::internal(format!("failed to issue token: {e}")))?;

    tracing::debug!(email = %user.email, "issued bearer token");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
        phone: user.phone,
    }))
}

/// Bearer tokens are stateless, so logout only acknowledges; the token
/// itself stays valid until it expires.
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<JSend<MessageResponse>> {
    tracing::debug!(email = %user.email, "logout acknowledged");
    JSend::success(MessageResponse {
        message: "logout successful".to_string(),
    })
}

fn validate_credentials(req: &CredentialsRequest) -> Result<(), ApiError> {
    if !req.email.contains('@') || req.email.len() < 3 {
        return Err(ApiError::unprocessable("email is not valid"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::unprocessable(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}
