use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{check_phone_owner, MessageResponse};
use crate::api::auth_extract::CurrentUser;
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::storage::DatabaseError;
use crate::telegram::connector::{ChatSummary, MessageSummary};
use crate::telegram::login::{self, AuthStage, LoginError};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PhoneParams {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct TelegramLoginParams {
    pub phone: String,
    pub code: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesParams {
    pub phone: String,
    pub chat_id: i64,
    #[serde(default = "default_message_limit")]
    pub limit: usize,
}

fn default_message_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ChatsData {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Serialize)]
pub struct MessagesData {
    pub messages: Vec<MessageSummary>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn connect(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppQuery(params): AppQuery<PhoneParams>,
) -> Result<Json<JSend<MessageResponse>>, ApiError> {
    check_phone_owner(&state, &user, &params.phone)?;

    let stage = login::request_code(&state.registry, &params.phone)
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to send code: {e}")))?;

    let message = match stage {
        AuthStage::Authorized => "phone is already authorized".to_string(),
        _ => "code sent to your telegram account".to_string(),
    };
    Ok(JSend::success(MessageResponse { message }))
}

pub async fn telegram_login(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppQuery(params): AppQuery<TelegramLoginParams>,
) -> Result<Json<JSend<MessageResponse>>, ApiError> {
    check_phone_owner(&state, &user, &params.phone)?;

    let stage = login::submit_code(
        &state.registry,
        &params.phone,
        &params.code,
        params.password.as_deref(),
    )
    .await
    .map_err(|e| match e {
        LoginError::SecondFactorRequired => ApiError::bad_request(e.to_string()),
        e => ApiError::bad_request(format!("failed to login: {e}")),
    })?;

    if stage != AuthStage::Authorized {
        return Err(ApiError::bad_request(format!(
            "sign-in did not complete (stage {stage:?})"
        )));
    }

    // The ownership pre-check races with concurrent link attempts; the
    // store re-verifies inside its transaction and the loser lands here.
    state
        .db
        .update_phone(&user.email, Some(&params.phone))
        .map_err(|e| match e {
            DatabaseError::PhoneTaken(_) => ApiError::forbidden(e.to_string()),
            e => ApiError::internal(format!("failed to link phone: {e}")),
        })?;

    tracing::info!(email = %user.email, phone = %params.phone, "telegram account connected");

    Ok(JSend::success(MessageResponse {
        message: "telegram account connected successfully".to_string(),
    }))
}

pub async fn chats(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppQuery(params): AppQuery<PhoneParams>,
) -> Result<Json<JSend<ChatsData>>, ApiError> {
    check_phone_owner(&state, &user, &params.phone)?;

    let mut lease = state
        .registry
        .lease(&params.phone)
        .await
        .map_err(|e| ApiError::internal(format!("failed to get chats: {e}")))?;

    let chats = lease
        .dialogs()
        .await
        .map_err(|e| ApiError::internal(format!("failed to get chats: {e}")))?;

    Ok(JSend::success(ChatsData { chats }))
}

pub async fn messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppQuery(params): AppQuery<MessagesParams>,
) -> Result<Json<JSend<MessagesData>>, ApiError> {
    check_phone_owner(&state, &user, &params.phone)?;

    let mut lease = state
        .registry
        .lease(&params.phone)
        .await
        .map_err(|e| ApiError::internal(format!("failed to get messages: {e}")))?;

    let messages = lease
        .messages(params.chat_id, params.limit)
        .await
        .map_err(|e| ApiError::internal(format!("failed to get messages: {e}")))?;

    Ok(JSend::success(MessagesData { messages }))
}

pub async fn telegram_logout(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    AppQuery(params): AppQuery<PhoneParams>,
) -> Result<Json<JSend<MessageResponse>>, ApiError> {
    check_phone_owner(&state, &user, &params.phone)?;

    login::sign_out(&state.registry, &params.phone)
        .await
        .map_err(|e| ApiError::internal(format!("failed to logout: {e}")))?;

    state
        .db
        .update_phone(&user.email, None)
        .map_err(|e| ApiError::internal(format!("failed to unlink phone: {e}")))?;

    tracing::info!(email = %user.email, phone = %params.phone, "telegram session revoked");

    Ok(JSend::success(MessageResponse {
        message: "logged out of telegram".to_string(),
    }))
}
