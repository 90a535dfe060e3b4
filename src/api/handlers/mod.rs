mod auth;
mod telegram;

use axum::Json;
use serde::Serialize;

use crate::api::response::{ApiError, JSend};
use crate::storage::models::User;
use crate::AppState;

pub use auth::{login, logout, register};
pub use telegram::{
    chats, connect, messages, telegram_login, telegram_logout,
};

/// Plain acknowledgement payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse { status: "ok" })
}

/// Reject requests that name a phone number linked to somebody else.
///
/// An unlinked phone is allowed through: the link is only established once
/// its owner completes a Telegram login. This check races with concurrent
/// link writes; `Database::update_phone` re-verifies in its transaction.
fn check_phone_owner(state: &AppState, user: &User, phone: &str) -> Result<(), ApiError> {
    match state.db.find_phone_owner(phone) {
        Ok(Some(owner)) if owner != user.email => Err(ApiError::forbidden(
            "phone number is linked to a different account",
        )),
        Ok(_) => Ok(()),
        Err(e) => Err(ApiError::internal(format!("ownership lookup failed: {e}"))),
    }
}
