//! The seam between this service and the Telegram client SDK.
//!
//! Handlers and the login flow only ever see these traits; tests substitute
//! a scripted connector to drive every path without touching the network.

use async_trait::async_trait;
use serde::Serialize;

use super::TransportError;

/// One entry from the account's dialog list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSummary {
    pub id: i64,
    pub name: String,
}

/// One message from a chat's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub id: i32,
    pub text: String,
}

/// Result of submitting a one-time login code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeOutcome {
    SignedIn,
    /// The account has 2FA enabled; a password must follow
    PasswordRequired,
    InvalidCode,
}

/// Result of submitting a second-factor password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordOutcome {
    SignedIn,
    InvalidPassword,
}

/// Opens connected sessions, one persisted slot per phone number.
///
/// Phone numbers are used verbatim as slot keys; two spellings of the same
/// number address two unrelated slots. Normalizing is the caller's job.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open the persisted slot for `phone` (creating it on first use) and
    /// connect the transport. Opening never implies authorization.
    async fn open(&self, phone: &str) -> Result<Box<dyn ClientSession>, TransportError>;
}

/// A connected session for one phone number
#[async_trait]
pub trait ClientSession: Send {
    async fn is_authorized(&mut self) -> Result<bool, TransportError>;

    /// Ask the platform to send a one-time code to the account
    async fn request_code(&mut self, phone: &str) -> Result<(), TransportError>;

    /// Submit the one-time code received out of band
    async fn submit_code(&mut self, code: &str) -> Result<CodeOutcome, TransportError>;

    /// Complete a password-protected (2FA) sign-in
    async fn submit_password(&mut self, password: &str)
        -> Result<PasswordOutcome, TransportError>;

    /// List the account's dialogs
    async fn dialogs(&mut self) -> Result<Vec<ChatSummary>, TransportError>;

    /// List up to `limit` recent messages from one chat
    async fn messages(
        &mut self,
        chat_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, TransportError>;

    /// Revoke the authorization and discard the persisted session blob
    async fn sign_out(&mut self) -> Result<(), TransportError>;

    /// Persist the session blob and release the transport.
    ///
    /// Called exactly once by the owning lease when it is dropped; must not
    /// block or panic.
    fn close(&mut self);
}
