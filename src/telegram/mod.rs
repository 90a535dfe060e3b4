//! Per-phone Telegram sessions.
//!
//! The SDK sits behind the [`connector::Connector`] seam. The registry hands
//! out scoped leases (keyed lock + connected session), the login module
//! drives the code/2FA authorization flow, and `grammers.rs` binds the seam
//! to the real MTProto client.

pub mod connector;
pub mod grammers;
pub mod login;
pub mod registry;

use thiserror::Error;

/// Failure talking to the Telegram platform or its on-disk session state
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("session file error: {0}")]
    Session(#[from] std::io::Error),
    #[error("telegram error: {0}")]
    Sdk(String),
}
