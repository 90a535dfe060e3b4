//! The per-phone authorization flow.
//!
//! Stages move `Unauthenticated -> CodeRequested -> AwaitingSecondFactor ->
//! Authorized`. There is no failure stage: errors surface to the caller and
//! leave the platform-side state where it was, so every step can be retried.

use thiserror::Error;
use tracing::debug;

use super::connector::{CodeOutcome, PasswordOutcome};
use super::registry::SessionRegistry;
use super::TransportError;

/// Where a phone number stands in the authorization flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    CodeRequested,
    AwaitingSecondFactor,
    Authorized,
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("failed to send code: {0}")]
    CodeSendFailed(String),
    #[error("invalid login code")]
    InvalidCode,
    #[error("invalid second-factor password")]
    InvalidPassword,
    #[error("this account requires a second-factor password")]
    SecondFactorRequired,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Ask the platform to send a one-time code to `phone`.
///
/// A slot that is already authorized is left untouched. Requesting again
/// for a pending slot simply re-sends a code.
pub async fn request_code(
    registry: &SessionRegistry,
    phone: &str,
) -> Result<AuthStage, LoginError> {
    let mut lease = registry.lease(phone).await?;

    if lease.is_authorized().await? {
        debug!(phone, "already authorized, skipping code request");
        return Ok(AuthStage::Authorized);
    }

    lease
        .request_code(phone)
        .await
        .map_err(|e| LoginError::CodeSendFailed(e.to_string()))?;
    debug!(phone, "login code requested");
    Ok(AuthStage::CodeRequested)
}

/// Submit the one-time code, completing with the 2FA password if the
/// account demands one.
///
/// When the platform asks for a second factor and no password was supplied,
/// this fails with [`LoginError::SecondFactorRequired`] without consuming
/// the code again; the caller retries with the password.
pub async fn submit_code(
    registry: &SessionRegistry,
    phone: &str,
    code: &str,
    password: Option<&str>,
) -> Result<AuthStage, LoginError> {
    let mut lease = registry.lease(phone).await?;

    match lease.submit_code(code).await? {
        CodeOutcome::SignedIn => {
            debug!(phone, "signed in with code");
            Ok(AuthStage::Authorized)
        }
        CodeOutcome::InvalidCode => Err(LoginError::InvalidCode),
        CodeOutcome::PasswordRequired => {
            let Some(password) = password else {
                return Err(LoginError::SecondFactorRequired);
            };
            match lease.submit_password(password).await? {
                PasswordOutcome::SignedIn => {
                    debug!(phone, "signed in with second factor");
                    Ok(AuthStage::Authorized)
                }
                PasswordOutcome::InvalidPassword => Err(LoginError::InvalidPassword),
            }
        }
    }
}

/// Revoke the phone's authorization and discard its session blob
pub async fn sign_out(registry: &SessionRegistry, phone: &str) -> Result<(), LoginError> {
    let mut lease = registry.lease(phone).await?;
    lease.sign_out().await?;
    debug!(phone, "signed out");
    Ok(())
}
