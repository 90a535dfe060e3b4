//! telegram-gateway - HTTP backend for Telegram account sessions
//!
//! This crate provides account and session management with:
//! - User registration and login with bcrypt-hashed passwords
//! - Signed bearer tokens (JWT) asserting the user's identity
//! - Per-phone-number Telegram sessions persisted on local disk
//! - A code/2FA login flow proxied to the Telegram client SDK
//! - Chat and message listing for authorized phone numbers
//! - redb embedded database (ACID, MVCC, crash-safe)
//! - REST API

pub mod api;
pub mod auth;
pub mod config;
pub mod storage;
pub mod telegram;
#[cfg(test)]
pub mod testutil;

use auth::token::TokenSigner;
use config::Config;
use storage::Database;
use telegram::registry::SessionRegistry;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub registry: SessionRegistry,
    pub tokens: TokenSigner,
}
