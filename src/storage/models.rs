use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// When the account was registered
    pub created_at: DateTime<Utc>,
    /// Unique primary identifier
    pub email: String,
    /// bcrypt digest of the password (never returned over HTTP)
    pub password_hash: String,
    /// Phone number linked by a completed Telegram login
    pub phone: Option<String>,
}
