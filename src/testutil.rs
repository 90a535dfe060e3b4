//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use crate::auth::token::TokenSigner;
use crate::config::{Config, ServerConfig, TelegramConfig, TokenConfig};
use crate::storage::models::User;
use crate::storage::Database;
use crate::telegram::connector::{
    ChatSummary, ClientSession, CodeOutcome, Connector, MessageSummary, PasswordOutcome,
};
use crate::telegram::registry::SessionRegistry;
use crate::telegram::TransportError;
use crate::AppState;

/// The one-time code the fake connector accepts
pub const VALID_CODE: &str = "424242";

/// The 2FA password the fake connector accepts
pub const VALID_PASSWORD: &str = "hunter2";

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// Create a `User` with the given email and a placeholder digest.
pub fn make_user(email: &str) -> User {
    User {
        created_at: Utc::now(),
        email: email.to_string(),
        password_hash: format!("digest-{email}"),
        phone: None,
    }
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
        telegram: TelegramConfig {
            api_hash: "test-api-hash".to_string(),
            api_id: 1,
            session_dir: "/tmp/test-sessions".to_string(),
        },
        tokens: TokenConfig {
            secret: "test-secret-0123456789-0123456789".to_string(),
            ttl_seconds: 3600,
        },
    }
}

/// Build a full `Arc<AppState>` around a fake connector and a temp database.
pub fn test_state() -> (Arc<AppState>, FakeConnector, TempDir) {
    let (db, temp_dir) = setup_db();
    let fake = FakeConnector::new();
    let registry = SessionRegistry::new(Arc::new(fake.clone()));
    let config = test_config();
    let tokens = TokenSigner::new(&config.tokens.secret, config.tokens.ttl_seconds);
    let state = Arc::new(AppState {
        config,
        db,
        registry,
        tokens,
    });
    (state, fake, temp_dir)
}

/// Scripted stand-in for the Telegram SDK.
///
/// Tracks connect/teardown pairing and per-phone authorization so tests can
/// assert the lease discipline and drive the login flow end to end.
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub state: Arc<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    pub authorized: Mutex<HashSet<String>>,
    pub closes: AtomicUsize,
    pub code_requested: Mutex<HashSet<String>>,
    pub connects: AtomicUsize,
    pub dialogs: Mutex<Vec<ChatSummary>>,
    pub fail_code_send: AtomicBool,
    pub fail_connect: AtomicBool,
    pub messages: Mutex<HashMap<i64, Vec<MessageSummary>>>,
    pub requires_password: Mutex<HashSet<String>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `phone` as already signed in.
    pub fn authorize(&self, phone: &str) {
        self.state.authorized.lock().unwrap().insert(phone.to_string());
    }

    /// Make `phone` behave like an account with 2FA enabled.
    pub fn require_password(&self, phone: &str) {
        self.state
            .requires_password
            .lock()
            .unwrap()
            .insert(phone.to_string());
    }

    pub fn is_authorized(&self, phone: &str) -> bool {
        self.state.authorized.lock().unwrap().contains(phone)
    }

    pub fn code_was_requested(&self, phone: &str) -> bool {
        self.state.code_requested.lock().unwrap().contains(phone)
    }

    pub fn set_dialogs(&self, dialogs: Vec<ChatSummary>) {
        *self.state.dialogs.lock().unwrap() = dialogs;
    }

    pub fn set_messages(&self, chat_id: i64, messages: Vec<MessageSummary>) {
        self.state.messages.lock().unwrap().insert(chat_id, messages);
    }

    /// True when every connect has been matched by a teardown.
    pub fn teardowns_balanced(&self) -> bool {
        self.state.connects.load(Ordering::SeqCst) == self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, phone: &str) -> Result<Box<dyn ClientSession>, TransportError> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Sdk("connect refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            closed: false,
            phone: phone.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeSession {
    closed: bool,
    phone: String,
    state: Arc<FakeState>,
}

#[async_trait]
impl ClientSession for FakeSession {
    async fn is_authorized(&mut self) -> Result<bool, TransportError> {
        Ok(self.state.authorized.lock().unwrap().contains(&self.phone))
    }

    async fn request_code(&mut self, phone: &str) -> Result<(), TransportError> {
        if self.state.fail_code_send.load(Ordering::SeqCst) {
            return Err(TransportError::Sdk("code send refused".to_string()));
        }
        self.state
            .code_requested
            .lock()
            .unwrap()
            .insert(phone.to_string());
        Ok(())
    }

    async fn submit_code(&mut self, code: &str) -> Result<CodeOutcome, TransportError> {
        if !self.state.code_requested.lock().unwrap().contains(&self.phone) {
            return Err(TransportError::Sdk(
                "no code was requested for this phone".to_string(),
            ));
        }
        if code != VALID_CODE {
            return Ok(CodeOutcome::InvalidCode);
        }
        if self
            .state
            .requires_password
            .lock()
            .unwrap()
            .contains(&self.phone)
        {
            return Ok(CodeOutcome::PasswordRequired);
        }
        self.state.authorized.lock().unwrap().insert(self.phone.clone());
        Ok(CodeOutcome::SignedIn)
    }

    async fn submit_password(
        &mut self,
        password: &str,
    ) -> Result<PasswordOutcome, TransportError> {
        if password != VALID_PASSWORD {
            return Ok(PasswordOutcome::InvalidPassword);
        }
        self.state.authorized.lock().unwrap().insert(self.phone.clone());
        Ok(PasswordOutcome::SignedIn)
    }

    async fn dialogs(&mut self) -> Result<Vec<ChatSummary>, TransportError> {
        if !self.state.authorized.lock().unwrap().contains(&self.phone) {
            return Err(TransportError::Sdk("not authorized".to_string()));
        }
        Ok(self.state.dialogs.lock().unwrap().clone())
    }

    async fn messages(
        &mut self,
        chat_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, TransportError> {
        if !self.state.authorized.lock().unwrap().contains(&self.phone) {
            return Err(TransportError::Sdk("not authorized".to_string()));
        }
        Ok(self
            .state
            .messages
            .lock()
            .unwrap()
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn sign_out(&mut self) -> Result<(), TransportError> {
        let mut authorized = self.state.authorized.lock().unwrap();
        authorized.remove(&self.phone);
        drop(authorized);
        self.state.code_requested.lock().unwrap().remove(&self.phone);
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
