//! Production connector backed by the grammers MTProto client.
//!
//! One session file per phone number lives under the configured session
//! directory. Login tokens from `request_code` are held in memory keyed by
//! phone: the platform ties them to the phone number rather than to the
//! connection, so they stay usable across the reconnect between the
//! code-request and code-submit HTTP calls. Codes that are never submitted
//! expire after [`LOGIN_CODE_TTL`] and get pruned.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use grammers_client::types::{LoginToken, PasswordToken};
use grammers_client::{Client, Config, InitParams, SignInError};
use grammers_session::Session;
use tracing::warn;

use super::connector::{
    ChatSummary, ClientSession, CodeOutcome, Connector, MessageSummary, PasswordOutcome,
};
use super::TransportError;

/// The platform invalidates unsubmitted codes after a few minutes; tokens
/// older than this are useless and only hold memory.
const LOGIN_CODE_TTL: Duration = Duration::from_secs(600);

type PendingLogins = Arc<Mutex<HashMap<String, (Instant, LoginToken)>>>;

fn prune_stale<T>(pending: &mut HashMap<String, (Instant, T)>, ttl: Duration) {
    pending.retain(|_, (requested_at, _)| requested_at.elapsed() <= ttl);
}

pub struct GrammersConnector {
    api_hash: String,
    api_id: i32,
    pending: PendingLogins,
    session_dir: PathBuf,
}

impl GrammersConnector {
    pub fn new(api_id: i32, api_hash: String, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_hash,
            api_id,
            pending: Arc::new(Mutex::new(HashMap::new())),
            session_dir: session_dir.into(),
        }
    }

    fn session_path(&self, phone: &str) -> PathBuf {
        self.session_dir.join(format!("{phone}.session"))
    }
}

#[async_trait]
impl Connector for GrammersConnector {
    async fn open(&self, phone: &str) -> Result<Box<dyn ClientSession>, TransportError> {
        std::fs::create_dir_all(&self.session_dir)?;
        let session_path = self.session_path(phone);
        let session = Session::load_file_or_create(&session_path)?;

        let client = Client::connect(Config {
            session,
            api_id: self.api_id,
            api_hash: self.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| TransportError::Sdk(e.to_string()))?;

        Ok(Box::new(GrammersSession {
            client,
            password_challenge: None,
            pending: Arc::clone(&self.pending),
            phone: phone.to_string(),
            session_path,
            signed_out: false,
        }))
    }
}

struct GrammersSession {
    client: Client,
    /// 2FA challenge from a `PasswordRequired` sign-in, awaiting the password
    password_challenge: Option<PasswordToken>,
    pending: PendingLogins,
    phone: String,
    session_path: PathBuf,
    signed_out: bool,
}

impl GrammersSession {
    fn pending_logins(&self) -> MutexGuard<'_, HashMap<String, (Instant, LoginToken)>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ClientSession for GrammersSession {
    async fn is_authorized(&mut self) -> Result<bool, TransportError> {
        self.client
            .is_authorized()
            .await
            .map_err(|e| TransportError::Sdk(e.to_string()))
    }

    async fn request_code(&mut self, phone: &str) -> Result<(), TransportError> {
        let token = self
            .client
            .request_login_code(phone)
            .await
            .map_err(|e| TransportError::Sdk(e.to_string()))?;
        let mut pending = self.pending_logins();
        prune_stale(&mut pending, LOGIN_CODE_TTL);
        pending.insert(phone.to_string(), (Instant::now(), token));
        Ok(())
    }

    async fn submit_code(&mut self, code: &str) -> Result<CodeOutcome, TransportError> {
        let Some((requested_at, token)) = self.pending_logins().remove(&self.phone) else {
            return Err(TransportError::Sdk(
                "no pending login code for this phone; request a code first".to_string(),
            ));
        };
        if requested_at.elapsed() > LOGIN_CODE_TTL {
            return Err(TransportError::Sdk(
                "login code expired; request a new code".to_string(),
            ));
        }

        match self.client.sign_in(&token, code).await {
            Ok(_) => Ok(CodeOutcome::SignedIn),
            Err(SignInError::PasswordRequired(challenge)) => {
                // Keep the login token so the caller's retry does not have
                // to request a fresh code.
                self.pending_logins()
                    .insert(self.phone.clone(), (requested_at, token));
                self.password_challenge = Some(challenge);
                Ok(CodeOutcome::PasswordRequired)
            }
            Err(SignInError::InvalidCode) => {
                self.pending_logins()
                    .insert(self.phone.clone(), (requested_at, token));
                Ok(CodeOutcome::InvalidCode)
            }
            Err(e) => Err(TransportError::Sdk(e.to_string())),
        }
    }

    async fn submit_password(
        &mut self,
        password: &str,
    ) -> Result<PasswordOutcome, TransportError> {
        let Some(challenge) = self.password_challenge.take() else {
            return Err(TransportError::Sdk(
                "no pending second-factor challenge; submit the code first".to_string(),
            ));
        };

        match self.client.check_password(challenge, password).await {
            Ok(_) => {
                self.pending_logins().remove(&self.phone);
                Ok(PasswordOutcome::SignedIn)
            }
            Err(SignInError::InvalidPassword) => Ok(PasswordOutcome::InvalidPassword),
            Err(e) => Err(TransportError::Sdk(e.to_string())),
        }
    }

    async fn dialogs(&mut self) -> Result<Vec<ChatSummary>, TransportError> {
        let mut chats = Vec::new();
        let mut iter = self.client.iter_dialogs();
        while let Some(dialog) = iter
            .next()
            .await
            .map_err(|e| TransportError::Sdk(e.to_string()))?
        {
            let chat = dialog.chat();
            chats.push(ChatSummary {
                id: chat.id(),
                name: chat.name().to_string(),
            });
        }
        Ok(chats)
    }

    async fn messages(
        &mut self,
        chat_id: i64,
        limit: usize,
    ) -> Result<Vec<MessageSummary>, TransportError> {
        // Resolve the chat from the dialog list; a bare id carries no
        // access hash, so it cannot be queried directly.
        let mut target = None;
        let mut iter = self.client.iter_dialogs();
        while let Some(dialog) = iter
            .next()
            .await
            .map_err(|e| TransportError::Sdk(e.to_string()))?
        {
            if dialog.chat().id() == chat_id {
                target = Some(dialog.chat().clone());
                break;
            }
        }
        let Some(chat) = target else {
            return Err(TransportError::Sdk(format!(
                "chat {chat_id} not found in this account's dialogs"
            )));
        };

        let mut messages = Vec::new();
        let mut iter = self.client.iter_messages(chat.pack()).limit(limit);
        while let Some(message) = iter
            .next()
            .await
            .map_err(|e| TransportError::Sdk(e.to_string()))?
        {
            messages.push(MessageSummary {
                id: message.id(),
                text: message.text().to_string(),
            });
        }
        Ok(messages)
    }

    async fn sign_out(&mut self) -> Result<(), TransportError> {
        self.client
            .sign_out()
            .await
            .map_err(|e| TransportError::Sdk(e.to_string()))?;
        self.signed_out = true;
        self.pending_logins().remove(&self.phone);

        if self.session_path.exists() {
            std::fs::remove_file(&self.session_path)?;
        }
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the client tears the transport down; the blob only needs
        // saving when the authorization was not just revoked.
        if self.signed_out {
            return;
        }
        if let Err(e) = self.client.session().save_to_file(&self.session_path) {
            warn!(phone = %self.phone, "failed to persist session file: {e}");
        }
    }
}
