//! Webmail service.
//!
//! Bundles the stores behind the operations a front end needs. Every
//! protected call takes the caller's [`SessionToken`] explicitly; there is
//! no ambient "current user".

use std::sync::Arc;

use tracing::{info, warn};

use crate::account::{CredentialStore, UserId};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::mail::{Message, MessageId, MessageStore};
use crate::query::QueryEngine;
use crate::session::{SessionManager, SessionToken};

/// The webmail core: credentials, sessions, messages and views.
#[derive(Debug, Clone)]
pub struct Webmail {
    credentials: Arc<CredentialStore>,
    sessions: Arc<SessionManager>,
    messages: Arc<MessageStore>,
    query: QueryEngine,
}

impl Webmail {
    /// Opens the service with snapshots from `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if either snapshot cannot be loaded.
    pub async fn open(config: &Config) -> Result<Self> {
        let credentials = Arc::new(CredentialStore::open(config).await?);
        let messages = Arc::new(MessageStore::open(config, Arc::clone(&credentials)).await?);
        info!("Opened mail store in {}", config.data_dir.display());
        Ok(Self::assemble(config, credentials, messages))
    }

    /// Creates a service that keeps everything in memory.
    #[must_use]
    pub fn in_memory(config: &Config) -> Self {
        let credentials = Arc::new(CredentialStore::in_memory(config));
        let messages = Arc::new(MessageStore::in_memory(Arc::clone(&credentials)));
        Self::assemble(config, credentials, messages)
    }

    fn assemble(
        config: &Config,
        credentials: Arc<CredentialStore>,
        messages: Arc<MessageStore>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&credentials),
            config.session_idle_timeout(),
        ));
        let query = QueryEngine::new(Arc::clone(&messages), Arc::clone(&sessions));
        Self {
            credentials,
            sessions,
            messages,
            query,
        }
    }

    /// The credential store.
    #[must_use]
    pub const fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// The session manager.
    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The message store.
    #[must_use]
    pub const fn messages(&self) -> &Arc<MessageStore> {
        &self.messages
    }

    /// The query engine.
    #[must_use]
    pub const fn query(&self) -> &QueryEngine {
        &self.query
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// See [`CredentialStore::register`].
    pub async fn register(&self, email: &str, password: &str) -> Result<UserId> {
        self.credentials.register(email, password).await
    }

    /// Checks credentials and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] for an unknown address or wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionToken> {
        self.credentials.authenticate(email, password).await?;
        let token = self.sessions.open(email).await?;
        info!("{email} logged in");
        Ok(token)
    }

    /// Ends a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &SessionToken) {
        self.sessions.close(token).await;
    }

    /// Email of the user signed in with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the token does not resolve.
    pub async fn current_user(&self, token: &SessionToken) -> Result<String> {
        self.sessions.require(token).await
    }

    /// Sends a message from the signed-in user.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if the token does not resolve.
    /// - [`Error::UserNotFound`] if the recipient is not registered.
    /// - [`Error::Persistence`] if the message could not be written to disk.
    pub async fn send(
        &self,
        token: &SessionToken,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<MessageId> {
        let from = self.sessions.require(token).await?;
        self.messages.send(&from, to, subject, body).await
    }

    /// Opens a message the signed-in user sent or received. Only the
    /// recipient opening it marks it read; a sender reviewing their own sent
    /// message leaves the recipient's unread marker alone.
    ///
    /// Messages between other users are reported as not found.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if the token does not resolve.
    /// - [`Error::MessageNotFound`] if there is no such message visible to
    ///   the user.
    /// - [`Error::Persistence`] if the read flag could not be written.
    pub async fn read_message(&self, token: &SessionToken, id: MessageId) -> Result<Message> {
        let user = self.sessions.require(token).await?;
        let mut message = self.messages.get(id).await?;
        if !message.involves(&user) {
            return Err(Error::MessageNotFound(id));
        }
        if message.to == user {
            self.messages.mark_read(id).await?;
            message.read = true;
        }
        Ok(message)
    }

    /// Marks a message as read. Unknown IDs, and messages the user neither
    /// sent nor received, are ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::SessionNotFound`] if the token does not resolve.
    /// - [`Error::Persistence`] if the read flag could not be written.
    pub async fn mark_read(&self, token: &SessionToken, id: MessageId) -> Result<()> {
        let user = self.sessions.require(token).await?;
        match self.messages.get(id).await {
            Ok(message) if !message.involves(&user) => {
                warn!("{user} tried to mark message {id} they are not part of");
                Ok(())
            }
            // Unknown ids fall through to the store, which logs them.
            _ => self.messages.mark_read(id).await,
        }
    }

    /// Inbox of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the token does not resolve.
    pub async fn inbox(&self, token: &SessionToken, search: &str) -> Result<Vec<Message>> {
        self.query.inbox_for(token, search).await
    }

    /// Sent messages of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the token does not resolve.
    pub async fn sent(&self, token: &SessionToken, search: &str) -> Result<Vec<Message>> {
        self.query.sent_for(token, search).await
    }

    /// Retries any snapshot writes that failed earlier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if a snapshot still cannot be written.
    pub async fn flush(&self) -> Result<()> {
        self.credentials.flush().await?;
        self.messages.flush().await
    }
}
