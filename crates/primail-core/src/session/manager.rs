//! Session manager.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::model::{Session, SessionToken};
use crate::account::CredentialStore;
use crate::error::{Error, Result};

/// Maps session tokens to signed-in users.
///
/// Sessions expire after sitting idle for the configured timeout; every
/// successful [`resolve`](Self::resolve) restarts the idle clock. Expired
/// sessions are swept whenever a new one is opened, so abandoned sessions
/// do not accumulate.
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionToken, Session>>,
    credentials: Arc<CredentialStore>,
    idle_timeout: Duration,
}

impl SessionManager {
    /// Creates an empty session manager.
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>, idle_timeout: std::time::Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            credentials,
            idle_timeout: Duration::from_std(idle_timeout).unwrap_or(Duration::MAX),
        }
    }

    /// Opens a session for a user whose credentials were already verified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] if the user is not registered.
    pub async fn open(&self, user_email: &str) -> Result<SessionToken> {
        if !self.credentials.exists(user_email).await {
            return Err(Error::UserNotFound(user_email.to_string()));
        }

        let token = SessionToken::generate();
        let mut sessions = self.sessions.write().await;
        let swept = self.sweep(&mut sessions);
        if swept > 0 {
            debug!("Dropped {swept} expired sessions");
        }
        sessions.insert(token.clone(), Session::new(user_email));
        debug!("Opened session for {user_email}");
        Ok(token)
    }

    /// Returns the email bound to `token`, or `None` if the token is unknown
    /// or has expired. Expired sessions are removed.
    pub async fn resolve(&self, token: &SessionToken) -> Option<String> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(token)?;
        if session.is_expired_at(now, self.idle_timeout) {
            debug!("Session for {} expired", session.user_email);
            sessions.remove(token);
            return None;
        }
        session.last_seen = now;
        Some(session.user_email.clone())
    }

    /// Like [`resolve`](Self::resolve), but fails instead of returning `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the token does not resolve.
    pub async fn require(&self, token: &SessionToken) -> Result<String> {
        self.resolve(token).await.ok_or(Error::SessionNotFound)
    }

    /// Destroys the session if present. Closing an unknown token is a no-op.
    pub async fn close(&self, token: &SessionToken) {
        if let Some(session) = self.sessions.write().await.remove(token) {
            debug!("Closed session for {}", session.user_email);
        }
    }

    /// Removes every expired session and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        self.sweep(&mut sessions)
    }

    fn sweep(&self, sessions: &mut HashMap<SessionToken, Session>) -> usize {
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now, self.idle_timeout));
        before - sessions.len()
    }

    /// Number of sessions currently held, including any not yet purged.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
