//! Session model types.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// Opaque credential proving an authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the token as a string, e.g. for a cookie value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Email of the signed-in user.
    pub user_email: String,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// Last time the session was resolved.
    pub last_seen: DateTime<Utc>,
}

impl Session {
    /// Creates a session for `user_email` starting now.
    #[must_use]
    pub fn new(user_email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_email: user_email.into(),
            created_at: now,
            last_seen: now,
        }
    }

    /// Returns true if the session has been idle for at least `idle_timeout`
    /// at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_seen >= idle_timeout
    }
}
