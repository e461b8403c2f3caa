//! User model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generates a fresh random user ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered user, as exposed outside the credential store.
///
/// The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Email address (identity key).
    pub email: String,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// Persisted form of a user, keyed by email in the users snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct UserRecord {
    pub id: UserId,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub(crate) fn new(password_hash: String) -> Self {
        Self {
            id: UserId::generate(),
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn to_user(&self, email: &str) -> User {
        User {
            id: self.id,
            email: email.to_string(),
            created_at: self.created_at,
        }
    }
}
