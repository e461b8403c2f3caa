//! Message model types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Generates a fresh random message ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A message held in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID.
    pub id: MessageId,
    /// Creation sequence number, used to order messages sent at the same
    /// instant.
    #[serde(default)]
    pub seq: u64,
    /// Sender email.
    pub from: String,
    /// Recipient email.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
    /// Whether the message has been opened. Never goes back to false.
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Returns true if `email` sent or received this message.
    #[must_use]
    pub fn involves(&self, email: &str) -> bool {
        self.from == email || self.to == email
    }

    /// Returns true if the subject contains `needle` ignoring case.
    ///
    /// `needle` must already be lowercase; an empty needle matches every
    /// subject.
    #[must_use]
    pub fn subject_contains(&self, needle: &str) -> bool {
        needle.is_empty() || self.subject.to_lowercase().contains(needle)
    }
}
