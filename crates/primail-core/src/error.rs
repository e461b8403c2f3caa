//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::account::ValidationError;
use crate::mail::MessageId;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input violated a validation rule (e.g. wrong email domain).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The email address is already registered.
    #[error("Email already registered: {0}")]
    Conflict(String),

    /// Credentials did not match.
    #[error("Invalid email or password")]
    Auth,

    /// No user with this email exists.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No message with this id exists.
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// The session token does not resolve to a live session.
    #[error("Session not found or expired")]
    SessionNotFound,

    /// Snapshot read or write failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Password hashing failed for reasons unrelated to the input, such as
    /// invalid cost settings or a lost worker thread.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl Error {
    /// Returns the coarse error kind reported at the boundary.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Auth => ErrorKind::Auth,
            Self::UserNotFound(_) | Self::MessageNotFound(_) | Self::SessionNotFound => {
                ErrorKind::NotFound
            }
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::PasswordHash(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error refers to a missing user, message or session.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }
}

/// Coarse classification of [`Error`] for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or policy-violating input.
    Validation,
    /// Uniqueness violation.
    Conflict,
    /// Credential mismatch.
    Auth,
    /// Reference to a non-existent user, message or session.
    NotFound,
    /// Snapshot read/write failure.
    Persistence,
    /// Misconfiguration or runtime failure the caller cannot fix.
    Internal,
}

/// Errors raised while reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Snapshot contents could not be (de)serialized.
    #[error("Malformed snapshot {path}: {source}")]
    Serde {
        /// File being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored record is unusable (e.g. an unparsable password hash).
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
