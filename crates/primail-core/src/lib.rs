//! # primail-core
//!
//! Core of the Primail webmail service.
//!
//! This crate provides:
//! - **Credential Store** - user registration and password verification
//! - **Session Manager** - token-to-user sessions with idle expiry
//! - **Message Store** - local message records and read state
//! - **Query Engine** - inbox and sent views with subject search
//! - Crash-safe JSON snapshots for both persistent stores
//!
//! HTTP routing and page rendering live outside this crate and talk to it
//! through [`Webmail`].
//!
//! ## Example
//!
//! ```ignore
//! use primail_core::{Config, Webmail};
//!
//! let mail = Webmail::open(&Config::default()).await?;
//! mail.register("alice@primary.com", "hunter2").await?;
//! let token = mail.login("alice@primary.com", "hunter2").await?;
//! let inbox = mail.inbox(&token, "").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
mod error;
pub mod mail;
pub mod query;
pub mod service;
pub mod session;
pub mod storage;

pub use account::{CredentialStore, User, UserId, ValidationError};
pub use config::{Config, ConfigBuilder, HashParams};
pub use error::{Error, ErrorKind, PersistenceError, Result};
pub use mail::{Message, MessageId, MessageStore};
pub use query::{QueryEngine, inbox_view, sent_view};
pub use service::Webmail;
pub use session::{Session, SessionManager, SessionToken};
pub use storage::SnapshotFile;
