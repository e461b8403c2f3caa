//! Credential store.

use std::collections::BTreeMap;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::model::{User, UserId, UserRecord};
use super::password::{hash_password, verify_password};
use super::validation::{validate_email, validate_password};
use crate::config::{Config, HashParams};
use crate::error::{Error, Result};
use crate::storage::{SnapshotFile, commit};

/// Users snapshot layout: email -> record.
type UserTable = BTreeMap<String, UserRecord>;

#[derive(Debug, Default)]
struct State {
    users: UserTable,
    dirty: bool,
}

/// Owns every user record and the password hashes behind them.
///
/// Registrations are serialised behind one lock that also covers the
/// snapshot write, so two concurrent registrations of the same address
/// cannot both succeed.
#[derive(Debug)]
pub struct CredentialStore {
    state: Mutex<State>,
    snapshot: Option<SnapshotFile>,
    domain: String,
    hash_params: HashParams,
}

impl CredentialStore {
    /// Opens the store backed by the users snapshot named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or is malformed.
    pub async fn open(config: &Config) -> Result<Self> {
        let snapshot = SnapshotFile::new(config.users_path());
        let users: UserTable = snapshot.load().await?;
        info!(
            "Loaded {} users from {}",
            users.len(),
            snapshot.path().display()
        );
        Ok(Self::with_state(config, users, Some(snapshot)))
    }

    /// Creates a store that lives only in memory.
    #[must_use]
    pub fn in_memory(config: &Config) -> Self {
        Self::with_state(config, UserTable::new(), None)
    }

    fn with_state(config: &Config, users: UserTable, snapshot: Option<SnapshotFile>) -> Self {
        Self {
            state: Mutex::new(State {
                users,
                dirty: false,
            }),
            snapshot,
            domain: config.allowed_domain.clone(),
            hash_params: config.password_hash,
        }
    }

    /// Registers a new user and persists the record before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the address is outside the domain or the
    ///   password is empty.
    /// - [`Error::Conflict`] if the address is already registered.
    /// - [`Error::Persistence`] if the snapshot write fails. The user is
    ///   still registered in memory in that case.
    pub async fn register(&self, email: &str, password: &str) -> Result<UserId> {
        validate_email(email, &self.domain)?;
        validate_password(password)?;

        // Rechecked under the lock after hashing.
        if self.exists(email).await {
            return Err(Error::Conflict(email.to_string()));
        }

        let password_hash = self.hash_blocking(password).await?;

        let mut state = self.state.lock().await;
        if state.users.contains_key(email) {
            return Err(Error::Conflict(email.to_string()));
        }
        let record = UserRecord::new(password_hash);
        let id = record.id;
        state.users.insert(email.to_string(), record);
        debug!("Registered user {email} ({id})");

        let State { users, dirty } = &mut *state;
        commit(self.snapshot.as_ref(), users, dirty).await?;
        Ok(id)
    }

    /// Checks a password against the stored hash.
    ///
    /// Callers presenting the result to users should treat
    /// [`Error::UserNotFound`] exactly like `Ok(false)`; see
    /// [`authenticate`](Self::authenticate).
    ///
    /// # Errors
    ///
    /// - [`Error::UserNotFound`] if no user has this address.
    /// - [`Error::Persistence`] if the stored hash is unreadable.
    pub async fn verify(&self, email: &str, password: &str) -> Result<bool> {
        let stored = {
            let state = self.state.lock().await;
            state
                .users
                .get(email)
                .map(|record| record.password_hash.clone())
                .ok_or_else(|| Error::UserNotFound(email.to_string()))?
        };

        let password = password.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| Error::PasswordHash(e.to_string()))?
    }

    /// Verifies credentials, reporting unknown users and wrong passwords
    /// with the same [`Error::Auth`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] on any credential mismatch, or
    /// [`Error::Persistence`] if the stored hash is unreadable.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<()> {
        match self.verify(email, password).await {
            Ok(true) => Ok(()),
            Ok(false) | Err(Error::UserNotFound(_)) => {
                warn!("Rejected login for {email}");
                Err(Error::Auth)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns true if `email` is registered.
    pub async fn exists(&self, email: &str) -> bool {
        self.state.lock().await.users.contains_key(email)
    }

    /// Looks up a user by email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] if no user has this address.
    pub async fn get(&self, email: &str) -> Result<User> {
        self.state
            .lock()
            .await
            .users
            .get(email)
            .map(|record| record.to_user(email))
            .ok_or_else(|| Error::UserNotFound(email.to_string()))
    }

    /// Number of registered users.
    pub async fn len(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Returns true if no users are registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns true if the last snapshot write failed and memory is ahead
    /// of disk.
    pub async fn is_dirty(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Rewrites the snapshot from memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the write fails.
    pub async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let State { users, dirty } = &mut *state;
        commit(self.snapshot.as_ref(), users, dirty).await?;
        Ok(())
    }

    async fn hash_blocking(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let params = self.hash_params;
        tokio::task::spawn_blocking(move || hash_password(&password, params))
            .await
            .map_err(|e| Error::PasswordHash(e.to_string()))?
    }
}
