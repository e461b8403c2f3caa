//! Message store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::model::{Message, MessageId};
use crate::account::CredentialStore;
use crate::config::Config;
use crate::error::{Error, PersistenceError, Result};
use crate::storage::{SnapshotFile, commit};

/// Messages snapshot layout: message id -> message.
type MessageTable = BTreeMap<String, Message>;

#[derive(Debug, Default)]
struct State {
    /// Messages in creation order.
    messages: Vec<Message>,
    /// Position of each message in `messages`.
    index: HashMap<MessageId, usize>,
    next_seq: u64,
    dirty: bool,
}

impl State {
    fn from_table(table: MessageTable) -> std::result::Result<Self, PersistenceError> {
        let mut messages: Vec<Message> = table.into_values().collect();
        messages.sort_by_key(|message| message.seq);
        let index = messages
            .iter()
            .enumerate()
            .map(|(pos, message)| (message.id, pos))
            .collect();
        let next_seq = match messages.last() {
            Some(message) => next_after(message.seq)?,
            None => 0,
        };
        Ok(Self {
            messages,
            index,
            next_seq,
            dirty: false,
        })
    }

    fn to_table(&self) -> BTreeMap<String, &Message> {
        self.messages
            .iter()
            .map(|message| (message.id.to_string(), message))
            .collect()
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        let pos = *self.index.get(&id)?;
        self.messages.get_mut(pos)
    }
}

fn next_after(seq: u64) -> std::result::Result<u64, PersistenceError> {
    seq.checked_add(1).ok_or_else(|| {
        PersistenceError::CorruptRecord(format!("message sequence {seq} is exhausted"))
    })
}

/// Owns every message record.
///
/// `send` and `mark_read` are serialised behind one lock that also covers
/// the snapshot write.
#[derive(Debug)]
pub struct MessageStore {
    state: Mutex<State>,
    snapshot: Option<SnapshotFile>,
    credentials: Arc<CredentialStore>,
}

impl MessageStore {
    /// Opens the store backed by the messages snapshot named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read or is malformed.
    pub async fn open(config: &Config, credentials: Arc<CredentialStore>) -> Result<Self> {
        let snapshot = SnapshotFile::new(config.messages_path());
        let table: MessageTable = snapshot.load().await?;
        info!(
            "Loaded {} messages from {}",
            table.len(),
            snapshot.path().display()
        );
        Ok(Self {
            state: Mutex::new(State::from_table(table)?),
            snapshot: Some(snapshot),
            credentials,
        })
    }

    /// Creates a store that lives only in memory.
    #[must_use]
    pub fn in_memory(credentials: Arc<CredentialStore>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            snapshot: None,
            credentials,
        }
    }

    /// Stores a new unread message and persists it before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::UserNotFound`] if `to` is not a registered user.
    /// - [`Error::Persistence`] if the snapshot write fails. The message is
    ///   still stored in memory in that case.
    pub async fn send(&self, from: &str, to: &str, subject: &str, body: &str) -> Result<MessageId> {
        if !self.credentials.exists(to).await {
            return Err(Error::UserNotFound(to.to_string()));
        }

        let mut state = self.state.lock().await;
        let seq = state.next_seq;
        let next_seq = next_after(seq)?;
        let id = MessageId::generate();
        let message = Message {
            id,
            seq,
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
            read: false,
        };
        state.next_seq = next_seq;
        let pos = state.messages.len();
        state.messages.push(message);
        state.index.insert(id, pos);
        debug!("Stored message {id} from {from} to {to}");

        self.persist(&mut state).await?;
        Ok(id)
    }

    /// Fetches a message by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageNotFound`] if no message has this ID.
    pub async fn get(&self, id: MessageId) -> Result<Message> {
        let state = self.state.lock().await;
        state
            .index
            .get(&id)
            .and_then(|&pos| state.messages.get(pos))
            .cloned()
            .ok_or(Error::MessageNotFound(id))
    }

    /// Marks a message as read.
    ///
    /// Already-read and unknown messages are left alone; an unknown ID is
    /// logged but not reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the snapshot write fails.
    pub async fn mark_read(&self, id: MessageId) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(message) = state.get_mut(id) else {
            warn!("mark_read on unknown message {id}");
            return Ok(());
        };
        if message.read {
            return Ok(());
        }
        message.read = true;
        debug!("Marked message {id} as read");

        self.persist(&mut state).await
    }

    /// Returns every message in creation order.
    pub async fn all(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    /// Number of stored messages.
    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    /// Returns true if no messages are stored.
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
        self.persist(&mut state).await
    }

    async fn persist(&self, state: &mut State) -> Result<()> {
        let table = state.to_table();
        let mut dirty = state.dirty;
        let result = commit(self.snapshot.as_ref(), &table, &mut dirty).await;
        state.dirty = dirty;
        result.map_err(Error::from)
    }
}
