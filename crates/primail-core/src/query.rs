//! Inbox and sent views.
//!
//! Views are pure projections of the message store: filter by participant,
//! then by subject search, then newest first. They are recomputed on every
//! call and never cached.

use std::sync::Arc;

use crate::error::Result;
use crate::mail::{Message, MessageStore};
use crate::session::{SessionManager, SessionToken};

/// Messages addressed to `user`, excluding ones `user` sent to themselves.
///
/// `messages` must be in creation order; messages sharing a timestamp keep
/// that order in the result.
#[must_use]
pub fn inbox_view(messages: &[Message], user: &str, search: &str) -> Vec<Message> {
    select(messages, search, |message| {
        message.to == user && message.from != user
    })
}

/// Messages sent by `user`, with the same search and ordering rules as
/// [`inbox_view`].
#[must_use]
pub fn sent_view(messages: &[Message], user: &str, search: &str) -> Vec<Message> {
    select(messages, search, |message| message.from == user)
}

fn select<F>(messages: &[Message], search: &str, owned: F) -> Vec<Message>
where
    F: Fn(&Message) -> bool,
{
    let needle = search.to_lowercase();
    let mut view: Vec<Message> = messages
        .iter()
        .filter(|message| owned(message) && message.subject_contains(&needle))
        .cloned()
        .collect();
    // Stable, so equal timestamps stay in creation order.
    view.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    view
}

/// Read-only views over the message store.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    messages: Arc<MessageStore>,
    sessions: Arc<SessionManager>,
}

impl QueryEngine {
    /// Creates a query engine over the given stores.
    #[must_use]
    pub const fn new(messages: Arc<MessageStore>, sessions: Arc<SessionManager>) -> Self {
        Self { messages, sessions }
    }

    /// Inbox of `user_email`, filtered by subject and newest first.
    pub async fn list_inbox(&self, user_email: &str, search: &str) -> Vec<Message> {
        inbox_view(&self.messages.all().await, user_email, search)
    }

    /// Messages sent by `user_email`, filtered by subject and newest first.
    pub async fn list_sent(&self, user_email: &str, search: &str) -> Vec<Message> {
        sent_view(&self.messages.all().await, user_email, search)
    }

    /// Inbox of the user signed in with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`](crate::Error::SessionNotFound) if
    /// the token does not resolve.
    pub async fn inbox_for(&self, token: &SessionToken, search: &str) -> Result<Vec<Message>> {
        let user = self.sessions.require(token).await?;
        Ok(self.list_inbox(&user, search).await)
    }

    /// Sent messages of the user signed in with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`](crate::Error::SessionNotFound) if
    /// the token does not resolve.
    pub async fn sent_for(&self, token: &SessionToken, search: &str) -> Result<Vec<Message>> {
        let user = self.sessions.require(token).await?;
        Ok(self.list_sent(&user, search).await)
    }

    /// Number of unread messages in the inbox of `user_email`.
    pub async fn unread_count(&self, user_email: &str) -> usize {
        self.list_inbox(user_email, "")
            .await
            .iter()
            .filter(|message| !message.read)
            .count()
    }
}
