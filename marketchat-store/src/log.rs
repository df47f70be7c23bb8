//! Append-only per-conversation message log.
//!
//! The log is the single source of truth for message content and order.
//! Ids come from one system-wide counter, so they are unique everywhere
//! and monotonic within any conversation. Id and timestamp are assigned
//! while holding the write lock, which serializes concurrent appends from
//! different senders into one consistent `(created_at, id)` sequence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use marketchat_proto::conversation::ConversationId;
use marketchat_proto::message::{ClientToken, Message, MessageId, Timestamp, UserId};

/// In-memory append-only message log.
pub struct MessageLog {
    /// Messages per conversation, always in append (and thus id) order.
    messages: RwLock<HashMap<ConversationId, Vec<Message>>>,
    /// Next message id to assign.
    next_id: AtomicU64,
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageLog {
    /// Creates a new, empty log. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Appends a message, assigning its id and timestamp.
    ///
    /// The caller is expected to have authorized the sender and validated
    /// the body already.
    pub async fn append(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: String,
        client_token: Option<ClientToken>,
    ) -> Message {
        let mut messages = self.messages.write().await;
        let message = Message {
            id: MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            conversation_id: conversation,
            sender_id: sender,
            body,
            created_at: Timestamp::now(),
            client_token,
        };
        messages
            .entry(conversation)
            .or_default()
            .push(message.clone());
        drop(messages);
        message
    }

    /// Returns messages in a conversation with id greater than `after`,
    /// in `(created_at, id)` order. `None` returns the full history.
    pub async fn list(
        &self,
        conversation: ConversationId,
        after: Option<MessageId>,
    ) -> Vec<Message> {
        let messages = self.messages.read().await;
        messages.get(&conversation).map_or_else(Vec::new, |log| {
            log.iter()
                .filter(|m| after.is_none_or(|cursor| m.id > cursor))
                .cloned()
                .collect()
        })
    }

    /// Returns the most recent message in a conversation, if any.
    pub async fn last_message(&self, conversation: ConversationId) -> Option<Message> {
        let messages = self.messages.read().await;
        messages.get(&conversation).and_then(|log| log.last().cloned())
    }
}
