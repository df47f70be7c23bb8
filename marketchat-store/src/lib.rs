//! `MarketChat` store — the authoritative server side of the chat system.
//!
//! Owns the append-only [`MessageLog`](log::MessageLog), the
//! [`ConversationDirectory`](directory::ConversationDirectory), the access
//! guard, unread tracking, and the delivery [`Fanout`](fanout::Fanout).
//! [`ChatStore`] is the facade clients talk to; every operation re-runs
//! the participant check before touching state.

pub mod directory;
pub mod fanout;
pub mod guard;
pub mod log;
pub mod unread;

use tokio::sync::broadcast;

use marketchat_proto::conversation::{Conversation, ConversationId, ListingId};
use marketchat_proto::message::{
    ClientToken, Message, MessageId, Timestamp, UserId, ValidationError, validate_body,
};

use directory::{ConversationDirectory, DirectoryError};
use fanout::Fanout;
use guard::GuardError;
use log::MessageLog;
use unread::UnreadTracker;

/// Errors returned by [`ChatStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The conversation does not exist.
    #[error("conversation not found")]
    NotFound,

    /// The acting user is not a participant.
    #[error("not a participant in this conversation")]
    Forbidden,

    /// The message body failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Buyer and seller are the same user.
    #[error("cannot open a conversation about your own listing")]
    OwnListing,

    /// The store could not be reached or could not complete the write.
    ///
    /// The in-memory store never emits this; it exists for alternative
    /// [`MessageStore`] backends and failure-injecting test doubles.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<GuardError> for StoreError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::NotFound => Self::NotFound,
            GuardError::Forbidden(_) => Self::Forbidden,
        }
    }
}

impl From<DirectoryError> for StoreError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::SelfConversation => Self::OwnListing,
        }
    }
}

/// Facade over the directory, log, unread tracker, and fan-out.
pub struct ChatStore {
    directory: ConversationDirectory,
    log: MessageLog,
    unread: UnreadTracker,
    fanout: Fanout,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatStore {
    /// Creates an empty store with the default fan-out capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            directory: ConversationDirectory::new(),
            log: MessageLog::new(),
            unread: UnreadTracker::new(),
            fanout: Fanout::new(),
        }
    }

    /// Creates an empty store with a custom fan-out topic capacity.
    #[must_use]
    pub fn with_fanout_capacity(capacity: usize) -> Self {
        Self {
            directory: ConversationDirectory::new(),
            log: MessageLog::new(),
            unread: UnreadTracker::new(),
            fanout: Fanout::with_capacity(capacity),
        }
    }

    /// Opens (or reuses) the conversation for a buyer/seller/listing triple.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OwnListing`] if buyer and seller coincide.
    pub async fn open_conversation(
        &self,
        listing: ListingId,
        buyer: UserId,
        seller: UserId,
    ) -> Result<Conversation, StoreError> {
        Ok(self.directory.open(listing, buyer, seller).await?)
    }

    /// Appends a message to a conversation.
    ///
    /// Pipeline: participant check, body validation, append with
    /// server-assigned id/timestamp, last-activity touch, fan-out publish.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] / [`StoreError::Forbidden`] from
    /// the guard, or [`StoreError::Validation`] for a bad body.
    pub async fn append_message(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: &str,
        client_token: Option<ClientToken>,
    ) -> Result<Message, StoreError> {
        guard::ensure_participant(&self.directory, conversation, sender).await?;
        let body = validate_body(body)?;

        let message = self.log.append(conversation, sender, body, client_token).await;
        self.directory.touch(conversation, message.created_at).await;
        self.fanout.publish(&message).await;

        tracing::debug!(
            conversation = %conversation,
            message_id = %message.id,
            sender = %sender,
            "message appended"
        );
        Ok(message)
    }

    /// Lists messages in a conversation, optionally only those with id
    /// greater than `after`, in `(created_at, id)` order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] / [`StoreError::Forbidden`] from
    /// the guard.
    pub async fn list_messages(
        &self,
        conversation: ConversationId,
        user: UserId,
        after: Option<MessageId>,
    ) -> Result<Vec<Message>, StoreError> {
        guard::ensure_participant(&self.directory, conversation, user).await?;
        Ok(self.log.list(conversation, after).await)
    }

    /// Advances a conversation's last-activity marker to now.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the conversation is unknown.
    pub async fn touch_conversation(
        &self,
        conversation: ConversationId,
    ) -> Result<(), StoreError> {
        if self.directory.get(conversation).await.is_none() {
            return Err(StoreError::NotFound);
        }
        self.directory.touch(conversation, Timestamp::now()).await;
        Ok(())
    }

    /// Subscribes to a conversation's delivery topic.
    ///
    /// The receiver yields postcard-encoded [`Message`] frames for every
    /// append after this call, at-least-once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] / [`StoreError::Forbidden`] from
    /// the guard.
    pub async fn subscribe(
        &self,
        conversation: ConversationId,
        user: UserId,
    ) -> Result<broadcast::Receiver<Vec<u8>>, StoreError> {
        guard::ensure_participant(&self.directory, conversation, user).await?;
        Ok(self.fanout.subscribe(conversation).await)
    }

    /// Looks up a conversation by id.
    pub async fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.directory.get(id).await
    }

    /// Counts the user's conversations with unseen activity.
    ///
    /// A conversation counts when its latest message is newer than the
    /// user's last-list-visit watermark and was sent by the counterparty.
    /// Counting never advances the watermark, so callers can compute the
    /// count and then visit without racing themselves.
    pub async fn unread_count(&self, user: UserId) -> u32 {
        let watermark = self.unread.watermark(user);
        let mut count = 0u32;
        for conversation in self.directory.for_user(user).await {
            if conversation.last_activity_at <= watermark {
                continue;
            }
            if let Some(last) = self.log.last_message(conversation.id).await
                && unread::is_unread(&last, user, watermark)
            {
                count += 1;
            }
        }
        count
    }

    /// Records a conversation-list visit for the user at the current
    /// instant, clearing their unread count until new activity arrives.
    pub fn mark_list_visited(&self, user: UserId) {
        self.unread.mark_visited(user);
    }

    /// Records a conversation-list visit at an explicit instant.
    pub fn mark_list_visited_at(&self, user: UserId, at: Timestamp) {
        self.unread.mark_visited_at(user, at);
    }
}
