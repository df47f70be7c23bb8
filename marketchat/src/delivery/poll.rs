//! Poll delivery against the store's list endpoint.
//!
//! Fallback for environments without a live push subscription: fetch
//! messages past a cursor on an interval. The cursor only advances as
//! messages are handed out, so a failed fetch is retried from the same
//! position and nothing is lost (frames may repeat instead, which the
//! timeline view absorbs).

use std::collections::VecDeque;
use std::time::Duration;

use marketchat_proto::conversation::ConversationId;
use marketchat_proto::message::{Message, MessageId, UserId};
use marketchat_store::StoreError;

use crate::chat::store::MessageStore;

use super::{Delivery, DeliveryError};

/// Default interval between poll fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Delivery source that periodically lists messages after a cursor.
pub struct PollDelivery<S: MessageStore> {
    store: S,
    conversation: ConversationId,
    user: UserId,
    cursor: Option<MessageId>,
    interval: Duration,
    buffer: VecDeque<Message>,
}

impl<S: MessageStore> PollDelivery<S> {
    /// Creates a poller starting after `cursor` (usually the highest id
    /// in the opening snapshot, or `None` for everything).
    #[must_use]
    pub fn new(
        store: S,
        conversation: ConversationId,
        user: UserId,
        cursor: Option<MessageId>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            conversation,
            user,
            cursor,
            interval,
            buffer: VecDeque::new(),
        }
    }

    /// The current cursor position.
    #[must_use]
    pub fn cursor(&self) -> Option<MessageId> {
        self.cursor
    }
}

impl<S: MessageStore> Delivery for PollDelivery<S> {
    async fn next_message(&mut self) -> Result<Message, DeliveryError> {
        loop {
            if let Some(message) = self.buffer.pop_front() {
                self.cursor = Some(message.id);
                return Ok(message);
            }

            tokio::time::sleep(self.interval).await;

            match self.store.list(self.conversation, self.user, self.cursor).await {
                Ok(batch) => {
                    if !batch.is_empty() {
                        tracing::debug!(
                            conversation = %self.conversation,
                            fetched = batch.len(),
                            "poll fetched new messages"
                        );
                    }
                    self.buffer.extend(batch);
                }
                Err(StoreError::Unavailable(reason)) => {
                    // Transient; retry from the same cursor next tick.
                    tracing::warn!(reason = %reason, "poll fetch failed, will retry");
                }
                Err(err) => return Err(DeliveryError::Rejected(err.to_string())),
            }
        }
    }
}
