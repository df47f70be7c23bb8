//! Per-conversation publish/subscribe fan-out.
//!
//! One broadcast topic per conversation, carrying postcard-encoded
//! [`Message`] frames. Delivery is at-least-once with no ordering
//! guarantee across publishes: a slow subscriber can lag and miss frames
//! (the snapshot fetch or poll path covers the gap), and subscribers must
//! de-duplicate by message id.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::sync::broadcast;

use marketchat_proto::codec;
use marketchat_proto::conversation::ConversationId;
use marketchat_proto::message::Message;

/// Default capacity of each conversation topic.
const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// Topic-per-conversation broadcast fan-out.
pub struct Fanout {
    topics: RwLock<HashMap<ConversationId, broadcast::Sender<Vec<u8>>>>,
    capacity: usize,
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

impl Fanout {
    /// Creates a fan-out with the default topic capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Creates a fan-out with a custom per-topic capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribes to a conversation topic, creating it on first use.
    ///
    /// The receiver yields encoded frames published after this call.
    pub async fn subscribe(&self, conversation: ConversationId) -> broadcast::Receiver<Vec<u8>> {
        let mut topics = self.topics.write().await;
        topics
            .entry(conversation)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes a message to its conversation topic.
    ///
    /// A conversation nobody subscribed to has no topic yet; the publish
    /// is dropped silently, which is fine — subscribers seed from a
    /// snapshot when they open the conversation.
    pub async fn publish(&self, message: &Message) {
        let frame = match codec::encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    message_id = %message.id,
                    error = %e,
                    "failed to encode delivery frame"
                );
                return;
            }
        };

        let topics = self.topics.read().await;
        if let Some(topic) = topics.get(&message.conversation_id)
            && topic.send(frame).is_err()
        {
            tracing::debug!(
                conversation = %message.conversation_id,
                "no active subscribers for publish"
            );
        }
    }
}
