//! Conversation directory.
//!
//! Conversations are created lazily on the first contact attempt between
//! a buyer and a seller over a listing, and the `(buyer, seller, listing)`
//! triple is unique: opening the same pairing again returns the existing
//! conversation instead of a duplicate room. Membership never changes
//! after creation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use marketchat_proto::conversation::{Conversation, ConversationId, ListingId};
use marketchat_proto::message::{Timestamp, UserId};

/// Errors that can occur when opening a conversation.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Buyer and seller are the same user.
    #[error("cannot open a conversation about your own listing")]
    SelfConversation,
}

/// In-memory directory of conversations, keyed by id.
pub struct ConversationDirectory {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
    next_id: AtomicU64,
}

impl Default for ConversationDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationDirectory {
    /// Creates a new, empty directory. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens the conversation for a `(buyer, seller, listing)` triple,
    /// creating it if it does not exist yet.
    ///
    /// Idempotent: a second open with the same triple returns the same
    /// conversation.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::SelfConversation`] if `buyer == seller`.
    pub async fn open(
        &self,
        listing: ListingId,
        buyer: UserId,
        seller: UserId,
    ) -> Result<Conversation, DirectoryError> {
        if buyer == seller {
            return Err(DirectoryError::SelfConversation);
        }

        let mut conversations = self.conversations.write().await;
        if let Some(existing) = conversations
            .values()
            .find(|c| c.listing_id == listing && c.buyer_id == buyer && c.seller_id == seller)
        {
            return Ok(existing.clone());
        }

        let now = Timestamp::now();
        let conversation = Conversation {
            id: ConversationId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            listing_id: listing,
            buyer_id: buyer,
            seller_id: seller,
            created_at: now,
            last_activity_at: now,
        };
        conversations.insert(conversation.id, conversation.clone());
        drop(conversations);

        tracing::debug!(
            conversation = %conversation.id,
            listing = %listing,
            "conversation created"
        );
        Ok(conversation)
    }

    /// Looks up a conversation by id.
    pub async fn get(&self, id: ConversationId) -> Option<Conversation> {
        let conversations = self.conversations.read().await;
        conversations.get(&id).cloned()
    }

    /// Returns every conversation the user participates in.
    pub async fn for_user(&self, user: UserId) -> Vec<Conversation> {
        let conversations = self.conversations.read().await;
        conversations
            .values()
            .filter(|c| c.is_participant(user))
            .cloned()
            .collect()
    }

    /// Advances a conversation's last-activity marker.
    ///
    /// Unknown ids are ignored (the marker is advisory metadata).
    pub async fn touch(&self, id: ConversationId, at: Timestamp) {
        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations.get_mut(&id) {
            conversation.last_activity_at = at;
        }
    }
}
