//! Conversation types.
//!
//! A conversation is a durable two-party channel between a buyer and a
//! seller, tied to one listing. Membership is fixed at creation; the
//! `(buyer, seller, listing)` triple is unique so repeated contact
//! attempts reuse the same conversation.

use serde::{Deserialize, Serialize};

use crate::message::{Timestamp, UserId};

/// Identifies a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ConversationId(u64);

impl ConversationId {
    /// Wraps a raw conversation id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw conversation id.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conversation:{}", self.0)
    }
}

/// Identifies a marketplace listing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ListingId(u64);

impl ListingId {
    /// Wraps a raw listing id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw listing id.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listing:{}", self.0)
    }
}

/// A two-party conversation over a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// The listing this conversation is about.
    pub listing_id: ListingId,
    /// The participant who initiated contact.
    pub buyer_id: UserId,
    /// The listing owner.
    pub seller_id: UserId,
    /// When the conversation was created.
    pub created_at: Timestamp,
    /// Last-activity marker, advanced on every append.
    pub last_activity_at: Timestamp,
}

impl Conversation {
    /// Returns `true` if the user is one of the two fixed participants.
    #[must_use]
    pub fn is_participant(&self, user: UserId) -> bool {
        self.buyer_id == user || self.seller_id == user
    }

    /// Returns the counterparty for a participant, or `None` if the user
    /// is not part of this conversation.
    #[must_use]
    pub fn other_participant(&self, user: UserId) -> Option<UserId> {
        if user == self.buyer_id {
            Some(self.seller_id)
        } else if user == self.seller_id {
            Some(self.buyer_id)
        } else {
            None
        }
    }
}
