//! Message types shared between the store and the client.
//!
//! A [`Message`] is the authoritative, server-persisted form: it always
//! carries a server-assigned [`MessageId`] and timestamp. Client-local
//! provisional entries live on the client side and are correlated with
//! their authoritative counterpart via [`ClientToken`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum allowed message body size in bytes (4 KB).
pub const MAX_BODY_SIZE: usize = 4 * 1024;

/// Server-assigned message identifier.
///
/// Monotonically increasing and unique system-wide, which makes it
/// monotonic within any single conversation. Provisional client entries
/// have no `MessageId` until the store confirms them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MessageId(u64);

impl MessageId {
    /// Wraps a raw id value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a user (buyer or seller).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UserId(u64);

impl UserId {
    /// Wraps a raw user id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw user id.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Client-generated correlation token for an optimistic send (UUID v7).
///
/// Travels with the append request, is stored on the authoritative
/// message, and lets the client recognize its own echo arriving back
/// through the delivery channel. Never used as the final message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientToken(Uuid);

impl ClientToken {
    /// Creates a new time-ordered correlation token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `ClientToken` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision UTC timestamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns the absolute difference to another timestamp in milliseconds.
    #[must_use]
    pub const fn abs_diff(&self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// An authoritative, server-persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned monotonic identifier.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: crate::conversation::ConversationId,
    /// Participant who authored it.
    pub sender_id: UserId,
    /// Trimmed, non-empty text body.
    pub body: String,
    /// Server timestamp; the authoritative ordering key (ties broken by id).
    pub created_at: Timestamp,
    /// Correlation token echoed from the append request, if the sender
    /// supplied one.
    pub client_token: Option<ClientToken>,
}

impl Message {
    /// The total ordering key for a conversation timeline.
    #[must_use]
    pub const fn ordering_key(&self) -> (Timestamp, MessageId) {
        (self.created_at, self.id)
    }
}

/// Error returned when a message body fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Body is empty after trimming.
    #[error("message body is empty")]
    Empty,
    /// Body exceeds the maximum allowed size.
    #[error("message too large ({size} bytes, max {max} bytes)")]
    TooLarge {
        /// Actual size of the trimmed body in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
}

/// Validates and normalizes a raw message body.
///
/// Trims surrounding whitespace and checks the result is non-empty and
/// within [`MAX_BODY_SIZE`]. Returns the trimmed body on success.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] if nothing remains after trimming,
/// or [`ValidationError::TooLarge`] if the trimmed body exceeds the cap.
pub fn validate_body(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let size = trimmed.len();
    if size > MAX_BODY_SIZE {
        return Err(ValidationError::TooLarge {
            size,
            max: MAX_BODY_SIZE,
        });
    }
    Ok(trimmed.to_string())
}
