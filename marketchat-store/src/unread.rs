//! Unread-conversation tracking.
//!
//! One watermark per user: the instant they last visited the conversation
//! list. A conversation counts as unread when its latest message is newer
//! than the watermark and was sent by someone else. This is deliberately
//! coarse — there is no per-message or per-conversation read state, and
//! opening one conversation does not clear the flag for others.

use std::collections::HashMap;

use parking_lot::Mutex;

use marketchat_proto::message::{Message, Timestamp, UserId};

/// Per-user last-list-visit watermarks.
///
/// A user with no recorded visit has an epoch watermark, so all activity
/// counts as unread until their first visit.
pub struct UnreadTracker {
    watermarks: Mutex<HashMap<UserId, Timestamp>>,
}

impl Default for UnreadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UnreadTracker {
    /// Creates a tracker with no recorded visits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            watermarks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the user's watermark (epoch if they never visited).
    #[must_use]
    pub fn watermark(&self, user: UserId) -> Timestamp {
        self.watermarks
            .lock()
            .get(&user)
            .copied()
            .unwrap_or(Timestamp::from_millis(0))
    }

    /// Records a conversation-list visit at the current instant.
    pub fn mark_visited(&self, user: UserId) {
        self.mark_visited_at(user, Timestamp::now());
    }

    /// Records a conversation-list visit at an explicit instant.
    pub fn mark_visited_at(&self, user: UserId, at: Timestamp) {
        self.watermarks.lock().insert(user, at);
    }
}

/// Whether a conversation whose latest message is `last` counts as unread
/// for `user` given their `watermark`.
#[must_use]
pub fn is_unread(last: &Message, user: UserId, watermark: Timestamp) -> bool {
    last.created_at > watermark && last.sender_id != user
}
