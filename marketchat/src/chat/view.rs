//! Single-conversation timeline reconciliation.
//!
//! [`ConversationView`] holds the confirmed messages of one conversation
//! in `(created_at, id)` order plus at most one provisional local echo.
//! Confirmed messages arrive from two unsynchronized paths (the send
//! acknowledgment and the delivery channel), possibly more than once and
//! out of order; [`receive`](ConversationView::receive) makes the result
//! independent of arrival order and duplication.

use std::collections::HashSet;

use marketchat_proto::conversation::{Conversation, ConversationId};
use marketchat_proto::message::{
    ClientToken, Message, MessageId, Timestamp, UserId, ValidationError, validate_body,
};

/// Default correlation window for token-less echo matching (30 seconds).
pub const DEFAULT_MATCH_WINDOW_MS: u64 = 30_000;

/// Errors from starting an optimistic send.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// The body failed validation (empty or too large).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A previous send has not been confirmed or rolled back yet.
    #[error("a send is already in flight")]
    SendInFlight,
}

/// A locally composed message awaiting store confirmation.
///
/// Has no [`MessageId`]: ids are assigned by the store, and the echo is
/// correlated back via its `client_token` (or sender+body as a fallback).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalMessage {
    /// Client-generated correlation token, carried on the store write.
    pub client_token: ClientToken,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// The local user.
    pub sender_id: UserId,
    /// Validated (trimmed) body.
    pub body: String,
    /// Local compose time, used only for display and echo matching.
    pub created_at: Timestamp,
}

/// One renderable timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEntry {
    /// A store-confirmed message.
    Confirmed(Message),
    /// The optimistic local echo, always rendered last.
    Provisional(ProvisionalMessage),
}

/// What [`ConversationView::receive`] did with an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// New message, inserted at its ordering position.
    Inserted,
    /// Already-seen id, dropped.
    Duplicate,
    /// New message that also confirmed the provisional echo.
    ConfirmedPending,
    /// Message for another conversation, dropped without being recorded.
    Ignored,
}

/// Reconciled timeline for a single conversation.
pub struct ConversationView {
    conversation: Conversation,
    local_user: UserId,
    /// Confirmed messages, kept sorted by `(created_at, id)`.
    confirmed: Vec<Message>,
    /// Every confirmed id ever accepted, for duplicate suppression.
    seen: HashSet<MessageId>,
    /// At most one in-flight local send.
    pending: Option<ProvisionalMessage>,
    match_window_ms: u64,
}

impl ConversationView {
    /// Creates a view seeded with a snapshot of confirmed messages.
    ///
    /// The snapshot may be unsorted and may contain duplicates; the view
    /// normalizes it.
    #[must_use]
    pub fn open(conversation: Conversation, local_user: UserId, snapshot: Vec<Message>) -> Self {
        let mut view = Self {
            conversation,
            local_user,
            confirmed: Vec::new(),
            seen: HashSet::new(),
            pending: None,
            match_window_ms: DEFAULT_MATCH_WINDOW_MS,
        };
        for message in snapshot {
            view.receive(message);
        }
        view
    }

    /// Overrides the token-less echo correlation window.
    #[must_use]
    pub fn with_match_window_ms(mut self, window_ms: u64) -> Self {
        self.match_window_ms = window_ms;
        self
    }

    /// Starts an optimistic send.
    ///
    /// Validates the body, stamps a fresh [`ClientToken`], and installs
    /// the provisional echo at the end of the timeline. The caller must
    /// follow up with [`receive`](Self::receive) (on store success) or
    /// [`rollback`](Self::rollback) (on store failure).
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::SendInFlight`] if a previous send has not
    /// been resolved, or [`ComposeError::Validation`] for a bad body.
    pub fn begin_compose(&mut self, body: &str) -> Result<ProvisionalMessage, ComposeError> {
        if self.pending.is_some() {
            return Err(ComposeError::SendInFlight);
        }

        let body = validate_body(body)?;
        let provisional = ProvisionalMessage {
            client_token: ClientToken::new(),
            conversation_id: self.conversation.id,
            sender_id: self.local_user,
            body,
            created_at: Timestamp::now(),
        };
        self.pending = Some(provisional.clone());
        Ok(provisional)
    }

    /// Applies one confirmed message to the timeline.
    ///
    /// Duplicates (by id) are dropped. New messages are inserted at their
    /// `(created_at, id)` position, so any interleaving of the send
    /// acknowledgment and delivery paths converges to the same timeline.
    /// A message from the local user that correlates with the provisional
    /// echo also clears it, replacing the echo with its confirmed copy.
    pub fn receive(&mut self, message: Message) -> ReceiveOutcome {
        if message.conversation_id != self.conversation.id {
            tracing::debug!(
                conversation = %message.conversation_id,
                message_id = %message.id,
                "message for another conversation dropped"
            );
            return ReceiveOutcome::Ignored;
        }
        if !self.seen.insert(message.id) {
            tracing::debug!(message_id = %message.id, "duplicate message dropped");
            return ReceiveOutcome::Duplicate;
        }

        let confirmed_pending = self.matches_pending(&message);
        if confirmed_pending {
            self.pending = None;
        }

        let key = message.ordering_key();
        let position = self
            .confirmed
            .binary_search_by_key(&key, Message::ordering_key)
            .unwrap_or_else(|insert_at| insert_at);
        self.confirmed.insert(position, message);

        if confirmed_pending {
            ReceiveOutcome::ConfirmedPending
        } else {
            ReceiveOutcome::Inserted
        }
    }

    /// Removes the provisional echo after a failed store write.
    ///
    /// Matched by token so a stale rollback (for a send that was already
    /// confirmed, or superseded by a newer compose) is a no-op. Returns
    /// whether an echo was removed.
    pub fn rollback(&mut self, token: ClientToken) -> bool {
        match &self.pending {
            Some(pending) if pending.client_token == token => {
                tracing::debug!(conversation = %self.conversation.id, "provisional send rolled back");
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Renders the timeline: confirmed messages in order, then the
    /// provisional echo (if any) last.
    #[must_use]
    pub fn render(&self) -> Vec<TimelineEntry> {
        let mut entries: Vec<TimelineEntry> = self
            .confirmed
            .iter()
            .cloned()
            .map(TimelineEntry::Confirmed)
            .collect();
        if let Some(pending) = &self.pending {
            entries.push(TimelineEntry::Provisional(pending.clone()));
        }
        entries
    }

    /// The conversation this view renders.
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The local user's id.
    #[must_use]
    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    /// The in-flight provisional echo, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&ProvisionalMessage> {
        self.pending.as_ref()
    }

    /// Number of confirmed messages.
    #[must_use]
    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }

    /// Highest confirmed message id, usable as a poll cursor.
    #[must_use]
    pub fn latest_confirmed_id(&self) -> Option<MessageId> {
        self.confirmed.iter().map(|m| m.id).max()
    }

    /// Whether `message` is the confirmed copy of the provisional echo.
    ///
    /// Primary correlation is the client token; sender+body within the
    /// match window is the fallback for stores that do not echo tokens.
    fn matches_pending(&self, message: &Message) -> bool {
        let Some(pending) = &self.pending else {
            return false;
        };
        if message.sender_id != self.local_user {
            return false;
        }

        if let Some(token) = message.client_token {
            return token == pending.client_token;
        }

        message.body == pending.body
            && message.created_at.abs_diff(pending.created_at) <= self.match_window_ms
    }
}
