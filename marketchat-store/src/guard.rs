//! Conversation access guard.
//!
//! Every read and append runs through [`ensure_participant`]: the acting
//! user must be one of the conversation's two fixed participants. The
//! check fails closed and is re-performed on each operation rather than
//! cached, since the acting identity can change between calls.

use marketchat_proto::conversation::{Conversation, ConversationId};
use marketchat_proto::message::UserId;

use crate::directory::ConversationDirectory;

/// Errors produced by the access guard.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// The conversation does not exist.
    #[error("conversation not found")]
    NotFound,
    /// The user is neither buyer nor seller in this conversation.
    #[error("user {0} is not a participant in this conversation")]
    Forbidden(UserId),
}

/// Verifies the user participates in the conversation.
///
/// Returns the conversation on success so callers avoid a second lookup.
///
/// # Errors
///
/// Returns [`GuardError::NotFound`] if the conversation id is unknown,
/// or [`GuardError::Forbidden`] if the user is not a participant.
pub async fn ensure_participant(
    directory: &ConversationDirectory,
    conversation: ConversationId,
    user: UserId,
) -> Result<Conversation, GuardError> {
    let conversation = directory
        .get(conversation)
        .await
        .ok_or(GuardError::NotFound)?;

    if !conversation.is_participant(user) {
        tracing::warn!(
            conversation = %conversation.id,
            user = %user,
            "access denied: not a participant"
        );
        return Err(GuardError::Forbidden(user));
    }

    Ok(conversation)
}
