//! Store abstraction for the chat client.
//!
//! [`MessageStore`] is the seam between the client and the authoritative
//! store: append a message, list messages after a cursor. The in-process
//! [`ChatStore`] implements it directly; the trait exists so tests can
//! inject failing or delayed stores.

use std::sync::Arc;

use marketchat_proto::conversation::ConversationId;
use marketchat_proto::message::{ClientToken, Message, MessageId, UserId};
use marketchat_store::{ChatStore, StoreError};

/// Trait for the authoritative message store the client writes to.
pub trait MessageStore: Send + Sync {
    /// Appends a message, returning the confirmed copy with its
    /// server-assigned id and timestamp.
    fn append(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: &str,
        client_token: Option<ClientToken>,
    ) -> impl std::future::Future<Output = Result<Message, StoreError>> + Send;

    /// Lists messages in `(created_at, id)` order, optionally only those
    /// with id greater than `after`.
    fn list(
        &self,
        conversation: ConversationId,
        user: UserId,
        after: Option<MessageId>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, StoreError>> + Send;
}

impl MessageStore for Arc<ChatStore> {
    async fn append(
        &self,
        conversation: ConversationId,
        sender: UserId,
        body: &str,
        client_token: Option<ClientToken>,
    ) -> Result<Message, StoreError> {
        self.append_message(conversation, sender, body, client_token)
            .await
    }

    async fn list(
        &self,
        conversation: ConversationId,
        user: UserId,
        after: Option<MessageId>,
    ) -> Result<Vec<Message>, StoreError> {
        self.list_messages(conversation, user, after).await
    }
}
