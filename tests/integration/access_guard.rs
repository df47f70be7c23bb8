//! Integration tests for conversation access control.
//!
//! Every surface fails closed for non-participants: opening a client,
//! appending, listing, and subscribing to the push topic.

use std::sync::Arc;

use marketchat::chat::{ChatClient, SendError};
use marketchat_proto::conversation::{Conversation, ConversationId, ListingId};
use marketchat_proto::message::UserId;
use marketchat_store::{ChatStore, StoreError};

const BUYER: UserId = UserId::new(1);
const SELLER: UserId = UserId::new(2);
const OUTSIDER: UserId = UserId::new(3);

async fn setup() -> (Arc<ChatStore>, Conversation) {
    let store = Arc::new(ChatStore::new());
    let conversation = store
        .open_conversation(ListingId::new(7), BUYER, SELLER)
        .await
        .unwrap();
    (store, conversation)
}

#[tokio::test]
async fn outsider_cannot_open_a_client() {
    let (store, conversation) = setup().await;
    let result = ChatClient::open(store, conversation, OUTSIDER, 16).await;
    assert!(matches!(
        result,
        Err(SendError::Store(StoreError::Forbidden))
    ));
}

#[tokio::test]
async fn outsider_cannot_append() {
    let (store, conversation) = setup().await;
    let result = store
        .append_message(conversation.id, OUTSIDER, "let me in", None)
        .await;
    assert!(matches!(result, Err(StoreError::Forbidden)));
}

#[tokio::test]
async fn outsider_cannot_list() {
    let (store, conversation) = setup().await;
    store
        .append_message(conversation.id, BUYER, "private", None)
        .await
        .unwrap();

    let result = store.list_messages(conversation.id, OUTSIDER, None).await;
    assert!(matches!(result, Err(StoreError::Forbidden)));
}

#[tokio::test]
async fn outsider_cannot_subscribe() {
    let (store, conversation) = setup().await;
    let result = store.subscribe(conversation.id, OUTSIDER).await;
    assert!(matches!(result, Err(StoreError::Forbidden)));
}

#[tokio::test]
async fn both_participants_have_full_access() {
    let (store, conversation) = setup().await;

    store
        .append_message(conversation.id, BUYER, "from buyer", None)
        .await
        .unwrap();
    store
        .append_message(conversation.id, SELLER, "from seller", None)
        .await
        .unwrap();

    assert_eq!(
        store
            .list_messages(conversation.id, BUYER, None)
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        store
            .list_messages(conversation.id, SELLER, None)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn unknown_conversation_is_not_found_not_forbidden() {
    let store = ChatStore::new();
    let result = store
        .list_messages(ConversationId::new(404), BUYER, None)
        .await;
    assert!(matches!(result, Err(StoreError::NotFound)));
}
