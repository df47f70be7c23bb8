//! Integration tests for conversation lifecycle at the store facade.

use marketchat_proto::conversation::ListingId;
use marketchat_proto::message::UserId;
use marketchat_store::{ChatStore, StoreError};

const BUYER: UserId = UserId::new(1);
const SELLER: UserId = UserId::new(2);

#[tokio::test]
async fn contact_attempt_is_idempotent() {
    let store = ChatStore::new();

    let first = store
        .open_conversation(ListingId::new(7), BUYER, SELLER)
        .await
        .unwrap();
    let second = store
        .open_conversation(ListingId::new(7), BUYER, SELLER)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);

    // Messages land in the one shared room.
    store
        .append_message(first.id, BUYER, "hello", None)
        .await
        .unwrap();
    let messages = store.list_messages(second.id, SELLER, None).await.unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn own_listing_contact_is_rejected() {
    let store = ChatStore::new();
    let result = store
        .open_conversation(ListingId::new(7), SELLER, SELLER)
        .await;
    assert!(matches!(result, Err(StoreError::OwnListing)));
}

#[tokio::test]
async fn separate_listings_get_separate_rooms() {
    let store = ChatStore::new();

    let a = store
        .open_conversation(ListingId::new(1), BUYER, SELLER)
        .await
        .unwrap();
    let b = store
        .open_conversation(ListingId::new(2), BUYER, SELLER)
        .await
        .unwrap();
    assert_ne!(a.id, b.id);

    store.append_message(a.id, BUYER, "about the bike", None).await.unwrap();
    assert!(
        store
            .list_messages(b.id, SELLER, None)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn activity_advances_last_activity_marker() {
    let store = ChatStore::new();
    let conversation = store
        .open_conversation(ListingId::new(7), BUYER, SELLER)
        .await
        .unwrap();

    let sent = store
        .append_message(conversation.id, BUYER, "bump", None)
        .await
        .unwrap();

    let updated = store.conversation(conversation.id).await.unwrap();
    assert_eq!(updated.last_activity_at, sent.created_at);
    assert!(updated.last_activity_at >= conversation.last_activity_at);
}

#[tokio::test]
async fn participants_and_listing_are_fixed_at_creation() {
    let store = ChatStore::new();
    let conversation = store
        .open_conversation(ListingId::new(7), BUYER, SELLER)
        .await
        .unwrap();

    store
        .append_message(conversation.id, SELLER, "still here", None)
        .await
        .unwrap();

    let after = store.conversation(conversation.id).await.unwrap();
    assert_eq!(after.buyer_id, BUYER);
    assert_eq!(after.seller_id, SELLER);
    assert_eq!(after.listing_id, ListingId::new(7));
    assert_eq!(after.created_at, conversation.created_at);
}
