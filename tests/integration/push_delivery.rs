//! Integration tests for push delivery through the store fan-out.

use std::sync::Arc;
use std::time::Duration;

use marketchat::chat::{ChatClient, ChatEvent};
use marketchat::delivery::{Delivery, DeliveryError, PushDelivery};
use marketchat_proto::conversation::{Conversation, ListingId};
use marketchat_proto::message::{MessageId, UserId};
use marketchat_store::ChatStore;

const BUYER: UserId = UserId::new(1);
const SELLER: UserId = UserId::new(2);

async fn setup() -> (Arc<ChatStore>, Conversation) {
    let store = Arc::new(ChatStore::new());
    let conversation = store
        .open_conversation(ListingId::new(7), BUYER, SELLER)
        .await
        .unwrap();
    (store, conversation)
}

#[tokio::test]
async fn subscriber_sees_appends_as_decoded_messages() {
    let (store, conversation) = setup().await;
    let rx = store.subscribe(conversation.id, SELLER).await.unwrap();
    let mut delivery = PushDelivery::new(rx);

    let sent = store
        .append_message(conversation.id, BUYER, "over push", None)
        .await
        .unwrap();

    let received = delivery.next_message().await.unwrap();
    assert_eq!(received, sent);
}

#[tokio::test]
async fn frames_arrive_in_append_order() {
    let (store, conversation) = setup().await;
    let rx = store.subscribe(conversation.id, SELLER).await.unwrap();
    let mut delivery = PushDelivery::new(rx);

    for body in ["a", "b", "c"] {
        store
            .append_message(conversation.id, BUYER, body, None)
            .await
            .unwrap();
    }

    let mut last = MessageId::new(0);
    for body in ["a", "b", "c"] {
        let msg = delivery.next_message().await.unwrap();
        assert_eq!(msg.body, body);
        assert!(msg.id > last);
        last = msg.id;
    }
}

#[tokio::test]
async fn appends_before_subscription_are_not_pushed() {
    let (store, conversation) = setup().await;

    store
        .append_message(conversation.id, BUYER, "before", None)
        .await
        .unwrap();

    let rx = store.subscribe(conversation.id, SELLER).await.unwrap();
    let mut delivery = PushDelivery::new(rx);

    store
        .append_message(conversation.id, BUYER, "after", None)
        .await
        .unwrap();

    // Only the post-subscription append arrives; the earlier message is
    // the snapshot's job.
    let msg = delivery.next_message().await.unwrap();
    assert_eq!(msg.body, "after");

    let no_more = tokio::time::timeout(Duration::from_millis(50), delivery.next_message()).await;
    assert!(no_more.is_err());
}

#[tokio::test]
async fn pump_feeds_client_and_emits_events() {
    let (store, conversation) = setup().await;

    let (seller, mut events) =
        ChatClient::open(Arc::clone(&store), conversation.clone(), SELLER, 16)
            .await
            .unwrap();
    let seller = Arc::new(seller);
    let pump = seller.spawn_delivery_task(PushDelivery::new(
        store.subscribe(conversation.id, SELLER).await.unwrap(),
    ));

    let sent = store
        .append_message(conversation.id, BUYER, "ping", None)
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, ChatEvent::MessageReceived { message: sent });

    pump.abort();
}

#[tokio::test]
async fn store_drop_closes_the_channel() {
    let (store, conversation) = setup().await;
    let rx = store.subscribe(conversation.id, SELLER).await.unwrap();
    let mut delivery = PushDelivery::new(rx);

    drop(store);

    assert!(matches!(
        delivery.next_message().await,
        Err(DeliveryError::Closed)
    ));
}
