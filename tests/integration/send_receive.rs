//! Integration tests for the optimistic send pipeline.
//!
//! Buyer and seller share an in-process store; the seller receives over
//! a live push subscription. Verifies that a sent message shows up
//! confirmed on both sides, that the sender's own push echo folds into
//! the timeline without duplication, and that both sides converge to
//! the same order.

use std::sync::Arc;
use std::time::Duration;

use marketchat::chat::ChatClient;
use marketchat::chat::view::TimelineEntry;
use marketchat::delivery::PushDelivery;
use marketchat_proto::conversation::{Conversation, ListingId};
use marketchat_proto::message::UserId;
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

fn confirmed_bodies(timeline: &[TimelineEntry]) -> Vec<String> {
    timeline
        .iter()
        .map(|entry| match entry {
            TimelineEntry::Confirmed(m) => m.body.clone(),
            TimelineEntry::Provisional(p) => panic!("unexpected provisional: {}", p.body),
        })
        .collect()
}

#[tokio::test]
async fn sent_message_reaches_both_timelines() {
    let (store, conversation) = setup().await;

    let (buyer, _buyer_events) =
        ChatClient::open(Arc::clone(&store), conversation.clone(), BUYER, 16)
            .await
            .unwrap();
    let (seller, mut seller_events) =
        ChatClient::open(Arc::clone(&store), conversation.clone(), SELLER, 16)
            .await
            .unwrap();
    let seller = Arc::new(seller);

    let rx = store.subscribe(conversation.id, SELLER).await.unwrap();
    let pump = seller.spawn_delivery_task(PushDelivery::new(rx));

    let sent = buyer.send_message("is this still available?").await.unwrap();
    assert_eq!(sent.sender_id, BUYER);

    // Wait for the pump to apply the pushed frame.
    tokio::time::timeout(Duration::from_secs(1), seller_events.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        confirmed_bodies(&buyer.timeline().await),
        vec!["is this still available?"]
    );
    assert_eq!(
        confirmed_bodies(&seller.timeline().await),
        vec!["is this still available?"]
    );

    pump.abort();
}

#[tokio::test]
async fn own_push_echo_does_not_duplicate() {
    let (store, conversation) = setup().await;

    let (buyer, _events) = ChatClient::open(Arc::clone(&store), conversation.clone(), BUYER, 16)
        .await
        .unwrap();
    let buyer = Arc::new(buyer);

    // The buyer also listens to the push topic, so every send comes back
    // twice: once as the append acknowledgment, once over push.
    let rx = store.subscribe(conversation.id, BUYER).await.unwrap();
    let pump = buyer.spawn_delivery_task(PushDelivery::new(rx));

    buyer.send_message("hello").await.unwrap();
    buyer.send_message("world").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        confirmed_bodies(&buyer.timeline().await),
        vec!["hello", "world"]
    );

    pump.abort();
}

#[tokio::test]
async fn both_sides_converge_on_interleaved_sends() {
    let (store, conversation) = setup().await;

    let (buyer, _be) = ChatClient::open(Arc::clone(&store), conversation.clone(), BUYER, 16)
        .await
        .unwrap();
    let (seller, _se) = ChatClient::open(Arc::clone(&store), conversation.clone(), SELLER, 16)
        .await
        .unwrap();
    let buyer = Arc::new(buyer);
    let seller = Arc::new(seller);

    let buyer_pump = buyer.spawn_delivery_task(PushDelivery::new(
        store.subscribe(conversation.id, BUYER).await.unwrap(),
    ));
    let seller_pump = seller.spawn_delivery_task(PushDelivery::new(
        store.subscribe(conversation.id, SELLER).await.unwrap(),
    ));

    buyer.send_message("one").await.unwrap();
    seller.send_message("two").await.unwrap();
    buyer.send_message("three").await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let buyer_bodies = confirmed_bodies(&buyer.timeline().await);
    let seller_bodies = confirmed_bodies(&seller.timeline().await);
    assert_eq!(buyer_bodies, vec!["one", "two", "three"]);
    assert_eq!(buyer_bodies, seller_bodies);

    buyer_pump.abort();
    seller_pump.abort();
}

#[tokio::test]
async fn snapshot_seeds_a_late_joining_client() {
    let (store, conversation) = setup().await;

    let (buyer, _events) = ChatClient::open(Arc::clone(&store), conversation.clone(), BUYER, 16)
        .await
        .unwrap();
    buyer.send_message("early one").await.unwrap();
    buyer.send_message("early two").await.unwrap();

    // Seller opens after the fact and sees history from the snapshot.
    let (seller, _se) = ChatClient::open(Arc::clone(&store), conversation, SELLER, 16)
        .await
        .unwrap();
    assert_eq!(
        confirmed_bodies(&seller.timeline().await),
        vec!["early one", "early two"]
    );
}
