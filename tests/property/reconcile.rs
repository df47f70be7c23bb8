//! Property tests for timeline reconciliation.
//!
//! At-least-once, unordered delivery means the view must converge to
//! the same timeline no matter how messages are interleaved or
//! duplicated. These tests pin those laws down over random inputs.

use proptest::prelude::*;

use marketchat::chat::view::{ConversationView, TimelineEntry};
use marketchat_proto::conversation::{Conversation, ConversationId, ListingId};
use marketchat_proto::message::{Message, MessageId, Timestamp, UserId};

const LOCAL: UserId = UserId::new(1);
const REMOTE: UserId = UserId::new(2);

fn make_conversation() -> Conversation {
    Conversation {
        id: ConversationId::new(1),
        listing_id: ListingId::new(7),
        buyer_id: LOCAL,
        seller_id: REMOTE,
        created_at: Timestamp::from_millis(0),
        last_activity_at: Timestamp::from_millis(0),
    }
}

/// Random batch of distinct messages: ids are unique by construction,
/// timestamps deliberately collide often to exercise the id tie-break.
fn messages_strategy() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec((0u64..50, any::<bool>(), "[a-z]{1,8}"), 0..20).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (millis, local, body))| Message {
                id: MessageId::new(i as u64 + 1),
                conversation_id: ConversationId::new(1),
                sender_id: if local { LOCAL } else { REMOTE },
                body,
                created_at: Timestamp::from_millis(millis),
                client_token: None,
            })
            .collect()
    })
}

fn apply_all(messages: &[Message]) -> Vec<TimelineEntry> {
    let mut view = ConversationView::open(make_conversation(), LOCAL, Vec::new());
    for message in messages {
        view.receive(message.clone());
    }
    view.render()
}

proptest! {
    #[test]
    fn reversed_delivery_converges(messages in messages_strategy()) {
        let mut reversed = messages.clone();
        reversed.reverse();
        prop_assert_eq!(apply_all(&messages), apply_all(&reversed));
    }

    #[test]
    fn shuffled_delivery_converges(
        (messages, shuffled) in messages_strategy()
            .prop_flat_map(|m| {
                let shuffled = Just(m.clone()).prop_shuffle();
                (Just(m), shuffled)
            })
    ) {
        prop_assert_eq!(apply_all(&messages), apply_all(&shuffled));
    }

    #[test]
    fn duplicated_delivery_is_idempotent(messages in messages_strategy()) {
        let mut doubled = Vec::with_capacity(messages.len() * 2);
        for message in &messages {
            doubled.push(message.clone());
            doubled.push(message.clone());
        }
        prop_assert_eq!(apply_all(&messages), apply_all(&doubled));
    }

    #[test]
    fn timeline_is_sorted_by_timestamp_then_id(messages in messages_strategy()) {
        let entries = apply_all(&messages);
        let keys: Vec<_> = entries
            .iter()
            .map(|entry| match entry {
                TimelineEntry::Confirmed(m) => m.ordering_key(),
                TimelineEntry::Provisional(_) => unreachable!("no sends composed"),
            })
            .collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn every_distinct_id_appears_exactly_once(messages in messages_strategy()) {
        let entries = apply_all(&messages);
        prop_assert_eq!(entries.len(), messages.len());
    }
}
