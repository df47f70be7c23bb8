//! `MarketChat` — marketplace chat demo.
//!
//! Runs an in-process store and walks two users through a conversation
//! about a listing: the buyer opens the room and sends optimistically,
//! the seller receives over the configured transport, and the unread
//! counter tracks the seller's side.
//!
//! ```bash
//! cargo run --bin marketchat
//! cargo run --bin marketchat -- --transport poll --poll-interval-ms 200
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use marketchat::chat::{ChatClient, SendError};
use marketchat::chat::view::TimelineEntry;
use marketchat::config::{CliArgs, ClientConfig, TransportMode};
use marketchat::delivery::{PollDelivery, PushDelivery};
use marketchat_proto::conversation::ListingId;
use marketchat_proto::message::UserId;
use marketchat_store::ChatStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    init_logging(&cli.log_level);
    tracing::info!(transport = ?config.transport, "marketchat starting");

    let store = Arc::new(ChatStore::with_fanout_capacity(config.fanout_capacity));

    let buyer = UserId::new(1);
    let seller = UserId::new(2);
    let listing = ListingId::new(42);

    let conversation = store.open_conversation(listing, buyer, seller).await?;
    tracing::info!(conversation = %conversation.id, "conversation opened");

    let (buyer_client, _buyer_events) = ChatClient::open_with_match_window(
        Arc::clone(&store),
        conversation.clone(),
        buyer,
        config.event_buffer,
        config.pending_match_window_ms,
    )
    .await?;
    let (seller_client, _seller_events) = ChatClient::open_with_match_window(
        Arc::clone(&store),
        conversation.clone(),
        seller,
        config.event_buffer,
        config.pending_match_window_ms,
    )
    .await?;
    let seller_client = Arc::new(seller_client);

    // Wire the seller's delivery channel per config.
    let pump = match config.transport {
        TransportMode::Push => {
            let rx = store.subscribe(conversation.id, seller).await?;
            seller_client.spawn_delivery_task(PushDelivery::new(rx))
        }
        TransportMode::Poll => {
            let cursor = seller_client.latest_confirmed_id().await;
            let delivery = PollDelivery::new(
                Arc::clone(&store),
                conversation.id,
                seller,
                cursor,
                config.poll_interval,
            );
            seller_client.spawn_delivery_task(delivery)
        }
    };

    for body in ["Hi, is this still available?", "Could you do 20% off?"] {
        match buyer_client.send_message(body).await {
            Ok(message) => tracing::info!(message_id = %message.id, "buyer sent"),
            Err(SendError::Compose(e)) => tracing::warn!(error = %e, "compose rejected"),
            Err(SendError::Store(e)) => tracing::warn!(error = %e, "send failed"),
        }
    }

    // Give the delivery pump a moment to catch up.
    tokio::time::sleep(config.poll_interval + Duration::from_millis(200)).await;

    tracing::info!(
        unread = store.unread_count(seller).await,
        "seller unread conversations"
    );
    for entry in seller_client.timeline().await {
        match entry {
            TimelineEntry::Confirmed(m) => {
                tracing::info!(message_id = %m.id, sender = %m.sender_id, body = %m.body, "timeline");
            }
            TimelineEntry::Provisional(p) => {
                tracing::info!(sender = %p.sender_id, body = %p.body, "timeline (sending...)");
            }
        }
    }

    store.mark_list_visited(seller);
    tracing::info!(
        unread = store.unread_count(seller).await,
        "seller unread after visiting list"
    );

    pump.abort();
    tracing::info!("marketchat exiting");
    Ok(())
}

/// Initialize stderr logging with an env-filter override.
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
