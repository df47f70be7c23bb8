//! `MarketChat` client library.
//!
//! The interesting part lives in [`chat::view::ConversationView`]: a
//! single-conversation timeline that shows an optimistic local echo the
//! instant the user hits send, then reconciles it against the confirmed
//! copy when the store write lands (or rolls it back when it fails).
//! [`chat::ChatClient`] wires that view to a [`chat::store::MessageStore`]
//! and a [`delivery::Delivery`] source.

pub mod chat;
pub mod config;
pub mod delivery;
