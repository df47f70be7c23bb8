//! Shared domain types for `MarketChat`.

pub mod codec;
pub mod conversation;
pub mod message;
