//! Delivery channels feeding confirmed messages into the client.
//!
//! Delivery is at-least-once and unordered: a frame can arrive twice
//! (send acknowledgment plus push), arrive late, or not arrive at all
//! over push (topic lag) in which case polling covers the gap. The
//! timeline view absorbs all of that; a [`Delivery`] source just has to
//! produce messages.

pub mod poll;
pub mod push;
pub mod scripted;

use marketchat_proto::codec::CodecError;
use marketchat_proto::message::Message;

pub use poll::PollDelivery;
pub use push::PushDelivery;
pub use scripted::ScriptedDelivery;

/// Errors produced by a delivery source.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The source will never yield another message.
    #[error("delivery channel closed")]
    Closed,

    /// A frame could not be decoded.
    #[error("frame decode failed: {0}")]
    Decode(#[from] CodecError),

    /// The backing store rejected the fetch (revoked access, etc.).
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// A source of confirmed messages for one conversation.
pub trait Delivery: Send {
    /// Waits for the next delivered message.
    ///
    /// Implementations skip transient trouble internally where they can
    /// (push lag, store hiccups) and return [`DeliveryError::Closed`]
    /// once the source is permanently done.
    fn next_message(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Message, DeliveryError>> + Send;
}
