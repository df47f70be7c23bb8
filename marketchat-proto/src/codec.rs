//! Serialization for delivery-channel frames.
//!
//! The fan-out publishes messages as opaque postcard-encoded bytes;
//! push subscribers decode them back into [`Message`] values.

use crate::message::Message;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`Message`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the message cannot be serialized.
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(message).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`Message`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}
