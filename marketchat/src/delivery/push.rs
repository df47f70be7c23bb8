//! Push delivery over a broadcast subscription.
//!
//! Wraps the receiver handed out by the store's fan-out. Lag is not an
//! error from the client's point of view: dropped frames are recovered
//! by the snapshot/poll path, so a lagged receiver just keeps going.

use tokio::sync::broadcast;

use marketchat_proto::codec;
use marketchat_proto::message::Message;

use super::{Delivery, DeliveryError};

/// Delivery source backed by a fan-out topic subscription.
pub struct PushDelivery {
    rx: broadcast::Receiver<Vec<u8>>,
}

impl PushDelivery {
    /// Wraps a topic subscription obtained from the store.
    #[must_use]
    pub fn new(rx: broadcast::Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }
}

impl Delivery for PushDelivery {
    async fn next_message(&mut self) -> Result<Message, DeliveryError> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Ok(codec::decode(&frame)?),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "push subscriber lagged, frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(DeliveryError::Closed);
                }
            }
        }
    }
}
