//! Channel-backed delivery source for tests and demos.

use tokio::sync::mpsc;

use marketchat_proto::message::Message;

use super::{Delivery, DeliveryError};

/// Delivery source fed by hand through an mpsc sender.
pub struct ScriptedDelivery {
    rx: mpsc::Receiver<Message>,
}

impl ScriptedDelivery {
    /// Creates a scripted source and the sender that feeds it.
    #[must_use]
    pub fn create(buffer: usize) -> (Self, mpsc::Sender<Message>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { rx }, tx)
    }
}

impl Delivery for ScriptedDelivery {
    async fn next_message(&mut self) -> Result<Message, DeliveryError> {
        self.rx.recv().await.ok_or(DeliveryError::Closed)
    }
}
