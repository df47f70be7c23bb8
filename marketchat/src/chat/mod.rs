//! Chat application layer for `MarketChat`.
//!
//! Contains the [`ChatClient`] which drives the optimistic send pipeline
//! (compose -> echo -> store write -> confirm or rollback) and feeds
//! messages from a delivery channel into the conversation timeline.

pub mod store;
pub mod view;

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use marketchat_proto::conversation::Conversation;
use marketchat_proto::message::{Message, UserId};
use marketchat_store::StoreError;

use crate::delivery::{Delivery, DeliveryError};
use store::MessageStore;
use view::{ComposeError, ConversationView, ReceiveOutcome, TimelineEntry};

/// Errors that can occur when sending a message.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The optimistic compose step failed; nothing was shown or sent.
    #[error("compose failed: {0}")]
    Compose(#[from] ComposeError),

    /// The store rejected or could not complete the write. The
    /// provisional echo has been rolled back.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Events emitted by the [`ChatClient`] for UI notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The in-flight send was confirmed by the store.
    SendConfirmed {
        /// The confirmed copy of the message.
        message: Message,
    },
    /// The in-flight send failed and its echo was rolled back.
    SendFailed {
        /// The body that was not delivered, for re-compose.
        body: String,
    },
    /// A message from the counterparty (or another device) was inserted.
    MessageReceived {
        /// The inserted message.
        message: Message,
    },
}

/// Client for one open conversation.
///
/// Owns a [`ConversationView`] behind a mutex; the store write itself
/// runs without the lock held so a slow store never blocks rendering.
pub struct ChatClient<S: MessageStore> {
    store: S,
    view: Mutex<ConversationView>,
    event_tx: mpsc::Sender<ChatEvent>,
}

impl<S: MessageStore> ChatClient<S> {
    /// Opens a conversation: fetches the confirmed snapshot and seeds
    /// the timeline with it, using the default echo-correlation window.
    ///
    /// Returns the client and a receiver for [`ChatEvent`]s that the UI
    /// layer should consume.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Store`] if the snapshot fetch fails (the
    /// user is not a participant, or the store is unavailable).
    pub async fn open(
        store: S,
        conversation: Conversation,
        local_user: UserId,
        event_buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<ChatEvent>), SendError> {
        Self::open_with_match_window(
            store,
            conversation,
            local_user,
            event_buffer,
            view::DEFAULT_MATCH_WINDOW_MS,
        )
        .await
    }

    /// Opens a conversation with an explicit token-less echo-correlation
    /// window (`ClientConfig::pending_match_window_ms`).
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Store`] if the snapshot fetch fails.
    pub async fn open_with_match_window(
        store: S,
        conversation: Conversation,
        local_user: UserId,
        event_buffer: usize,
        match_window_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<ChatEvent>), SendError> {
        let snapshot = store.list(conversation.id, local_user, None).await?;
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        let view = ConversationView::open(conversation, local_user, snapshot)
            .with_match_window_ms(match_window_ms);
        let client = Self {
            store,
            view: Mutex::new(view),
            event_tx,
        };
        Ok((client, event_rx))
    }

    /// Sends a message optimistically.
    ///
    /// 1. Compose: validate and install the provisional echo (the UI
    ///    sees it on the next [`timeline`](Self::timeline) call).
    /// 2. Write: append to the store, lock released.
    /// 3. Confirm or rollback: on success the confirmed copy replaces
    ///    the echo; on failure the echo disappears and the body is
    ///    handed back through [`ChatEvent::SendFailed`].
    ///
    /// There is no automatic retry; failed sends go back to the user.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Compose`] for a bad body or an in-flight
    /// send, [`SendError::Store`] when the write fails.
    pub async fn send_message(&self, body: &str) -> Result<Message, SendError> {
        let provisional = {
            let mut view = self.view.lock().await;
            view.begin_compose(body)?
        };

        let result = self
            .store
            .append(
                provisional.conversation_id,
                provisional.sender_id,
                &provisional.body,
                Some(provisional.client_token),
            )
            .await;

        match result {
            Ok(message) => {
                let mut view = self.view.lock().await;
                view.receive(message.clone());
                drop(view);

                if self
                    .event_tx
                    .try_send(ChatEvent::SendConfirmed {
                        message: message.clone(),
                    })
                    .is_err()
                {
                    tracing::debug!(
                        message_id = %message.id,
                        "event buffer full, confirmation notification dropped"
                    );
                }
                Ok(message)
            }
            Err(err) => {
                let mut view = self.view.lock().await;
                view.rollback(provisional.client_token);
                drop(view);

                tracing::warn!(
                    conversation = %provisional.conversation_id,
                    error = %err,
                    "send failed, echo rolled back"
                );
                // The event carries the only copy of the lost body, so
                // wait for buffer space instead of dropping it.
                if self
                    .event_tx
                    .send(ChatEvent::SendFailed {
                        body: provisional.body,
                    })
                    .await
                    .is_err()
                {
                    tracing::warn!("event receiver gone, undelivered body discarded");
                }
                Err(err.into())
            }
        }
    }

    /// Applies one delivered message to the timeline.
    ///
    /// Duplicates and own-send echoes fold into the view; only genuinely
    /// new messages emit [`ChatEvent::MessageReceived`].
    pub async fn apply_delivery(&self, message: Message) -> ReceiveOutcome {
        let mut view = self.view.lock().await;
        let outcome = view.receive(message.clone());
        drop(view);

        if outcome == ReceiveOutcome::Inserted {
            let message_id = message.id;
            if self
                .event_tx
                .try_send(ChatEvent::MessageReceived { message })
                .is_err()
            {
                tracing::debug!(
                    message_id = %message_id,
                    "event buffer full, receive notification dropped"
                );
            }
        }
        outcome
    }

    /// Spawns a task that pumps a [`Delivery`] source into the timeline.
    ///
    /// The task ends when the source reports [`DeliveryError::Closed`];
    /// other delivery errors are logged and skipped.
    pub fn spawn_delivery_task<D>(self: &Arc<Self>, mut delivery: D) -> tokio::task::JoinHandle<()>
    where
        D: Delivery + 'static,
        S: 'static,
    {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match delivery.next_message().await {
                    Ok(message) => {
                        client.apply_delivery(message).await;
                    }
                    Err(DeliveryError::Closed) => {
                        tracing::debug!("delivery channel closed, stopping pump");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "delivery error, frame skipped");
                    }
                }
            }
        })
    }

    /// Snapshot of the rendered timeline.
    pub async fn timeline(&self) -> Vec<TimelineEntry> {
        self.view.lock().await.render()
    }

    /// Whether a send is currently in flight.
    pub async fn send_in_flight(&self) -> bool {
        self.view.lock().await.pending().is_some()
    }

    /// Highest confirmed message id, usable as a poll cursor.
    pub async fn latest_confirmed_id(&self) -> Option<marketchat_proto::message::MessageId> {
        self.view.lock().await.latest_confirmed_id()
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
