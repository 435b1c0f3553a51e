//! Ledger change feed
//!
//! Components that need live updates call [`EventBus::subscribe`] and get a
//! [`Subscription`] handle back. Delivery stops when the handle is passed to
//! [`Subscription::unsubscribe`] or dropped.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events buffered per subscriber before older ones are skipped
const CHANNEL_CAPACITY: usize = 256;

/// A change to stored data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    TransactionAdded { id: i64 },
    TransactionUpdated { id: i64 },
    TransactionDeleted { id: i64 },
    BudgetChanged,
    NotificationAdded { id: i64 },
    NotificationRemoved { id: i64 },
    ConversationChanged { id: i64 },
    ConversationDeleted { id: i64 },
    MessageAdded { conversation_id: i64, id: i64 },
}

impl LedgerEvent {
    /// Event name used on the SSE wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransactionAdded { .. } => "transaction_added",
            Self::TransactionUpdated { .. } => "transaction_updated",
            Self::TransactionDeleted { .. } => "transaction_deleted",
            Self::BudgetChanged => "budget_changed",
            Self::NotificationAdded { .. } => "notification_added",
            Self::NotificationRemoved { .. } => "notification_removed",
            Self::ConversationChanged { .. } => "conversation_changed",
            Self::ConversationDeleted { .. } => "conversation_deleted",
            Self::MessageAdded { .. } => "message_added",
        }
    }
}

/// Fan-out channel for ledger events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LedgerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event to every live subscriber
    ///
    /// Returns how many subscribers were listening.
    pub fn publish(&self, event: LedgerEvent) -> usize {
        debug!(event = event.name(), "Publishing ledger event");
        // An error only means nobody is subscribed right now
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`EventBus::subscribe`]
pub struct Subscription {
    receiver: broadcast::Receiver<LedgerEvent>,
}

impl Subscription {
    /// Wait for the next event
    ///
    /// Returns `None` once the bus is gone. A subscriber that falls behind
    /// skips the events it missed and keeps receiving.
    pub async fn recv(&mut self) -> Option<LedgerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Change feed subscriber lagged, skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<LedgerEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Stop receiving events
    pub fn unsubscribe(self) {
        drop(self);
    }
}
