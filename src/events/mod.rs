use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events published by the services.
///
/// Cart mutations always publish a `Cart*` event so independent consumers
/// (storefront badge, cart page, dashboards) can resynchronize without
/// polling the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events. Owner keys are carried in their encoded string form.
    CartItemAdded { owner_key: String, item_id: Uuid },
    CartItemUpdated { owner_key: String, item_id: Uuid },
    CartItemRemoved { owner_key: String, item_id: Uuid },
    CartCleared { owner_key: String },

    // Order events
    OrderPlaced { order_id: Uuid, order_number: i64 },
    OrderVerificationChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentProofAttached { order_id: Uuid },

    // Invoice / payment events
    InvoiceIssued { invoice_id: Uuid, order_id: Uuid, invoice_number: i64 },
    PaymentRecorded { transaction_id: Uuid, order_id: Uuid },

    // Sequence generator degraded mode: a wall-clock fallback identifier was
    // handed out because the counter could not be advanced atomically.
    SequenceDegraded { counter: String, fallback: i64 },

    // Catalog mirror events
    CatalogSyncCompleted { fetched: u64, written: u64, failed_batches: u64 },
    CatalogSyncCancelled { fetched: u64, written: u64 },
}

/// Broadcast-based publisher handed to every service.
///
/// Subscribers come and go independently; publishing with no subscribers is
/// not an error. This replaces the global ambient event bus of earlier
/// storefront iterations with an explicit subscription interface.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: broadcast::Sender<Event>,
}

impl EventSender {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish an event, logging instead of failing when nobody listens.
    pub fn send_or_log(&self, event: Event) {
        match self.tx.send(event) {
            Ok(n) => debug!(receivers = n, "event published"),
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "event dropped: no subscribers")
            }
        }
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Log-only event consumer run by the server binary.
///
/// Keeps one subscriber alive for the lifetime of the process so events are
/// observable even before any dashboard attaches.
pub async fn process_events(mut rx: broadcast::Receiver<Event>) {
    info!("starting event processing loop");
    loop {
        match rx.recv().await {
            Ok(Event::SequenceDegraded { counter, fallback }) => {
                warn!(%counter, fallback, "sequence counter degraded to wall-clock fallback");
            }
            Ok(event) => info!(?event, "event received"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "event consumer lagged; events were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    info!("event processing loop stopped");
}
