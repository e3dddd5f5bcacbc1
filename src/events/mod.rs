use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is down.
    /// Domain operations never fail because the event loop is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!(?event, "Dropped domain event: {}", e);
        }
    }
}

/// Domain events emitted by the storefront services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserSignedIn(Uuid),
    UserProfileSynced(Uuid),

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Cart events
    CartEntryAdded { user_id: Uuid, product_id: Uuid },
    CartEntryUpdated { user_id: Uuid, product_id: Uuid },
    CartEntryRemoved { user_id: Uuid, product_id: Uuid },
    CartCleared(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderPaid(Uuid),
    OrderFailed(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    TrackingUpdated {
        order_id: Uuid,
        tracking_number: String,
    },

    // Checkout events
    CheckoutSessionCreated {
        order_id: Uuid,
        session_id: String,
    },
    WalletOrderCreated {
        order_id: Uuid,
        provider_order_id: String,
    },
    WalletOrderCaptured {
        order_id: Uuid,
    },

    // Chat events
    ChatMessagePosted {
        user_id: Uuid,
        message_id: Uuid,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

/// Processes incoming events. Most events are observational today; the loop
/// exists so side effects (analytics, outbound notifications) can attach to
/// domain activity without blocking the request path.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderPaid(order_id) => {
                info!(%order_id, "Order paid");
            }
            Event::OrderFailed(order_id) => {
                warn!(%order_id, "Order failed");
            }
            Event::CartCleared(user_id) => {
                info!(%user_id, "Cart cleared after payment");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(%order_id, %old_status, %new_status, "Order status changed");
            }
            other => {
                info!(event = ?other, "Domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}
