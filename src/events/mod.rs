use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after successful state changes.
///
/// Events are advisory: delivery failures are logged, never propagated back
/// into the request that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartCreated(Uuid),
    CartItemAdded {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartItemUpdated {
        cart_id: Uuid,
        item_id: Uuid,
    },
    CartItemRemoved {
        cart_id: Uuid,
        item_id: Uuid,
    },
    CartCleared(Uuid),

    // Order events
    OrderCreated {
        order_id: Uuid,
        user_id: Uuid,
        total_amount: Decimal,
    },
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderItemStatusChanged {
        order_id: Uuid,
        item_id: Uuid,
        new_status: String,
    },

    // Coupon events
    CouponRedeemed {
        coupon_id: Uuid,
        order_id: Uuid,
        discount_amount: Decimal,
    },
    CouponReleased {
        coupon_id: Uuid,
        order_id: Uuid,
    },

    // Return events
    ReturnRequested(Uuid),
    ReturnApproved(Uuid),
    ReturnRejected(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is gone.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping event: {}", e);
        }
    }
}

/// Consumes events from the channel and logs them. Downstream consumers
/// (notifications, analytics) hang off this loop.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event processed");
    }
    info!("Event channel closed; processor shutting down");
}
