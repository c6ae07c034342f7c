//! LiveOrderHub — real-time order fan-out
//!
//! ```text
//! checkout / kitchen / webhooks / closure admin
//!       │ publish_*
//!       ▼
//! LiveOrderHub ── broadcast::Sender<LiveMessage>
//!       │
//!       ▼
//! live WS sessions (subscribe → filter by viewer → push)
//! ```
//!
//! The hub holds no order state; a lagged subscriber reloads its snapshot
//! from the database.

use shared::live::LiveMessage;
use shared::models::{ClosureStatus, OrderDetail};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast channel capacity, enough to absorb bursts while a socket writes
const BROADCAST_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct LiveOrderHub {
    tx: broadcast::Sender<LiveMessage>,
}

impl Default for LiveOrderHub {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }
}

impl LiveOrderHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// An order was created or changed
    pub fn publish_update(&self, order: OrderDetail) {
        // send fails only when nobody is subscribed
        let _ = self.tx.send(LiveMessage::OrderUpdated {
            order: Box::new(order),
        });
    }

    pub fn publish_remove(&self, order_id: Uuid) {
        let _ = self.tx.send(LiveMessage::OrderRemoved { order_id });
    }

    pub fn publish_closure(&self, closure: ClosureStatus) {
        let _ = self.tx.send(LiveMessage::ClosureChanged { closure });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Who is watching a live socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// Sees every order event
    Staff,
    /// Sees only events for their own orders
    Customer(Uuid),
}

impl Viewer {
    /// Whether this viewer may receive `msg`
    ///
    /// Closure changes go to everyone; removals only concern the kitchen
    /// board since customers never see drafts being swept.
    pub fn can_see(&self, msg: &LiveMessage) -> bool {
        match (self, msg) {
            (_, LiveMessage::ClosureChanged { .. }) | (_, LiveMessage::Ready { .. }) => true,
            (Viewer::Staff, _) => true,
            (Viewer::Customer(user_id), LiveMessage::OrderUpdated { .. }) => {
                msg.order_owner() == Some(*user_id)
            }
            (Viewer::Customer(_), LiveMessage::OrderRemoved { .. }) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{Order, OrderStatus, OrderType, PaymentStatus};

    fn make_order(user_id: Option<Uuid>) -> OrderDetail {
        OrderDetail {
            order: Order {
                id: Uuid::new_v4(),
                user_id,
                order_number: "LL000001".into(),
                customer_name: None,
                customer_email: None,
                customer_phone: Some("0821234567".into()),
                subtotal: Decimal::new(5000, 2),
                delivery_fee: Decimal::ZERO,
                total_amount: Decimal::new(5000, 2),
                status: OrderStatus::Confirmed,
                payment_status: PaymentStatus::Paid,
                payment_provider: Some("yoco".into()),
                payment_reference: None,
                order_type: OrderType::Pickup,
                delivery_address: None,
                delivery_zone: None,
                special_instructions: None,
                estimated_ready_time: None,
                paid_at: None,
                completed_at: None,
                created_at: 0,
                updated_at: 0,
            },
            items: vec![],
        }
    }

    #[tokio::test]
    async fn subscribe_receives_updates_and_removals() {
        let hub = LiveOrderHub::new();
        let mut rx = hub.subscribe();

        let order = make_order(None);
        let order_id = order.order.id;
        hub.publish_update(order);
        match rx.recv().await.unwrap() {
            LiveMessage::OrderUpdated { order } => assert_eq!(order.order.id, order_id),
            other => panic!("Expected OrderUpdated, got {other:?}"),
        }

        hub.publish_remove(order_id);
        match rx.recv().await.unwrap() {
            LiveMessage::OrderRemoved { order_id: removed } => assert_eq!(removed, order_id),
            other => panic!("Expected OrderRemoved, got {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let hub = LiveOrderHub::new();
        assert_eq!(hub.subscriber_count(), 0);
        hub.publish_closure(ClosureStatus::open());
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told() {
        let hub = LiveOrderHub::new();
        let mut rx = hub.subscribe();
        for _ in 0..(BROADCAST_CAPACITY + 1) {
            hub.publish_closure(ClosureStatus::open());
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }

    #[test]
    fn customers_only_see_their_own_orders() {
        let me = Uuid::new_v4();
        let viewer = Viewer::Customer(me);

        let mine = LiveMessage::OrderUpdated {
            order: Box::new(make_order(Some(me))),
        };
        let theirs = LiveMessage::OrderUpdated {
            order: Box::new(make_order(Some(Uuid::new_v4()))),
        };
        let removed = LiveMessage::OrderRemoved {
            order_id: Uuid::new_v4(),
        };
        let closure = LiveMessage::ClosureChanged {
            closure: ClosureStatus::open(),
        };

        assert!(viewer.can_see(&mine));
        assert!(!viewer.can_see(&theirs));
        assert!(!viewer.can_see(&removed));
        assert!(viewer.can_see(&closure));

        assert!(Viewer::Staff.can_see(&theirs));
        assert!(Viewer::Staff.can_see(&removed));
    }
}
