//! Order Model

use super::delivery::GeoPoint;
use super::text_enum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Status Enums
// ============================================================================

/// Order lifecycle status
///
/// ```text
/// draft ──pay──▶ confirmed ──▶ preparing ──▶ ready ──▶ completed
///   │  ╲                │             │
///   │   pending ─pay─▶──┘             │
///   ▼        ▼          ▼             ▼
/// cancelled (from draft, pending, confirmed, preparing)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, not yet paid
    #[default]
    Draft,
    /// Awaiting cash or manual payment
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

text_enum!(OrderStatus, "order status", {
    Draft => "draft",
    Pending => "pending",
    Confirmed => "confirmed",
    Preparing => "preparing",
    Ready => "ready",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Statuses shown on the kitchen board by default
    pub const ACTIVE: [OrderStatus; 3] = [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ];

    /// Whether `next` is a legal successor of this status.
    ///
    /// Re-applying the current status is not a transition.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Draft, Pending | Confirmed | Cancelled)
                | (Pending, Confirmed | Cancelled)
                | (Confirmed, Preparing | Cancelled)
                | (Preparing, Ready | Cancelled)
                | (Ready, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// Only unpaid orders may start a payment
    pub fn is_payable(self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Pending)
    }
}

/// Payment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Cancelled,
    Expired,
    Refunded,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Cancelled => "cancelled",
    Expired => "expired",
    Refunded => "refunded",
});

/// How the customer receives the order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    Pickup,
    DineIn,
    Delivery,
}

text_enum!(OrderType, "order type", {
    Pickup => "pickup",
    DineIn => "dine_in",
    Delivery => "delivery",
});

/// Payment gateway that settled the order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Yoco,
    Payfast,
    Cash,
}

text_enum!(PaymentProvider, "payment provider", {
    Yoco => "yoco",
    Payfast => "payfast",
    Cash => "cash",
});

// ============================================================================
// Rows
// ============================================================================

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    /// `LL` followed by the zero-padded sequence value
    pub order_number: String,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total_amount: Decimal,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: OrderStatus,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub payment_status: PaymentStatus,
    /// `yoco` / `payfast` / `cash` once a payment was started
    pub payment_provider: Option<String>,
    /// Gateway checkout id or PayFast payment id
    pub payment_reference: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub order_type: OrderType,
    pub delivery_address: Option<String>,
    pub delivery_zone: Option<String>,
    pub special_instructions: Option<String>,
    pub estimated_ready_time: Option<i64>,
    pub paid_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Abandoned checkout: a draft created before `cutoff` (epoch ms)
    pub fn is_stale_draft(&self, cutoff: i64) -> bool {
        self.status == OrderStatus::Draft && self.created_at < cutoff
    }
}

/// Order line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// None for custom lines (e.g. build-your-own items)
    pub menu_item_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub customizations: Option<Value>,
    pub special_requests: Option<String>,
    pub created_at: i64,
}

/// Order with its lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// ============================================================================
// Payloads
// ============================================================================

/// Checkout request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[serde(default)]
    pub order_type: OrderType,
    pub delivery_address: Option<String>,
    pub delivery_location: Option<GeoPoint>,
    #[serde(default)]
    pub customer: CustomerInfo,
    pub special_instructions: Option<String>,
}

/// One cart line as submitted by the client
///
/// `name` and `unit_price` are only honoured for custom lines; regular
/// lines are always priced from the menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub menu_item_id: Option<Uuid>,
    pub quantity: i32,
    pub customization: Option<Value>,
    pub name: Option<String>,
    pub unit_price: Option<Decimal>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Kitchen status change body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub estimated_ready_minutes: Option<i64>,
}

/// Kitchen dashboard counters for the current UTC day
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KitchenAnalytics {
    pub orders_today: i64,
    pub revenue_today: Decimal,
    /// Paid orders not yet picked up by the kitchen
    pub awaiting_preparation: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        use OrderStatus::*;
        assert!(Draft.can_transition_to(Confirmed));
        assert!(Draft.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Preparing));
        assert!(Preparing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Completed));
    }

    #[test]
    fn test_cancellation_allowed_until_ready() {
        use OrderStatus::*;
        for from in [Draft, Pending, Confirmed, Preparing] {
            assert!(from.can_transition_to(Cancelled), "{from} -> cancelled");
        }
        assert!(!Ready.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Cancelled));
    }

    #[test]
    fn test_rejected_transitions() {
        use OrderStatus::*;
        assert!(!Draft.can_transition_to(Preparing));
        assert!(!Confirmed.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Preparing));
        assert!(!Completed.can_transition_to(Ready));
        assert!(!Cancelled.can_transition_to(Confirmed));
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(*status), "{status} -> itself");
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_successor() {
        for from in OrderStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in OrderStatus::ALL {
                assert!(!from.can_transition_to(*to));
            }
        }
    }

    fn order_at(status: OrderStatus, created_at: i64) -> Order {
        Order {
            id: Uuid::nil(),
            user_id: None,
            order_number: "LL000001".into(),
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            subtotal: Decimal::ONE,
            delivery_fee: Decimal::ZERO,
            total_amount: Decimal::ONE,
            status,
            payment_status: PaymentStatus::Pending,
            payment_provider: None,
            payment_reference: None,
            order_type: OrderType::Pickup,
            delivery_address: None,
            delivery_zone: None,
            special_instructions: None,
            estimated_ready_time: None,
            paid_at: None,
            completed_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_stale_drafts() {
        let cutoff = 1_000;
        assert!(order_at(OrderStatus::Draft, 999).is_stale_draft(cutoff));
        assert!(!order_at(OrderStatus::Draft, 1_000).is_stale_draft(cutoff));
        assert!(!order_at(OrderStatus::Pending, 0).is_stale_draft(cutoff));
        assert!(!order_at(OrderStatus::Cancelled, 0).is_stale_draft(cutoff));
    }

    #[test]
    fn test_db_text_roundtrip() {
        assert_eq!(OrderType::DineIn.as_db(), "dine_in");
        assert_eq!(OrderType::from_db("dine_in"), Some(OrderType::DineIn));
        assert_eq!(PaymentStatus::from_db("PAID"), None);

        let err = OrderStatus::try_from("shipped".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "invalid order status value: shipped");
    }

    #[test]
    fn test_serde_matches_db_text() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_db()));
        }
    }

    #[test]
    fn test_checkout_request_defaults() {
        let req: CheckoutRequest = serde_json::from_str(
            r#"{"items":[{"menu_item_id":null,"quantity":1,"name":"Custom bowl","unit_price":45.5}]}"#,
        )
        .unwrap();
        assert_eq!(req.order_type, OrderType::Pickup);
        assert!(req.customer.phone.is_none());
        assert_eq!(req.items[0].unit_price, Some(Decimal::new(455, 1)));
    }
}
