//! Live order WebSocket protocol
//!
//! Server → Client: LiveMessage (push only; clients never send commands)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ClosureStatus, OrderDetail};

/// Server → Client push message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveMessage {
    /// Handshake done; carries the active orders visible to the subscriber
    Ready {
        orders: Vec<OrderDetail>,
        closure: ClosureStatus,
    },

    /// An order was created or changed
    OrderUpdated { order: Box<OrderDetail> },

    /// An order left the board (deleted draft)
    OrderRemoved { order_id: Uuid },

    /// Restaurant opened or closed
    ClosureChanged { closure: ClosureStatus },
}

impl LiveMessage {
    /// Owner of the order this message concerns, if any
    pub fn order_owner(&self) -> Option<Uuid> {
        match self {
            LiveMessage::OrderUpdated { order } => order.order.user_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_tagged_by_type() {
        let msg = LiveMessage::OrderRemoved {
            order_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "OrderRemoved");
        assert_eq!(json["order_id"], Uuid::nil().to_string());
    }
}
