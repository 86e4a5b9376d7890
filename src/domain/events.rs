use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::{Order, OrderItem};

pub const AGGREGATE_TYPE: &str = "Order";

/// A line of a placed order, as far as downstream consumers care.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub total_amount: BigDecimal,
    pub lines: Vec<PlacedLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    /// Status code as text, e.g. `DELIVERED`.
    pub status: String,
    pub description: String,
    pub is_pay: bool,
    pub wallet_transferred: bool,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub reason: Option<String>,
    pub is_pay: bool,
    pub wallet_transferred: bool,
    pub total_amount: BigDecimal,
}

/// Domain events written to the outbox alongside the state change that
/// produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderStatusChanged),
    OrderCancelled(OrderCancelled),
}

impl OrderEvent {
    pub fn placed(order: &Order, items: &[OrderItem]) -> Self {
        OrderEvent::OrderPlaced(OrderPlaced {
            order_id: order.id,
            user_id: order.user_id,
            shop_id: order.shop_id,
            total_amount: order.total_amount.clone(),
            lines: items
                .iter()
                .map(|i| PlacedLine {
                    product_id: i.product_id,
                    variant_id: i.variant_id,
                    quantity: i.quantity,
                })
                .collect(),
        })
    }

    pub fn status_changed(order: &Order, description: &str) -> Self {
        OrderEvent::OrderStatusChanged(OrderStatusChanged {
            order_id: order.id,
            user_id: order.user_id,
            shop_id: order.shop_id,
            status: order.status.as_str().to_string(),
            description: description.to_string(),
            is_pay: order.is_pay,
            wallet_transferred: order.wallet_transferred,
            total_amount: order.total_amount.clone(),
        })
    }

    pub fn cancelled(order: &Order) -> Self {
        OrderEvent::OrderCancelled(OrderCancelled {
            order_id: order.id,
            user_id: order.user_id,
            shop_id: order.shop_id,
            reason: order.cancellation_reason.clone(),
            is_pay: order.is_pay,
            wallet_transferred: order.wallet_transferred,
            total_amount: order.total_amount.clone(),
        })
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::OrderStatusChanged(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
        }
    }
}
