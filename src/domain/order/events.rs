use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{DeliveryAddress, OrderLine, OrderStatus};
use crate::domain::pricing::Money;
use crate::domain::tenant::TenantId;
use crate::event_sourcing::core::DomainEvent;

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    Confirmed(OrderConfirmed),
    ReadyForPickup(OrderReadyForPickup),
    OutForDelivery(OrderOutForDelivery),
    Delivered(OrderDelivered),
    Canceled(OrderCanceled),
    Failed(OrderFailed),
}

impl OrderEvent {
    /// The status an order is in after this event
    pub fn status(&self) -> OrderStatus {
        match self {
            OrderEvent::Placed(_) => OrderStatus::Pending,
            OrderEvent::Confirmed(_) => OrderStatus::Confirmed,
            OrderEvent::ReadyForPickup(_) => OrderStatus::ReadyForPickup,
            OrderEvent::OutForDelivery(_) => OrderStatus::OutForDelivery,
            OrderEvent::Delivered(_) => OrderStatus::Delivered,
            OrderEvent::Canceled(_) => OrderStatus::Canceled,
            OrderEvent::Failed(_) => OrderStatus::Failed,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::Confirmed(_) => "OrderConfirmed",
            OrderEvent::ReadyForPickup(_) => "OrderReadyForPickup",
            OrderEvent::OutForDelivery(_) => "OrderOutForDelivery",
            OrderEvent::Delivered(_) => "OrderDelivered",
            OrderEvent::Canceled(_) => "OrderCanceled",
            OrderEvent::Failed(_) => "OrderFailed",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Placed - Initial event in order lifecycle, carries the priced order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub tenant_id: TenantId,
    pub restaurant_id: Uuid,
    pub customer_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub delivery_address: DeliveryAddress,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub placed_at: DateTime<Utc>,
}

/// Order Confirmed - Restaurant accepted the order
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderConfirmed {
    pub confirmed_at: DateTime<Utc>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderReadyForPickup {
    pub ready_at: DateTime<Utc>,
}

/// Order Out For Delivery - Handed to a courier
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderOutForDelivery {
    pub courier: Option<String>,
    pub dispatched_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderDelivered {
    pub delivered_at: DateTime<Utc>,
}

/// Order Canceled - Order lifecycle ended before dispatch
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCanceled {
    pub reason: Option<String>,
    pub canceled_by: Option<Uuid>,
    pub canceled_at: DateTime<Utc>,
}

/// Order Failed - Order could not be fulfilled after confirmation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderFailed {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}
