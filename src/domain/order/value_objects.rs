use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::pricing::PricedLine;

// ============================================================================
// Order Value Objects
// ============================================================================

/// A priced line as frozen into the order when it was placed
pub type OrderLine = PricedLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    ReadyForPickup,
    OutForDelivery,
    Delivered,
    Canceled,
    Failed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::ReadyForPickup,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
        OrderStatus::Failed,
    ];

    /// Allowed moves of the lifecycle. No state can be skipped and terminal
    /// states have no way out.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, ReadyForPickup)
                | (ReadyForPickup, OutForDelivery)
                | (OutForDelivery, Delivered)
                | (Pending | Confirmed | ReadyForPickup, Canceled)
                | (Confirmed | ReadyForPickup | OutForDelivery, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled | OrderStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub instructions: Option<String>,
}

impl DeliveryAddress {
    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.postal_code]
            .iter()
            .all(|part| !part.trim().is_empty())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
