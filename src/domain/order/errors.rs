use uuid::Uuid;

use super::value_objects::OrderStatus;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order is already {0}")]
    AlreadyInStatus(OrderStatus),

    #[error("Order items cannot be empty")]
    EmptyItems,

    #[error("Invalid quantity for item {menu_item_id}")]
    InvalidQuantity { menu_item_id: Uuid },

    #[error("Delivery address is incomplete")]
    IncompleteAddress,

    #[error("Order has already been placed")]
    AlreadyPlaced,

    #[error("Aggregate not initialized")]
    NotInitialized,

    #[error("A failure reason is required")]
    MissingFailureReason,
}
