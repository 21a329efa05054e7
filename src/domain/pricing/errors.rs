use uuid::Uuid;

use super::money::Money;
use crate::domain::catalog::CatalogError;
use crate::storage::StoreError;

// ============================================================================
// Pricing Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Order must contain at least one line")]
    EmptyOrder,

    #[error("Quantity for item {menu_item_id} must be positive")]
    InvalidQuantity { menu_item_id: Uuid },

    #[error("Order subtotal {subtotal} is below the restaurant minimum of {minimum}")]
    BelowMinimum { minimum: Money, subtotal: Money },

    #[error("Order amount is too large")]
    Overflow,

    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
