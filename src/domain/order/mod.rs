// ============================================================================
// Order Domain - Business Logic for Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderStatus and its transition table, DeliveryAddress)
// - Events (OrderPlaced, OrderConfirmed, etc.)
// - Commands (PlaceOrder, Confirm, Cancel, etc.)
// - Errors (OrderError enum)
// - Aggregate (Order with business logic)
// - Service (pricing, persistence and the order read model)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod service;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use service::*;
