// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// One subdirectory per bounded area:
// - tenant:   tenant registry and slug resolution
// - identity: users, roles, password hashing and access tokens
// - catalog:  restaurants, categories, menu sections, items and variants
// - pricing:  money, discount rules and order quotes
// - order:    the event-sourced order aggregate and its lifecycle
//
// Services here talk to storage only through the traits in `crate::storage`
// and `crate::event_sourcing`.
//
// ============================================================================

pub mod tenant;
pub mod identity;
pub mod catalog;
pub mod pricing;
pub mod order;
