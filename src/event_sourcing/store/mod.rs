// ============================================================================
// Event Sourcing Store - Persistence Layer
// ============================================================================
//
// Generic over the event type. Postgres for deployments, memory for local
// runs and tests.
//
// ============================================================================

pub mod event_store;
pub mod memory;
pub mod postgres;

pub use event_store::{load_aggregate, EventStore, EventStoreError};
pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;
