use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::tenant::TenantId;
use crate::event_sourcing::core::{Aggregate, DomainEvent, EventEnvelope};

// ============================================================================
// Event Store - Repository for Events
// ============================================================================
//
// Responsibilities:
// 1. Append events to a stream (append-only)
// 2. Load event history for aggregates
// 3. Optimistic concurrency control on the stream version
//
// Every stream is owned by exactly one tenant; reads and writes are always
// scoped by it.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    #[error("Concurrency conflict on {aggregate_id}: expected version {expected}, but current is {actual}")]
    ConcurrencyConflict {
        aggregate_id: Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("Cannot append empty event list")]
    EmptyAppend,

    #[error("Event sequence for {aggregate_id} is not contiguous at {sequence_number}")]
    SequenceGap {
        aggregate_id: Uuid,
        sequence_number: i64,
    },

    #[error("Failed to replay aggregate {aggregate_id}: {reason}")]
    Replay { aggregate_id: Uuid, reason: String },

    #[error("Event payload error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait EventStore<E: DomainEvent>: Send + Sync {
    /// Append events to the stream.
    /// Returns the new version number after appending.
    async fn append_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError>;

    /// Load all events for an aggregate, ordered by sequence number
    async fn load_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
    ) -> Result<Vec<EventEnvelope<E>>, EventStoreError>;

    /// Current version of the stream, 0 when it does not exist
    async fn current_version(&self, tenant: TenantId, aggregate_id: Uuid) -> Result<i64, EventStoreError>;

    async fn aggregate_exists(&self, tenant: TenantId, aggregate_id: Uuid) -> Result<bool, EventStoreError> {
        Ok(self.current_version(tenant, aggregate_id).await? > 0)
    }
}

/// Validate that envelopes continue the stream right after `expected_version`.
pub(crate) fn check_sequence<E>(
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[EventEnvelope<E>],
) -> Result<i64, EventStoreError> {
    if events.is_empty() {
        return Err(EventStoreError::EmptyAppend);
    }

    let mut next = expected_version;
    for envelope in events {
        next += 1;
        if envelope.sequence_number != next || envelope.aggregate_id != aggregate_id {
            return Err(EventStoreError::SequenceGap {
                aggregate_id,
                sequence_number: envelope.sequence_number,
            });
        }
    }

    Ok(next)
}

/// Load an aggregate by replaying its stream. `None` when the stream is empty.
pub async fn load_aggregate<A, S>(
    store: &S,
    tenant: TenantId,
    aggregate_id: Uuid,
) -> Result<Option<A>, EventStoreError>
where
    A: Aggregate,
    A::Event: DomainEvent,
    A::Error: std::fmt::Display,
    S: EventStore<A::Event> + ?Sized,
{
    let events = store.load_events(tenant, aggregate_id).await?;
    if events.is_empty() {
        return Ok(None);
    }

    A::load_from_events(&events)
        .map(Some)
        .map_err(|e| EventStoreError::Replay {
            aggregate_id,
            reason: e.to_string(),
        })
}
