use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::event_store::{check_sequence, EventStore, EventStoreError};
use crate::domain::tenant::TenantId;
use crate::event_sourcing::core::{DomainEvent, EventEnvelope};

/// Event streams kept in process memory, keyed by aggregate id.
pub struct MemoryEventStore<E: DomainEvent> {
    streams: RwLock<HashMap<Uuid, (TenantId, Vec<EventEnvelope<E>>)>>,
}

impl<E: DomainEvent> MemoryEventStore<E> {
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: DomainEvent> Default for MemoryEventStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for MemoryEventStore<E> {
    async fn append_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError> {
        let new_version = check_sequence(aggregate_id, expected_version, &events)?;

        let mut streams = self.streams.write().await;
        let (owner, stream) = streams
            .entry(aggregate_id)
            .or_insert_with(|| (tenant, Vec::new()));

        let current = if *owner == tenant { stream.len() as i64 } else { -1 };
        if current != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current.max(0),
            });
        }

        let count = events.len();
        stream.extend(events);

        tracing::debug!(
            aggregate_id = %aggregate_id,
            tenant_id = %tenant,
            new_version = new_version,
            event_count = count,
            "Appended events to in-memory stream"
        );

        Ok(new_version)
    }

    async fn load_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
    ) -> Result<Vec<EventEnvelope<E>>, EventStoreError> {
        let streams = self.streams.read().await;
        Ok(match streams.get(&aggregate_id) {
            Some((owner, stream)) if *owner == tenant => stream.clone(),
            _ => Vec::new(),
        })
    }

    async fn current_version(&self, tenant: TenantId, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let streams = self.streams.read().await;
        Ok(match streams.get(&aggregate_id) {
            Some((owner, stream)) if *owner == tenant => stream.len() as i64,
            _ => 0,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct Ping(u32);

    impl DomainEvent for Ping {
        fn event_type(&self) -> &'static str {
            "Ping"
        }
    }

    fn envelope(tenant: TenantId, id: Uuid, seq: i64) -> EventEnvelope<Ping> {
        EventEnvelope::new(tenant, id, seq, Ping(seq as u32), Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_append_and_load_in_order() {
        let store = MemoryEventStore::<Ping>::new();
        let tenant = TenantId::new();
        let id = Uuid::new_v4();

        let v = store
            .append_events(tenant, id, 0, vec![envelope(tenant, id, 1), envelope(tenant, id, 2)])
            .await
            .unwrap();
        assert_eq!(v, 2);

        let v = store.append_events(tenant, id, 2, vec![envelope(tenant, id, 3)]).await.unwrap();
        assert_eq!(v, 3);

        let events = store.load_events(tenant, id).await.unwrap();
        let payloads: Vec<u32> = events.iter().map(|e| e.event_data.0).collect();
        assert_eq!(payloads, vec![1, 2, 3]);
        assert!(store.aggregate_exists(tenant, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_expected_version_is_rejected() {
        let store = MemoryEventStore::<Ping>::new();
        let tenant = TenantId::new();
        let id = Uuid::new_v4();

        store.append_events(tenant, id, 0, vec![envelope(tenant, id, 1)]).await.unwrap();

        let err = store
            .append_events(tenant, id, 0, vec![envelope(tenant, id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EventStoreError::ConcurrencyConflict { expected: 0, actual: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_sequence_gap_is_rejected() {
        let store = MemoryEventStore::<Ping>::new();
        let tenant = TenantId::new();
        let id = Uuid::new_v4();

        let err = store
            .append_events(tenant, id, 0, vec![envelope(tenant, id, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, EventStoreError::SequenceGap { sequence_number: 2, .. }));

        let err = store.append_events(tenant, id, 0, vec![]).await.unwrap_err();
        assert!(matches!(err, EventStoreError::EmptyAppend));
    }

    #[tokio::test]
    async fn test_streams_are_invisible_to_other_tenants() {
        let store = MemoryEventStore::<Ping>::new();
        let owner = TenantId::new();
        let other = TenantId::new();
        let id = Uuid::new_v4();

        store.append_events(owner, id, 0, vec![envelope(owner, id, 1)]).await.unwrap();

        assert!(store.load_events(other, id).await.unwrap().is_empty());
        assert_eq!(store.current_version(other, id).await.unwrap(), 0);
        assert!(store
            .append_events(other, id, 0, vec![envelope(other, id, 1)])
            .await
            .is_err());
    }
}
