use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use std::marker::PhantomData;
use uuid::Uuid;

use super::event_store::{check_sequence, EventStore, EventStoreError};
use crate::domain::tenant::TenantId;
use crate::event_sourcing::core::{DomainEvent, EventEnvelope};

// ============================================================================
// Postgres Event Store
// ============================================================================
//
// One `event_store` table shared by every aggregate type. The primary key
// (aggregate_type, aggregate_id, sequence_number) makes two writers racing
// on the same version collide; the loser sees a concurrency conflict.
//
// ============================================================================

type EventRow<E> = (
    Uuid,
    i64,
    Uuid,
    Uuid,
    String,
    i32,
    Json<E>,
    Option<Uuid>,
    Uuid,
    Option<Uuid>,
    Json<HashMap<String, String>>,
    DateTime<Utc>,
);

pub struct PgEventStore<E: DomainEvent> {
    pool: PgPool,
    aggregate_type_name: String, // e.g., "Order"
    _phantom: PhantomData<fn() -> E>,
}

impl<E: DomainEvent> PgEventStore<E> {
    pub fn new(pool: PgPool, aggregate_type_name: &str) -> Self {
        Self {
            pool,
            aggregate_type_name: aggregate_type_name.to_string(),
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<E: DomainEvent> EventStore<E> for PgEventStore<E> {
    async fn append_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
        expected_version: i64,
        events: Vec<EventEnvelope<E>>,
    ) -> Result<i64, EventStoreError> {
        let new_version = check_sequence(aggregate_id, expected_version, &events)?;

        let mut tx = self.pool.begin().await?;

        let (current,): (i64,) = sqlx::query_as(
            "select coalesce(max(sequence_number), 0)::bigint
             from event_store
             where aggregate_type = $1 and aggregate_id = $2 and tenant_id = $3",
        )
        .bind(&self.aggregate_type_name)
        .bind(aggregate_id)
        .bind(tenant.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        if current != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual: current,
            });
        }

        for envelope in &events {
            let inserted = sqlx::query(
                "insert into event_store (
                    aggregate_type, aggregate_id, sequence_number, tenant_id, event_id,
                    event_type, event_version, event_data, causation_id, correlation_id,
                    user_id, metadata, timestamp
                ) values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(&self.aggregate_type_name)
            .bind(aggregate_id)
            .bind(envelope.sequence_number)
            .bind(tenant.as_uuid())
            .bind(envelope.event_id)
            .bind(&envelope.event_type)
            .bind(envelope.event_version)
            .bind(Json(&envelope.event_data))
            .bind(envelope.causation_id)
            .bind(envelope.correlation_id)
            .bind(envelope.user_id)
            .bind(Json(&envelope.metadata))
            .bind(envelope.timestamp)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: expected_version,
                        actual: envelope.sequence_number,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;

        tracing::info!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            tenant_id = %tenant,
            new_version = new_version,
            event_count = events.len(),
            "✅ Appended events to event store"
        );

        Ok(new_version)
    }

    async fn load_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
    ) -> Result<Vec<EventEnvelope<E>>, EventStoreError> {
        let rows: Vec<EventRow<E>> = sqlx::query_as(
            "select aggregate_id, sequence_number, tenant_id, event_id, event_type, event_version,
                    event_data, causation_id, correlation_id, user_id, metadata, timestamp
             from event_store
             where aggregate_type = $1 and aggregate_id = $2 and tenant_id = $3
             order by sequence_number asc",
        )
        .bind(&self.aggregate_type_name)
        .bind(aggregate_id)
        .bind(tenant.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let events: Vec<EventEnvelope<E>> = rows
            .into_iter()
            .map(
                |(
                    aggregate_id,
                    sequence_number,
                    tenant_id,
                    event_id,
                    event_type,
                    event_version,
                    Json(event_data),
                    causation_id,
                    correlation_id,
                    user_id,
                    Json(metadata),
                    timestamp,
                )| EventEnvelope {
                    event_id,
                    aggregate_id,
                    tenant_id: TenantId::from(tenant_id),
                    sequence_number,
                    event_type,
                    event_version,
                    event_data,
                    causation_id,
                    correlation_id,
                    user_id,
                    timestamp,
                    metadata,
                },
            )
            .collect();

        tracing::debug!("Loaded {} events for aggregate {}", events.len(), aggregate_id);
        Ok(events)
    }

    async fn current_version(&self, tenant: TenantId, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let (version,): (i64,) = sqlx::query_as(
            "select coalesce(max(sequence_number), 0)::bigint
             from event_store
             where aggregate_type = $1 and aggregate_id = $2 and tenant_id = $3",
        )
        .bind(&self.aggregate_type_name)
        .bind(aggregate_id)
        .bind(tenant.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(version)
    }
}
