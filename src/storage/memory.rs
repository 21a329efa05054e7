use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Document, DocumentStore, StoreError};
use crate::domain::tenant::TenantId;

struct Entry {
    tenant: TenantId,
    body: Value,
}

/// In-process document store. Bodies are kept as JSON values so field
/// lookups behave the same as the Postgres `body ->> field` queries.
pub struct MemoryDocumentStore<T: Document> {
    // keyed by (insertion sequence, id) so listings keep insertion order
    entries: RwLock<BTreeMap<(u64, Uuid), Entry>>,
    sequence: std::sync::atomic::AtomicU64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Document> MemoryDocumentStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            sequence: std::sync::atomic::AtomicU64::new(0),
            _phantom: PhantomData,
        }
    }

    fn decode<'a>(entries: impl Iterator<Item = &'a Entry>) -> Result<Vec<T>, StoreError> {
        entries
            .map(|e| serde_json::from_value(e.body.clone()).map_err(StoreError::from))
            .collect()
    }
}

impl<T: Document> Default for MemoryDocumentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn field_matches(body: &Value, field: &str, value: &str) -> bool {
    body.get(field)
        .and_then(Value::as_str)
        .is_some_and(|v| v.eq_ignore_ascii_case(value))
}

fn key_of(map: &BTreeMap<(u64, Uuid), Entry>, id: Uuid) -> Option<(u64, Uuid)> {
    map.keys().find(|(_, k)| *k == id).copied()
}

#[async_trait]
impl<T: Document> DocumentStore<T> for MemoryDocumentStore<T> {
    async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        let mut entries = self.entries.write().await;

        if key_of(&entries, doc.id()).is_some() {
            return Err(StoreError::Duplicate {
                collection: T::COLLECTION,
                id: doc.id(),
            });
        }

        let seq = self.sequence.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        entries.insert(
            (seq, doc.id()),
            Entry {
                tenant: doc.tenant_id(),
                body,
            },
        );
        Ok(())
    }

    async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<T>, StoreError> {
        let entries = self.entries.read().await;
        let found = entries
            .iter()
            .find(|((_, k), e)| *k == id && e.tenant == tenant)
            .map(|(_, e)| e);
        Ok(Self::decode(found.into_iter())?.pop())
    }

    async fn list(&self, tenant: TenantId) -> Result<Vec<T>, StoreError> {
        let entries = self.entries.read().await;
        Self::decode(entries.values().filter(|e| e.tenant == tenant))
    }

    async fn update(&self, doc: &T) -> Result<(), StoreError> {
        let body = serde_json::to_value(doc)?;
        let mut entries = self.entries.write().await;

        let entry = key_of(&entries, doc.id())
            .and_then(|key| entries.get_mut(&key))
            .filter(|e| e.tenant == doc.tenant_id())
            .ok_or(StoreError::NotFound {
                collection: T::COLLECTION,
                id: doc.id(),
            })?;
        entry.body = body;
        Ok(())
    }

    async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        let key = key_of(&entries, id)
            .filter(|key| entries.get(key).is_some_and(|e| e.tenant == tenant))
            .ok_or(StoreError::NotFound {
                collection: T::COLLECTION,
                id,
            })?;
        entries.remove(&key);
        Ok(())
    }

    async fn save_versioned(&self, doc: &T, version: i64) -> Result<bool, StoreError> {
        let body = serde_json::to_value(doc)?;
        let mut entries = self.entries.write().await;

        match key_of(&entries, doc.id()).and_then(|key| entries.get_mut(&key)) {
            Some(entry) => {
                let stored = entry.body.get("version").and_then(Value::as_i64).unwrap_or(-1);
                if entry.tenant != doc.tenant_id() || stored >= version {
                    return Ok(false);
                }
                entry.body = body;
            }
            None => {
                let seq = self.sequence.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                entries.insert(
                    (seq, doc.id()),
                    Entry {
                        tenant: doc.tenant_id(),
                        body,
                    },
                );
            }
        }
        Ok(true)
    }

    async fn find_by_field(&self, tenant: TenantId, field: &str, value: &str) -> Result<Vec<T>, StoreError> {
        let entries = self.entries.read().await;
        Self::decode(
            entries
                .values()
                .filter(|e| e.tenant == tenant && field_matches(&e.body, field, value)),
        )
    }

    async fn list_all(&self) -> Result<Vec<T>, StoreError> {
        let entries = self.entries.read().await;
        Self::decode(entries.values())
    }

    async fn find_any_by_field(&self, field: &str, value: &str) -> Result<Vec<T>, StoreError> {
        let entries = self.entries.read().await;
        Self::decode(entries.values().filter(|e| field_matches(&e.body, field, value)))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
