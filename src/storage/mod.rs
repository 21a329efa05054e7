// ============================================================================
// Document Storage
// ============================================================================
//
// Tenant-owned records (tenants, users, catalog, discounts, the order read
// model) are stored as JSON documents keyed by collection and id. Every
// tenant-scoped operation filters on the owning tenant, so a record of one
// tenant can never be read or modified through another.
//
// ============================================================================

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::{Category, MenuItem, MenuSection, Restaurant};
use crate::domain::identity::User;
use crate::domain::order::{Order, OrderEvent};
use crate::domain::pricing::Discount;
use crate::domain::tenant::{Tenant, TenantId};
use crate::event_sourcing::{EventStore, MemoryEventStore, PgEventStore};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection} {id} not found")]
    NotFound { collection: &'static str, id: Uuid },

    #[error("{collection} {id} already exists")]
    Duplicate { collection: &'static str, id: Uuid },

    #[error("Unique constraint violated in {0}")]
    UniqueViolation(&'static str),

    #[error("Stored document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A record that can be kept in a [`DocumentStore`].
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;

    fn tenant_id(&self) -> TenantId;
}

#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    async fn insert(&self, doc: &T) -> Result<(), StoreError>;

    async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<T>, StoreError>;

    async fn list(&self, tenant: TenantId) -> Result<Vec<T>, StoreError>;

    async fn update(&self, doc: &T) -> Result<(), StoreError>;

    async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<(), StoreError>;

    /// Insert `doc`, or replace the stored copy when its `version` body
    /// field is lower than `version`. Returns `false` when a copy at the
    /// same or a newer version is already stored.
    async fn save_versioned(&self, doc: &T, version: i64) -> Result<bool, StoreError>;

    /// Documents of `tenant` whose top-level string `field` equals `value`,
    /// compared case-insensitively.
    async fn find_by_field(&self, tenant: TenantId, field: &str, value: &str) -> Result<Vec<T>, StoreError>;

    /// Platform-wide listing, ignoring tenant ownership.
    async fn list_all(&self) -> Result<Vec<T>, StoreError>;

    /// Platform-wide lookup, ignoring tenant ownership.
    async fn find_any_by_field(&self, field: &str, value: &str) -> Result<Vec<T>, StoreError>;
}

/// Every store the service needs, behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub tenants: Arc<dyn DocumentStore<Tenant>>,
    pub users: Arc<dyn DocumentStore<User>>,
    pub restaurants: Arc<dyn DocumentStore<Restaurant>>,
    pub categories: Arc<dyn DocumentStore<Category>>,
    pub sections: Arc<dyn DocumentStore<MenuSection>>,
    pub items: Arc<dyn DocumentStore<MenuItem>>,
    pub discounts: Arc<dyn DocumentStore<Discount>>,
    pub orders: Arc<dyn DocumentStore<Order>>,
    pub order_events: Arc<dyn EventStore<OrderEvent>>,
}

impl Storage {
    pub fn in_memory() -> Self {
        Self {
            tenants: Arc::new(MemoryDocumentStore::new()),
            users: Arc::new(MemoryDocumentStore::new()),
            restaurants: Arc::new(MemoryDocumentStore::new()),
            categories: Arc::new(MemoryDocumentStore::new()),
            sections: Arc::new(MemoryDocumentStore::new()),
            items: Arc::new(MemoryDocumentStore::new()),
            discounts: Arc::new(MemoryDocumentStore::new()),
            orders: Arc::new(MemoryDocumentStore::new()),
            order_events: Arc::new(MemoryEventStore::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            tenants: Arc::new(PgDocumentStore::new(pool.clone())),
            users: Arc::new(PgDocumentStore::new(pool.clone())),
            restaurants: Arc::new(PgDocumentStore::new(pool.clone())),
            categories: Arc::new(PgDocumentStore::new(pool.clone())),
            sections: Arc::new(PgDocumentStore::new(pool.clone())),
            items: Arc::new(PgDocumentStore::new(pool.clone())),
            discounts: Arc::new(PgDocumentStore::new(pool.clone())),
            orders: Arc::new(PgDocumentStore::new(pool.clone())),
            order_events: Arc::new(PgEventStore::new(pool, "Order")),
        }
    }
}
