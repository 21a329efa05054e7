use uuid::Uuid;

use crate::storage::StoreError;

// ============================================================================
// Catalog Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0} name cannot be empty")]
    EmptyName(&'static str),

    #[error("{field} cannot be negative")]
    NegativeAmount { field: &'static str },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Menu section {section_id} does not belong to restaurant {restaurant_id}")]
    SectionMismatch { section_id: Uuid, restaurant_id: Uuid },

    #[error("{entity} {id} is still referenced by {dependents}")]
    InUse {
        entity: &'static str,
        id: Uuid,
        dependents: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
