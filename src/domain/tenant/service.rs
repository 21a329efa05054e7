use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::model::{is_valid_slug, Tenant, TenantCreate, TenantId, TenantUpdate};
use crate::storage::{DocumentStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant name cannot be empty")]
    EmptyName,

    #[error("Invalid tenant slug: {0}")]
    InvalidSlug(String),

    #[error("Tenant slug already in use: {0}")]
    SlugTaken(String),

    #[error("Tenant not found: {0}")]
    NotFound(String),

    #[error("Tenant is inactive: {0}")]
    Inactive(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct TenantService {
    tenants: Arc<dyn DocumentStore<Tenant>>,
}

impl TenantService {
    pub fn new(tenants: Arc<dyn DocumentStore<Tenant>>) -> Self {
        Self { tenants }
    }

    pub async fn create(&self, input: TenantCreate) -> Result<Tenant, TenantError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(TenantError::EmptyName);
        }
        let slug = input.slug.trim().to_string();
        if !is_valid_slug(&slug) {
            return Err(TenantError::InvalidSlug(slug));
        }
        if !self.tenants.find_any_by_field("slug", &slug).await?.is_empty() {
            return Err(TenantError::SlugTaken(slug));
        }

        let now = Utc::now();
        let tenant = Tenant {
            id: TenantId::new(),
            name,
            slug,
            contact_email: input.contact_email,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.tenants.insert(&tenant).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => TenantError::SlugTaken(tenant.slug.clone()),
            other => other.into(),
        })?;

        tracing::info!(tenant_id = %tenant.id, slug = %tenant.slug, "Tenant created");
        Ok(tenant)
    }

    pub async fn get(&self, id: Uuid) -> Result<Tenant, TenantError> {
        let tenant_id = TenantId::from(id);
        self.tenants
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| TenantError::NotFound(id.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, TenantError> {
        let mut tenants = self.tenants.list_all().await?;
        tenants.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(tenants)
    }

    pub async fn update(&self, id: Uuid, patch: TenantUpdate) -> Result<Tenant, TenantError> {
        let mut tenant = self.get(id).await?;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(TenantError::EmptyName);
            }
            tenant.name = name;
        }
        if let Some(email) = patch.contact_email {
            tenant.contact_email = Some(email);
        }
        if let Some(active) = patch.is_active {
            tenant.is_active = active;
        }
        tenant.updated_at = Utc::now();

        self.tenants.update(&tenant).await?;
        Ok(tenant)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), TenantError> {
        self.tenants.delete(TenantId::from(id), id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => TenantError::NotFound(id.to_string()),
            other => other.into(),
        })?;
        tracing::info!(tenant_id = %id, "Tenant deleted");
        Ok(())
    }

    /// Resolve an active tenant by slug.
    pub async fn resolve(&self, slug: &str) -> Result<Tenant, TenantError> {
        let tenant = self
            .tenants
            .find_any_by_field("slug", slug)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TenantError::NotFound(slug.to_string()))?;

        if !tenant.is_active {
            return Err(TenantError::Inactive(tenant.slug));
        }
        Ok(tenant)
    }
}
