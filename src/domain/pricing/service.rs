use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::discount::*;
use super::errors::PricingError;
use crate::domain::catalog::CatalogService;
use crate::domain::tenant::TenantId;
use crate::storage::DocumentStore;

// ============================================================================
// Discount Service
// ============================================================================

#[derive(Clone)]
pub struct DiscountService {
    discounts: Arc<dyn DocumentStore<Discount>>,
    catalog: CatalogService,
}

impl DiscountService {
    pub fn new(discounts: Arc<dyn DocumentStore<Discount>>, catalog: CatalogService) -> Self {
        Self { discounts, catalog }
    }

    /// Scope targets must exist, and items and variants must be on this
    /// restaurant's menu.
    async fn check_scope(&self, tenant: TenantId, restaurant_id: Uuid, scope: DiscountScope) -> Result<(), PricingError> {
        match scope {
            DiscountScope::Restaurant => {}
            DiscountScope::Category(id) => {
                self.catalog.get_category(tenant, id).await?;
            }
            DiscountScope::Item(id) => {
                self.catalog.get_item(tenant, restaurant_id, id).await?;
            }
            DiscountScope::Variant(id) => {
                let on_menu = self
                    .catalog
                    .list_items(tenant, restaurant_id)
                    .await?
                    .iter()
                    .any(|item| item.variant(id).is_some());
                if !on_menu {
                    return Err(PricingError::NotFound { entity: "Variant", id });
                }
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        input: DiscountCreate,
    ) -> Result<Discount, PricingError> {
        self.catalog.get_restaurant(tenant, restaurant_id).await?;
        validate_rule(&input.name, &input.kind, input.starts_at, input.ends_at)?;
        self.check_scope(tenant, restaurant_id, input.scope).await?;

        let now = Utc::now();
        let discount = Discount {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            restaurant_id,
            name: input.name.trim().to_string(),
            scope: input.scope,
            kind: input.kind,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        self.discounts.insert(&discount).await?;
        tracing::info!(
            discount_id = %discount.id,
            restaurant_id = %restaurant_id,
            scope = discount.scope.as_str(),
            "Discount created"
        );
        Ok(discount)
    }

    pub async fn get(&self, tenant: TenantId, restaurant_id: Uuid, id: Uuid) -> Result<Discount, PricingError> {
        self.discounts
            .get(tenant, id)
            .await?
            .filter(|d| d.restaurant_id == restaurant_id)
            .ok_or(PricingError::NotFound { entity: "Discount", id })
    }

    pub async fn list(&self, tenant: TenantId, restaurant_id: Uuid) -> Result<Vec<Discount>, PricingError> {
        self.catalog.get_restaurant(tenant, restaurant_id).await?;
        let mut discounts = self.for_restaurant(tenant, restaurant_id).await?;
        discounts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(discounts)
    }

    /// Discounts of a restaurant that can be applied at `now`.
    pub async fn live(&self, tenant: TenantId, restaurant_id: Uuid, now: DateTime<Utc>) -> Result<Vec<Discount>, PricingError> {
        let mut discounts = self.for_restaurant(tenant, restaurant_id).await?;
        discounts.retain(|d| d.is_live(now));
        Ok(discounts)
    }

    async fn for_restaurant(&self, tenant: TenantId, restaurant_id: Uuid) -> Result<Vec<Discount>, PricingError> {
        Ok(self
            .discounts
            .find_by_field(tenant, "restaurant_id", &restaurant_id.to_string())
            .await?)
    }

    pub async fn update(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        id: Uuid,
        patch: DiscountUpdate,
    ) -> Result<Discount, PricingError> {
        let mut discount = self.get(tenant, restaurant_id, id).await?;

        if let Some(name) = patch.name {
            discount.name = name.trim().to_string();
        }
        if let Some(scope) = patch.scope {
            self.check_scope(tenant, restaurant_id, scope).await?;
            discount.scope = scope;
        }
        if let Some(kind) = patch.kind {
            discount.kind = kind;
        }
        if let Some(starts_at) = patch.starts_at {
            discount.starts_at = starts_at;
        }
        if let Some(ends_at) = patch.ends_at {
            discount.ends_at = ends_at;
        }
        if let Some(active) = patch.is_active {
            discount.is_active = active;
        }
        discount.validate()?;
        discount.updated_at = Utc::now();

        self.discounts.update(&discount).await?;
        Ok(discount)
    }

    pub async fn delete(&self, tenant: TenantId, restaurant_id: Uuid, id: Uuid) -> Result<(), PricingError> {
        self.get(tenant, restaurant_id, id).await?;
        self.discounts.delete(tenant, id).await?;
        Ok(())
    }
}
