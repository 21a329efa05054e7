use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::CatalogError;
use super::model::*;
use crate::domain::pricing::{Discount, DiscountScope, Money};
use crate::domain::tenant::TenantId;
use crate::storage::{DocumentStore, StoreError};

// ============================================================================
// Catalog Service - restaurants, categories, menu sections, items, variants
// ============================================================================

#[derive(Clone)]
pub struct CatalogService {
    restaurants: Arc<dyn DocumentStore<Restaurant>>,
    categories: Arc<dyn DocumentStore<Category>>,
    sections: Arc<dyn DocumentStore<MenuSection>>,
    items: Arc<dyn DocumentStore<MenuItem>>,
    discounts: Arc<dyn DocumentStore<Discount>>,
}

fn required_name(entity: &'static str, name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName(entity));
    }
    Ok(name.to_string())
}

fn non_negative(field: &'static str, amount: Money) -> Result<Money, CatalogError> {
    if amount.is_negative() {
        return Err(CatalogError::NegativeAmount { field });
    }
    Ok(amount)
}

fn not_found(entity: &'static str, id: Uuid) -> CatalogError {
    CatalogError::NotFound { entity, id }
}

fn map_missing(entity: &'static str, id: Uuid) -> impl FnOnce(StoreError) -> CatalogError {
    move |e| match e {
        StoreError::NotFound { .. } => not_found(entity, id),
        other => other.into(),
    }
}

impl CatalogService {
    pub fn new(
        restaurants: Arc<dyn DocumentStore<Restaurant>>,
        categories: Arc<dyn DocumentStore<Category>>,
        sections: Arc<dyn DocumentStore<MenuSection>>,
        items: Arc<dyn DocumentStore<MenuItem>>,
        discounts: Arc<dyn DocumentStore<Discount>>,
    ) -> Self {
        Self {
            restaurants,
            categories,
            sections,
            items,
            discounts,
        }
    }

    /// Delete the tenant's discounts aimed at something that is going away
    async fn drop_discounts_targeting(
        &self,
        tenant: TenantId,
        targets: impl Fn(&DiscountScope) -> bool,
    ) -> Result<(), CatalogError> {
        for discount in self.discounts.list(tenant).await? {
            if targets(&discount.scope) {
                self.discounts.delete(tenant, discount.id).await?;
                tracing::info!(discount_id = %discount.id, tenant_id = %tenant, "Discount dropped with its target");
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Restaurants
    // ------------------------------------------------------------------

    pub async fn create_restaurant(&self, tenant: TenantId, input: RestaurantCreate) -> Result<Restaurant, CatalogError> {
        let now = Utc::now();
        let restaurant = Restaurant {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            name: required_name("Restaurant", &input.name)?,
            description: input.description,
            address: input.address.trim().to_string(),
            phone: input.phone,
            delivery_fee: non_negative("delivery_fee", input.delivery_fee)?,
            minimum_order: non_negative("minimum_order", input.minimum_order)?,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.restaurants.insert(&restaurant).await?;
        tracing::info!(restaurant_id = %restaurant.id, tenant_id = %tenant, "Restaurant created");
        Ok(restaurant)
    }

    pub async fn get_restaurant(&self, tenant: TenantId, id: Uuid) -> Result<Restaurant, CatalogError> {
        self.restaurants
            .get(tenant, id)
            .await?
            .ok_or_else(|| not_found("Restaurant", id))
    }

    pub async fn list_restaurants(&self, tenant: TenantId) -> Result<Vec<Restaurant>, CatalogError> {
        let mut restaurants = self.restaurants.list(tenant).await?;
        restaurants.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(restaurants)
    }

    pub async fn update_restaurant(
        &self,
        tenant: TenantId,
        id: Uuid,
        patch: RestaurantUpdate,
    ) -> Result<Restaurant, CatalogError> {
        let mut restaurant = self.get_restaurant(tenant, id).await?;

        if let Some(name) = patch.name {
            restaurant.name = required_name("Restaurant", &name)?;
        }
        if let Some(description) = patch.description {
            restaurant.description = Some(description);
        }
        if let Some(address) = patch.address {
            restaurant.address = address.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            restaurant.phone = Some(phone);
        }
        if let Some(fee) = patch.delivery_fee {
            restaurant.delivery_fee = non_negative("delivery_fee", fee)?;
        }
        if let Some(minimum) = patch.minimum_order {
            restaurant.minimum_order = non_negative("minimum_order", minimum)?;
        }
        if let Some(active) = patch.is_active {
            restaurant.is_active = active;
        }
        restaurant.updated_at = Utc::now();

        self.restaurants.update(&restaurant).await?;
        Ok(restaurant)
    }

    /// Delete a restaurant without a menu. Its discounts go with it.
    pub async fn delete_restaurant(&self, tenant: TenantId, id: Uuid) -> Result<(), CatalogError> {
        self.get_restaurant(tenant, id).await?;

        let key = id.to_string();
        if !self.sections.find_by_field(tenant, "restaurant_id", &key).await?.is_empty() {
            return Err(CatalogError::InUse {
                entity: "Restaurant",
                id,
                dependents: "menu sections",
            });
        }

        for discount in self.discounts.find_by_field(tenant, "restaurant_id", &key).await? {
            self.discounts.delete(tenant, discount.id).await?;
        }

        self.restaurants.delete(tenant, id).await.map_err(map_missing("Restaurant", id))?;
        tracing::info!(restaurant_id = %id, tenant_id = %tenant, "Restaurant deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn create_category(&self, tenant: TenantId, input: CategoryCreate) -> Result<Category, CatalogError> {
        let category = Category {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            name: required_name("Category", &input.name)?,
            description: input.description,
            sort_order: input.sort_order.unwrap_or(0),
        };

        self.categories.insert(&category).await?;
        Ok(category)
    }

    pub async fn get_category(&self, tenant: TenantId, id: Uuid) -> Result<Category, CatalogError> {
        self.categories
            .get(tenant, id)
            .await?
            .ok_or_else(|| not_found("Category", id))
    }

    pub async fn list_categories(&self, tenant: TenantId) -> Result<Vec<Category>, CatalogError> {
        let mut categories = self.categories.list(tenant).await?;
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    pub async fn update_category(
        &self,
        tenant: TenantId,
        id: Uuid,
        patch: CategoryUpdate,
    ) -> Result<Category, CatalogError> {
        let mut category = self.get_category(tenant, id).await?;

        if let Some(name) = patch.name {
            category.name = required_name("Category", &name)?;
        }
        if let Some(description) = patch.description {
            category.description = Some(description);
        }
        if let Some(order) = patch.sort_order {
            category.sort_order = order;
        }

        self.categories.update(&category).await?;
        Ok(category)
    }

    pub async fn delete_category(&self, tenant: TenantId, id: Uuid) -> Result<(), CatalogError> {
        if !self.items.find_by_field(tenant, "category_id", &id.to_string()).await?.is_empty() {
            return Err(CatalogError::InUse {
                entity: "Category",
                id,
                dependents: "menu items",
            });
        }
        self.categories.delete(tenant, id).await.map_err(map_missing("Category", id))?;
        self.drop_discounts_targeting(tenant, |scope| *scope == DiscountScope::Category(id))
            .await
    }

    // ------------------------------------------------------------------
    // Menu sections
    // ------------------------------------------------------------------

    pub async fn create_section(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        input: SectionCreate,
    ) -> Result<MenuSection, CatalogError> {
        self.get_restaurant(tenant, restaurant_id).await?;

        let section = MenuSection {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            restaurant_id,
            name: required_name("Menu section", &input.name)?,
            description: input.description,
            sort_order: input.sort_order.unwrap_or(0),
        };

        self.sections.insert(&section).await?;
        Ok(section)
    }

    pub async fn get_section(&self, tenant: TenantId, restaurant_id: Uuid, id: Uuid) -> Result<MenuSection, CatalogError> {
        self.sections
            .get(tenant, id)
            .await?
            .filter(|s| s.restaurant_id == restaurant_id)
            .ok_or_else(|| not_found("Menu section", id))
    }

    pub async fn list_sections(&self, tenant: TenantId, restaurant_id: Uuid) -> Result<Vec<MenuSection>, CatalogError> {
        self.get_restaurant(tenant, restaurant_id).await?;
        let mut sections = self
            .sections
            .find_by_field(tenant, "restaurant_id", &restaurant_id.to_string())
            .await?;
        sections.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(sections)
    }

    pub async fn update_section(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        id: Uuid,
        patch: SectionUpdate,
    ) -> Result<MenuSection, CatalogError> {
        let mut section = self.get_section(tenant, restaurant_id, id).await?;

        if let Some(name) = patch.name {
            section.name = required_name("Menu section", &name)?;
        }
        if let Some(description) = patch.description {
            section.description = Some(description);
        }
        if let Some(order) = patch.sort_order {
            section.sort_order = order;
        }

        self.sections.update(&section).await?;
        Ok(section)
    }

    pub async fn delete_section(&self, tenant: TenantId, restaurant_id: Uuid, id: Uuid) -> Result<(), CatalogError> {
        self.get_section(tenant, restaurant_id, id).await?;
        if !self.items.find_by_field(tenant, "section_id", &id.to_string()).await?.is_empty() {
            return Err(CatalogError::InUse {
                entity: "Menu section",
                id,
                dependents: "menu items",
            });
        }
        self.sections.delete(tenant, id).await.map_err(map_missing("Menu section", id))
    }

    // ------------------------------------------------------------------
    // Menu items
    // ------------------------------------------------------------------

    async fn check_placement(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        section_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<(), CatalogError> {
        let section = self
            .sections
            .get(tenant, section_id)
            .await?
            .ok_or_else(|| not_found("Menu section", section_id))?;
        if section.restaurant_id != restaurant_id {
            return Err(CatalogError::SectionMismatch {
                section_id,
                restaurant_id,
            });
        }
        if let Some(category_id) = category_id {
            self.get_category(tenant, category_id).await?;
        }
        Ok(())
    }

    pub async fn create_item(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        input: MenuItemCreate,
    ) -> Result<MenuItem, CatalogError> {
        self.get_restaurant(tenant, restaurant_id).await?;
        self.check_placement(tenant, restaurant_id, input.section_id, input.category_id)
            .await?;

        let item = MenuItem {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            restaurant_id,
            section_id: input.section_id,
            category_id: input.category_id,
            name: required_name("Menu item", &input.name)?,
            description: input.description,
            price: non_negative("price", input.price)?,
            is_available: input.is_available.unwrap_or(true),
            variants: Vec::new(),
        };

        self.items.insert(&item).await?;
        tracing::debug!(item_id = %item.id, restaurant_id = %restaurant_id, "Menu item created");
        Ok(item)
    }

    pub async fn get_item(&self, tenant: TenantId, restaurant_id: Uuid, id: Uuid) -> Result<MenuItem, CatalogError> {
        self.items
            .get(tenant, id)
            .await?
            .filter(|i| i.restaurant_id == restaurant_id)
            .ok_or_else(|| not_found("Menu item", id))
    }

    /// Look up an item regardless of restaurant, e.g. while pricing an order.
    pub async fn find_item(&self, tenant: TenantId, id: Uuid) -> Result<MenuItem, CatalogError> {
        self.items.get(tenant, id).await?.ok_or_else(|| not_found("Menu item", id))
    }

    pub async fn list_items(&self, tenant: TenantId, restaurant_id: Uuid) -> Result<Vec<MenuItem>, CatalogError> {
        self.get_restaurant(tenant, restaurant_id).await?;
        let mut items = self
            .items
            .find_by_field(tenant, "restaurant_id", &restaurant_id.to_string())
            .await?;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    pub async fn update_item(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        id: Uuid,
        patch: MenuItemUpdate,
    ) -> Result<MenuItem, CatalogError> {
        let mut item = self.get_item(tenant, restaurant_id, id).await?;

        let section_id = patch.section_id.unwrap_or(item.section_id);
        let category_id = patch.category_id.unwrap_or(item.category_id);
        if patch.section_id.is_some() || patch.category_id.is_some() {
            self.check_placement(tenant, restaurant_id, section_id, category_id).await?;
        }
        item.section_id = section_id;
        item.category_id = category_id;

        if let Some(name) = patch.name {
            item.name = required_name("Menu item", &name)?;
        }
        if let Some(description) = patch.description {
            item.description = Some(description);
        }
        if let Some(price) = patch.price {
            item.price = non_negative("price", price)?;
        }
        if let Some(available) = patch.is_available {
            item.is_available = available;
        }

        self.items.update(&item).await?;
        Ok(item)
    }

    /// Delete an item together with the discounts on it or its variants
    pub async fn delete_item(&self, tenant: TenantId, restaurant_id: Uuid, id: Uuid) -> Result<(), CatalogError> {
        let item = self.get_item(tenant, restaurant_id, id).await?;
        self.items.delete(tenant, id).await.map_err(map_missing("Menu item", id))?;
        self.drop_discounts_targeting(tenant, |scope| match scope {
            DiscountScope::Item(target) => *target == id,
            DiscountScope::Variant(target) => item.variant(*target).is_some(),
            _ => false,
        })
        .await
    }

    // ------------------------------------------------------------------
    // Variants
    // ------------------------------------------------------------------

    pub async fn add_variant(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        item_id: Uuid,
        input: VariantCreate,
    ) -> Result<MenuItem, CatalogError> {
        let mut item = self.get_item(tenant, restaurant_id, item_id).await?;

        item.variants.push(Variant {
            id: Uuid::now_v7(),
            name: required_name("Variant", &input.name)?,
            price: non_negative("price", input.price)?,
            is_available: input.is_available.unwrap_or(true),
        });

        self.items.update(&item).await?;
        Ok(item)
    }

    pub async fn update_variant(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        item_id: Uuid,
        variant_id: Uuid,
        patch: VariantUpdate,
    ) -> Result<MenuItem, CatalogError> {
        let mut item = self.get_item(tenant, restaurant_id, item_id).await?;
        let variant = item
            .variants
            .iter_mut()
            .find(|v| v.id == variant_id)
            .ok_or_else(|| not_found("Variant", variant_id))?;

        if let Some(name) = patch.name {
            variant.name = required_name("Variant", &name)?;
        }
        if let Some(price) = patch.price {
            variant.price = non_negative("price", price)?;
        }
        if let Some(available) = patch.is_available {
            variant.is_available = available;
        }

        self.items.update(&item).await?;
        Ok(item)
    }

    pub async fn remove_variant(
        &self,
        tenant: TenantId,
        restaurant_id: Uuid,
        item_id: Uuid,
        variant_id: Uuid,
    ) -> Result<MenuItem, CatalogError> {
        let mut item = self.get_item(tenant, restaurant_id, item_id).await?;
        let before = item.variants.len();
        item.variants.retain(|v| v.id != variant_id);
        if item.variants.len() == before {
            return Err(not_found("Variant", variant_id));
        }

        self.items.update(&item).await?;
        self.drop_discounts_targeting(tenant, |scope| *scope == DiscountScope::Variant(variant_id))
            .await?;
        Ok(item)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
