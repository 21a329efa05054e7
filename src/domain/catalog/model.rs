use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing::Money;
use crate::domain::tenant::TenantId;
use crate::storage::Document;
use crate::utils::patch::nullable;

// ============================================================================
// Catalog Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    /// Flat fee added to every order
    pub delivery_fee: Money,
    /// Smallest discounted subtotal accepted for an order
    pub minimum_order: Money,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenant-wide grouping used for filtering and category-scoped discounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

/// A heading on one restaurant's menu ("Starters", "Pizzas")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSection {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub restaurant_id: Uuid,
    pub section_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub is_available: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl MenuItem {
    pub fn variant(&self, id: Uuid) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// A sized or flavoured option of an item. `price` replaces the item price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub is_available: bool,
}

macro_rules! tenant_document {
    ($ty:ty, $collection:literal) => {
        impl Document for $ty {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Uuid {
                self.id
            }

            fn tenant_id(&self) -> TenantId {
                self.tenant_id
            }
        }
    };
}

tenant_document!(Restaurant, "restaurants");
tenant_document!(Category, "categories");
tenant_document!(MenuSection, "menu_sections");
tenant_document!(MenuItem, "menu_items");

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RestaurantCreate {
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub delivery_fee: Money,
    #[serde(default)]
    pub minimum_order: Money,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub delivery_fee: Option<Money>,
    pub minimum_order: Option<Money>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionCreate {
    pub name: String,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MenuItemCreate {
    pub section_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemUpdate {
    pub section_id: Option<Uuid>,
    /// `null` takes the item out of its category
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariantCreate {
    pub name: String,
    pub price: Money,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub is_available: Option<bool>,
}
