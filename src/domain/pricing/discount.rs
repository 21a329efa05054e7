use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::PricingError;
use super::money::Money;
use crate::domain::tenant::TenantId;
use crate::storage::Document;
use crate::utils::patch::nullable;

pub const MAX_BASIS_POINTS: u32 = 10_000;

// ============================================================================
// Discount Rules
// ============================================================================

/// Which prices a discount reaches. Narrower scopes win ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "target_id", rename_all = "snake_case")]
pub enum DiscountScope {
    Restaurant,
    Category(Uuid),
    Item(Uuid),
    Variant(Uuid),
}

impl DiscountScope {
    pub fn priority(&self) -> u8 {
        match self {
            DiscountScope::Restaurant => 0,
            DiscountScope::Category(_) => 1,
            DiscountScope::Item(_) => 2,
            DiscountScope::Variant(_) => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountScope::Restaurant => "restaurant",
            DiscountScope::Category(_) => "category",
            DiscountScope::Item(_) => "item",
            DiscountScope::Variant(_) => "variant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    /// 1 basis point = 0.01%
    Percentage { basis_points: u32 },
    /// Taken off every unit
    FixedAmount { amount: Money },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub restaurant_id: Uuid,
    pub name: String,
    pub scope: DiscountScope,
    pub kind: DiscountKind,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Discount {
    const COLLECTION: &'static str = "discounts";

    fn id(&self) -> Uuid {
        self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// The thing being priced: one unit of an item, or of one of its variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTarget {
    pub restaurant_id: Uuid,
    pub category_id: Option<Uuid>,
    pub item_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub discount_id: Uuid,
    pub name: String,
    pub scope: DiscountScope,
    pub amount_per_unit: Money,
}

impl Discount {
    /// Active and inside its `[starts_at, ends_at)` window.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| now < end)
    }

    pub fn applies_to(&self, target: &PriceTarget) -> bool {
        if self.restaurant_id != target.restaurant_id {
            return false;
        }
        match self.scope {
            DiscountScope::Restaurant => true,
            DiscountScope::Category(id) => target.category_id == Some(id),
            DiscountScope::Item(id) => target.item_id == id,
            DiscountScope::Variant(id) => target.variant_id == Some(id),
        }
    }

    /// Per-unit reduction, never more than the unit price.
    pub fn amount_for(&self, unit_price: Money) -> Money {
        if unit_price.cents() <= 0 {
            return Money::ZERO;
        }
        let raw = match self.kind {
            DiscountKind::Percentage { basis_points } => unit_price
                .percent_bp(basis_points.min(MAX_BASIS_POINTS))
                .unwrap_or(unit_price),
            DiscountKind::FixedAmount { amount } => amount,
        };
        raw.clamp(Money::ZERO, unit_price)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        validate_rule(&self.name, &self.kind, self.starts_at, self.ends_at)
    }
}

pub(crate) fn validate_rule(
    name: &str,
    kind: &DiscountKind,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), PricingError> {
    if name.trim().is_empty() {
        return Err(PricingError::InvalidDiscount("name cannot be empty".into()));
    }
    match kind {
        DiscountKind::Percentage { basis_points } if !(1..=MAX_BASIS_POINTS).contains(basis_points) => {
            return Err(PricingError::InvalidDiscount(format!(
                "percentage must be between 1 and {MAX_BASIS_POINTS} basis points, got {basis_points}"
            )));
        }
        DiscountKind::FixedAmount { amount } if amount.cents() <= 0 => {
            return Err(PricingError::InvalidDiscount("fixed amount must be positive".into()));
        }
        _ => {}
    }
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if start >= end {
            return Err(PricingError::InvalidDiscount("starts_at must be before ends_at".into()));
        }
    }
    Ok(())
}

/// Pick the single discount giving the largest per-unit reduction.
///
/// Equal reductions go to the narrower scope, then to the smaller discount
/// id, so the choice never depends on input order.
pub fn best_discount(discounts: &[Discount], target: &PriceTarget, now: DateTime<Utc>) -> Option<AppliedDiscount> {
    discounts
        .iter()
        .filter(|d| d.is_live(now) && d.applies_to(target))
        .map(|d| (d, d.amount_for(target.unit_price)))
        .filter(|(_, amount)| amount.cents() > 0)
        .max_by(|(a, amount_a), (b, amount_b)| {
            amount_a
                .cmp(amount_b)
                .then_with(|| a.scope.priority().cmp(&b.scope.priority()))
                .then_with(|| b.id.cmp(&a.id))
        })
        .map(|(d, amount)| AppliedDiscount {
            discount_id: d.id,
            name: d.name.clone(),
            scope: d.scope,
            amount_per_unit: amount,
        })
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountCreate {
    pub name: String,
    pub scope: DiscountScope,
    pub kind: DiscountKind,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscountUpdate {
    pub name: Option<String>,
    pub scope: Option<DiscountScope>,
    pub kind: Option<DiscountKind>,
    /// `null` removes the bound
    #[serde(default, deserialize_with = "nullable")]
    pub starts_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ends_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}
