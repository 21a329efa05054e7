use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::discount::{best_discount, AppliedDiscount, Discount, PriceTarget};
use super::errors::PricingError;
use super::money::Money;
use crate::domain::catalog::Restaurant;

// ============================================================================
// Order Quotes
// ============================================================================

/// A resolved order line ready to be priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingLine {
    pub menu_item_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub menu_item_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Option<AppliedDiscount>,
    /// `(unit_price - discount) * quantity`
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub restaurant_id: Uuid,
    pub lines: Vec<PricedLine>,
    /// Before discounts
    pub subtotal: Money,
    pub discount_total: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

fn add(a: Money, b: Money) -> Result<Money, PricingError> {
    a.checked_add(b).ok_or(PricingError::Overflow)
}

/// Price `lines` for `restaurant`, applying at most one discount per line.
pub fn quote(
    restaurant: &Restaurant,
    lines: &[PricingLine],
    discounts: &[Discount],
    now: DateTime<Utc>,
) -> Result<Quote, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyOrder);
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Money::ZERO;
    let mut discount_total = Money::ZERO;

    for line in lines {
        if line.quantity == 0 {
            return Err(PricingError::InvalidQuantity {
                menu_item_id: line.menu_item_id,
            });
        }

        let target = PriceTarget {
            restaurant_id: restaurant.id,
            category_id: line.category_id,
            item_id: line.menu_item_id,
            variant_id: line.variant_id,
            unit_price: line.unit_price,
        };
        let discount = best_discount(discounts, &target, now);
        let per_unit = discount.as_ref().map_or(Money::ZERO, |d| d.amount_per_unit);

        let gross = line.unit_price.checked_mul(line.quantity).ok_or(PricingError::Overflow)?;
        let reduction = per_unit.checked_mul(line.quantity).ok_or(PricingError::Overflow)?;
        let line_total = gross.checked_sub(reduction).ok_or(PricingError::Overflow)?;

        subtotal = add(subtotal, gross)?;
        discount_total = add(discount_total, reduction)?;

        priced.push(PricedLine {
            menu_item_id: line.menu_item_id,
            variant_id: line.variant_id,
            name: line.name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount,
            line_total,
        });
    }

    let discounted = subtotal.checked_sub(discount_total).ok_or(PricingError::Overflow)?;
    if discounted < restaurant.minimum_order {
        return Err(PricingError::BelowMinimum {
            minimum: restaurant.minimum_order,
            subtotal: discounted,
        });
    }

    Ok(Quote {
        restaurant_id: restaurant.id,
        lines: priced,
        subtotal,
        discount_total,
        delivery_fee: restaurant.delivery_fee,
        total: add(discounted, restaurant.delivery_fee)?,
    })
}
