// ============================================================================
// Pricing - money, discount rules and order quotes
// ============================================================================

pub mod discount;
pub mod errors;
pub mod money;
pub mod quote;
pub mod service;

pub use discount::*;
pub use errors::PricingError;
pub use money::Money;
pub use quote::{quote, PricedLine, PricingLine, Quote};
pub use service::DiscountService;
