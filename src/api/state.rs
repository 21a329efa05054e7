use std::sync::Arc;

use crate::config::AuthConfig;
use crate::domain::catalog::CatalogService;
use crate::domain::identity::{IdentityService, TokenIssuer};
use crate::domain::order::OrderService;
use crate::domain::pricing::DiscountService;
use crate::domain::tenant::TenantService;
use crate::metrics::Metrics;
use crate::storage::Storage;

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub tenants: TenantService,
    pub identity: IdentityService,
    pub catalog: CatalogService,
    pub discounts: DiscountService,
    pub orders: OrderService,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(storage: Storage, auth: &AuthConfig, metrics: Arc<Metrics>) -> Self {
        let tenants = TenantService::new(storage.tenants.clone());
        let identity = IdentityService::new(
            storage.users.clone(),
            tenants.clone(),
            TokenIssuer::new(auth),
            auth.password_iterations,
        );
        let catalog = CatalogService::new(
            storage.restaurants.clone(),
            storage.categories.clone(),
            storage.sections.clone(),
            storage.items.clone(),
            storage.discounts.clone(),
        );
        let discounts = DiscountService::new(storage.discounts.clone(), catalog.clone());
        let orders = OrderService::new(
            catalog.clone(),
            discounts.clone(),
            storage.order_events.clone(),
            storage.orders.clone(),
            metrics.clone(),
        );

        Self {
            tenants,
            identity,
            catalog,
            discounts,
            orders,
            metrics,
        }
    }
}
