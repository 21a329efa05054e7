// ============================================================================
// HTTP API
// ============================================================================
//
// Everything lives under `/api`. Handlers authenticate through the
// `Principal` / `TenantContext` extractors and map domain errors to
// `ApiError`.
//
// ============================================================================

pub mod auth;
pub mod error;
pub mod state;

mod categories;
mod discounts;
mod menu;
mod orders;
mod restaurants;
mod session;
mod tenants;
mod users;

#[cfg(test)]
mod tests;

use actix_web::web;

pub use auth::{Principal, TenantContext, TENANT_HEADER};
pub use error::ApiError;
pub use state::AppState;

/// Mount the API routes and the extractor error handlers
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        ApiError::BadRequest(format!("Invalid JSON body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        ApiError::BadRequest(format!("Invalid query string: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        ApiError::BadRequest(format!("Invalid path: {err}")).into()
    }))
    .service(
        web::scope("/api")
            .configure(session::configure)
            .configure(tenants::configure)
            .configure(users::configure)
            .configure(restaurants::configure)
            .configure(categories::configure)
            .configure(menu::configure)
            .configure(discounts::configure)
            .configure(orders::configure),
    );
}
