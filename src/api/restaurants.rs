use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::TenantContext;
use super::error::ApiError;
use super::state::AppState;
use crate::domain::catalog::{RestaurantCreate, RestaurantUpdate};
use crate::domain::identity::Role;

pub(super) const READERS: &[Role] = &[Role::TenantAdmin, Role::Staff, Role::Customer];
pub(super) const MANAGERS: &[Role] = &[Role::TenantAdmin];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/restaurants")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/restaurants/{id}")
            .route(web::get().to(get))
            .route(web::put().to(update))
            .route(web::delete().to(delete)),
    );
}

async fn list(state: web::Data<AppState>, ctx: TenantContext) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.catalog.list_restaurants(ctx.tenant).await?))
}

async fn create(
    state: web::Data<AppState>,
    ctx: TenantContext,
    body: web::Json<RestaurantCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let restaurant = state.catalog.create_restaurant(ctx.tenant, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(restaurant))
}

async fn get(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.catalog.get_restaurant(ctx.tenant, path.into_inner()).await?))
}

async fn update(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: web::Json<RestaurantUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let restaurant = state
        .catalog
        .update_restaurant(ctx.tenant, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(restaurant))
}

async fn delete(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    state.catalog.delete_restaurant(ctx.tenant, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
