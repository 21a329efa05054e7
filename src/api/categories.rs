use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::TenantContext;
use super::error::ApiError;
use super::restaurants::{MANAGERS, READERS};
use super::state::AppState;
use crate::domain::catalog::{CategoryCreate, CategoryUpdate};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/categories")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/categories/{id}")
            .route(web::get().to(get))
            .route(web::put().to(update))
            .route(web::delete().to(delete)),
    );
}

async fn list(state: web::Data<AppState>, ctx: TenantContext) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.catalog.list_categories(ctx.tenant).await?))
}

async fn create(
    state: web::Data<AppState>,
    ctx: TenantContext,
    body: web::Json<CategoryCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let category = state.catalog.create_category(ctx.tenant, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

async fn get(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.catalog.get_category(ctx.tenant, path.into_inner()).await?))
}

async fn update(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: web::Json<CategoryUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let category = state
        .catalog
        .update_category(ctx.tenant, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(category))
}

async fn delete(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    state.catalog.delete_category(ctx.tenant, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
