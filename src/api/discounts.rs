use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::TenantContext;
use super::error::ApiError;
use super::restaurants::MANAGERS;
use super::state::AppState;
use crate::domain::pricing::{DiscountCreate, DiscountUpdate};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/restaurants/{rid}/discounts")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/restaurants/{rid}/discounts/{id}")
            .route(web::get().to(get))
            .route(web::put().to(update))
            .route(web::delete().to(delete)),
    );
}

async fn list(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    Ok(HttpResponse::Ok().json(state.discounts.list(ctx.tenant, path.into_inner()).await?))
}

async fn create(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: web::Json<DiscountCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let discount = state
        .discounts
        .create(ctx.tenant, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(discount))
}

async fn get(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<(Uuid, Uuid)>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    Ok(HttpResponse::Ok().json(state.discounts.get(ctx.tenant, rid, id).await?))
}

async fn update(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<DiscountUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    let discount = state
        .discounts
        .update(ctx.tenant, rid, id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(discount))
}

async fn delete(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<(Uuid, Uuid)>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    state.discounts.delete(ctx.tenant, rid, id).await?;
    Ok(HttpResponse::NoContent().finish())
}
