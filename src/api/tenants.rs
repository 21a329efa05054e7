use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::Principal;
use super::error::ApiError;
use super::state::AppState;
use crate::domain::tenant::{TenantCreate, TenantUpdate};

// Platform administrators only

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/tenants")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/tenants/{id}")
            .route(web::get().to(get))
            .route(web::put().to(update))
            .route(web::delete().to(delete)),
    );
}

async fn list(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, ApiError> {
    principal.require_platform_admin()?;
    Ok(HttpResponse::Ok().json(state.tenants.list().await?))
}

async fn create(
    state: web::Data<AppState>,
    principal: Principal,
    body: web::Json<TenantCreate>,
) -> Result<HttpResponse, ApiError> {
    principal.require_platform_admin()?;
    let tenant = state.tenants.create(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(tenant))
}

async fn get(state: web::Data<AppState>, principal: Principal, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    principal.require_platform_admin()?;
    Ok(HttpResponse::Ok().json(state.tenants.get(path.into_inner()).await?))
}

async fn update(
    state: web::Data<AppState>,
    principal: Principal,
    path: web::Path<Uuid>,
    body: web::Json<TenantUpdate>,
) -> Result<HttpResponse, ApiError> {
    principal.require_platform_admin()?;
    let tenant = state.tenants.update(path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tenant))
}

async fn delete(state: web::Data<AppState>, principal: Principal, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    principal.require_platform_admin()?;
    state.tenants.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
