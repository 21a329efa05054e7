use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::TenantContext;
use super::error::ApiError;
use super::restaurants::{MANAGERS, READERS};
use super::state::AppState;
use crate::domain::catalog::{
    MenuItemCreate, MenuItemUpdate, SectionCreate, SectionUpdate, VariantCreate, VariantUpdate,
};

// ============================================================================
// Menu sections, items and variants of one restaurant
// ============================================================================

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/restaurants/{rid}/sections")
            .route(web::get().to(list_sections))
            .route(web::post().to(create_section)),
    )
    .service(
        web::resource("/restaurants/{rid}/sections/{id}")
            .route(web::get().to(get_section))
            .route(web::put().to(update_section))
            .route(web::delete().to(delete_section)),
    )
    .service(
        web::resource("/restaurants/{rid}/items")
            .route(web::get().to(list_items))
            .route(web::post().to(create_item)),
    )
    .service(
        web::resource("/restaurants/{rid}/items/{id}")
            .route(web::get().to(get_item))
            .route(web::put().to(update_item))
            .route(web::delete().to(delete_item)),
    )
    .service(web::resource("/restaurants/{rid}/items/{id}/variants").route(web::post().to(add_variant)))
    .service(
        web::resource("/restaurants/{rid}/items/{id}/variants/{vid}")
            .route(web::put().to(update_variant))
            .route(web::delete().to(remove_variant)),
    );
}

// Sections

async fn list_sections(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.catalog.list_sections(ctx.tenant, path.into_inner()).await?))
}

async fn create_section(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: web::Json<SectionCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let section = state
        .catalog
        .create_section(ctx.tenant, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(section))
}

async fn get_section(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    let (rid, id) = path.into_inner();
    Ok(HttpResponse::Ok().json(state.catalog.get_section(ctx.tenant, rid, id).await?))
}

async fn update_section(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<SectionUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    let section = state
        .catalog
        .update_section(ctx.tenant, rid, id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(section))
}

async fn delete_section(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    state.catalog.delete_section(ctx.tenant, rid, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// Items

async fn list_items(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    Ok(HttpResponse::Ok().json(state.catalog.list_items(ctx.tenant, path.into_inner()).await?))
}

async fn create_item(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: web::Json<MenuItemCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let item = state
        .catalog
        .create_item(ctx.tenant, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(item))
}

async fn get_item(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(READERS)?;
    let (rid, id) = path.into_inner();
    Ok(HttpResponse::Ok().json(state.catalog.get_item(ctx.tenant, rid, id).await?))
}

async fn update_item(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<MenuItemUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    let item = state
        .catalog
        .update_item(ctx.tenant, rid, id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

async fn delete_item(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    state.catalog.delete_item(ctx.tenant, rid, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// Variants

async fn add_variant(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<VariantCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id) = path.into_inner();
    let item = state
        .catalog
        .add_variant(ctx.tenant, rid, id, body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(item))
}

async fn update_variant(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid, Uuid)>,
    body: web::Json<VariantUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id, vid) = path.into_inner();
    let item = state
        .catalog
        .update_variant(ctx.tenant, rid, id, vid, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

async fn remove_variant(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<(Uuid, Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let (rid, id, vid) = path.into_inner();
    let item = state.catalog.remove_variant(ctx.tenant, rid, id, vid).await?;
    Ok(HttpResponse::Ok().json(item))
}
