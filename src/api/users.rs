use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::auth::TenantContext;
use super::error::ApiError;
use super::state::AppState;
use crate::domain::identity::{Role, UserCreate, UserProfile, UserUpdate};

const MANAGERS: &[Role] = &[Role::TenantAdmin];

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/users/{id}")
            .route(web::get().to(get))
            .route(web::put().to(update))
            .route(web::delete().to(delete)),
    );
}

async fn list(state: web::Data<AppState>, ctx: TenantContext) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let users: Vec<UserProfile> = state
        .identity
        .list_users(ctx.tenant)
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

async fn create(
    state: web::Data<AppState>,
    ctx: TenantContext,
    body: web::Json<UserCreate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let user = state.identity.create_user(ctx.tenant, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(UserProfile::from(&user)))
}

async fn get(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let user = state.identity.get_user(ctx.tenant, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

async fn update(
    state: web::Data<AppState>,
    ctx: TenantContext,
    path: web::Path<Uuid>,
    body: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    let user = state
        .identity
        .update_user(ctx.tenant, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

async fn delete(state: web::Data<AppState>, ctx: TenantContext, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    ctx.require(MANAGERS)?;
    state
        .identity
        .delete_user(ctx.tenant, path.into_inner(), ctx.user_id())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
