use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::auth::Principal;
use super::error::ApiError;
use super::state::AppState;
use crate::domain::identity::{IssuedToken, UserProfile};
use crate::domain::tenant::TenantId;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Tenant slug. Omitted by platform administrators.
    pub tenant: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: UserProfile,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/login", web::post().to(login))
        .route("/auth/me", web::get().to(me));
}

async fn login(state: web::Data<AppState>, body: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let result = state
        .identity
        .login(body.tenant.as_deref(), &body.email, &body.password)
        .await;
    state.metrics.record_auth_attempt(result.is_ok());

    let (user, token) = result?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserProfile::from(&user),
    }))
}

async fn me(state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, ApiError> {
    let tenant = principal.tenant.unwrap_or(TenantId::PLATFORM);
    let user = state.identity.get_user(tenant, principal.user_id).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}
