use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::domain::identity::Role;
use crate::domain::tenant::TenantId;

/// Header a platform administrator uses to pick the tenant to act on
pub const TENANT_HEADER: &str = "X-Tenant";

// ============================================================================
// Request Principal
// ============================================================================

/// The authenticated caller: the account the bearer token was issued for,
/// as currently stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant: Option<TenantId>,
    pub role: Role,
}

impl Principal {
    pub fn is_platform_admin(&self) -> bool {
        self.role == Role::PlatformAdmin
    }

    /// Platform administrators pass every role check.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.is_platform_admin() || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    pub fn require_platform_admin(&self) -> Result<(), ApiError> {
        self.require(&[])
    }
}

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, ApiError> {
    req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state is not configured".into()))
}

fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed Authorization header".into()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".into()))
}

fn authenticate(req: &HttpRequest) -> LocalBoxFuture<'static, Result<Principal, ApiError>> {
    let token = bearer_token(req).map(str::to_string);
    let state = app_state(req).map(|s| s.clone());

    Box::pin(async move {
        let (token, state) = (token?, state?);
        let user = state.identity.authenticate(&token).await?;

        Ok(Principal {
            user_id: user.id,
            tenant: (user.tenant_id != TenantId::PLATFORM).then_some(user.tenant_id),
            role: user.role,
        })
    })
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        authenticate(req)
    }
}

// ============================================================================
// Tenant Context
// ============================================================================

/// The tenant a request acts on, plus who is acting.
///
/// Tenant users always act on their own tenant. Platform administrators name
/// one with the `X-Tenant` header (tenant slug). The tenant must be active.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: TenantId,
    pub principal: Principal,
}

impl TenantContext {
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        self.principal.require(roles)
    }

    pub fn user_id(&self) -> Uuid {
        self.principal.user_id
    }

    pub fn role(&self) -> Role {
        self.principal.role
    }
}

impl FromRequest for TenantContext {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let principal = authenticate(req);
        let state = app_state(req).map(|s| s.clone());
        let slug = req
            .headers()
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string());

        Box::pin(async move {
            let principal = principal.await?;
            let state = state?;

            let tenant = match (principal.tenant, slug) {
                (Some(id), _) => {
                    let tenant = state
                        .tenants
                        .get(id.as_uuid())
                        .await
                        .map_err(|_| ApiError::Unauthorized("Token refers to an unknown tenant".into()))?;
                    if !tenant.is_active {
                        return Err(ApiError::Forbidden(format!("Tenant is inactive: {}", tenant.slug)));
                    }
                    tenant.id
                }
                (None, Some(slug)) if principal.is_platform_admin() => state.tenants.resolve(&slug).await?.id,
                (None, _) if principal.is_platform_admin() => {
                    return Err(ApiError::BadRequest(format!(
                        "Platform administrators must name a tenant with the {TENANT_HEADER} header"
                    )));
                }
                (None, _) => return Err(ApiError::forbidden()),
            };

            Ok(TenantContext { tenant, principal })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            tenant: Some(TenantId::new()),
            role,
        }
    }

    #[test]
    fn test_role_checks() {
        assert!(principal(Role::TenantAdmin).require(&[Role::TenantAdmin]).is_ok());
        assert!(principal(Role::Staff).require(&[Role::TenantAdmin, Role::Staff]).is_ok());
        assert!(matches!(
            principal(Role::Customer).require(&[Role::TenantAdmin]),
            Err(ApiError::Forbidden(_))
        ));
        assert!(principal(Role::TenantAdmin).require_platform_admin().is_err());
    }

    #[test]
    fn test_platform_admin_passes_everything() {
        let admin = Principal {
            user_id: Uuid::new_v4(),
            tenant: None,
            role: Role::PlatformAdmin,
        };
        assert!(admin.require(&[Role::Customer]).is_ok());
        assert!(admin.require_platform_admin().is_ok());
    }
}
