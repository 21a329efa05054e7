use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::IdentityError;
use super::model::{is_valid_email, Role, User, UserCreate, UserUpdate};
use super::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use super::token::{Claims, IssuedToken, TokenIssuer};
use crate::domain::tenant::{TenantId, TenantService};
use crate::storage::{DocumentStore, StoreError};

// ============================================================================
// Identity Service
// ============================================================================
//
// User management inside a tenant plus login and token verification.
//
// ============================================================================

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn DocumentStore<User>>,
    tenants: TenantService,
    tokens: TokenIssuer,
    password_iterations: u32,
    // checked when no account matches, so every failed login costs one hash
    dummy_hash: Arc<str>,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn DocumentStore<User>>,
        tenants: TenantService,
        tokens: TokenIssuer,
        password_iterations: u32,
    ) -> Self {
        Self {
            users,
            tenants,
            tokens,
            password_iterations,
            dummy_hash: hash_password(&Uuid::new_v4().to_string(), password_iterations).into(),
        }
    }

    fn validate_password(password: &str) -> Result<(), IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword(MIN_PASSWORD_LEN));
        }
        Ok(())
    }

    /// Create a user inside `tenant`. Platform administrators can only be
    /// created through [`IdentityService::ensure_platform_admin`].
    pub async fn create_user(&self, tenant: TenantId, input: UserCreate) -> Result<User, IdentityError> {
        if input.role == Role::PlatformAdmin {
            return Err(IdentityError::RoleNotAllowed(input.role));
        }
        self.insert_user(tenant, input).await
    }

    async fn insert_user(&self, tenant: TenantId, input: UserCreate) -> Result<User, IdentityError> {
        let email = input.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail(email));
        }
        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(IdentityError::EmptyDisplayName);
        }
        Self::validate_password(&input.password)?;

        if !self.users.find_by_field(tenant, "email", &email).await?.is_empty() {
            return Err(IdentityError::EmailTaken(email));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            tenant_id: tenant,
            email,
            display_name,
            role: input.role,
            password_hash: hash_password(&input.password, self.password_iterations),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.users.insert(&user).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => IdentityError::EmailTaken(user.email.clone()),
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, tenant_id = %tenant, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, tenant: TenantId, id: Uuid) -> Result<User, IdentityError> {
        self.users.get(tenant, id).await?.ok_or(IdentityError::NotFound(id))
    }

    pub async fn list_users(&self, tenant: TenantId) -> Result<Vec<User>, IdentityError> {
        let mut users = self.users.list(tenant).await?;
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    pub async fn update_user(&self, tenant: TenantId, id: Uuid, patch: UserUpdate) -> Result<User, IdentityError> {
        let mut user = self.get_user(tenant, id).await?;

        if let Some(name) = patch.display_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(IdentityError::EmptyDisplayName);
            }
            user.display_name = name;
        }
        if let Some(role) = patch.role {
            if role == Role::PlatformAdmin {
                return Err(IdentityError::RoleNotAllowed(role));
            }
            user.role = role;
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        if let Some(password) = patch.password {
            Self::validate_password(&password)?;
            user.password_hash = hash_password(&password, self.password_iterations);
        }
        user.updated_at = Utc::now();

        self.users.update(&user).await?;
        Ok(user)
    }

    pub async fn delete_user(&self, tenant: TenantId, id: Uuid, actor: Uuid) -> Result<(), IdentityError> {
        if id == actor {
            return Err(IdentityError::SelfDeletion);
        }
        self.users.delete(tenant, id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => IdentityError::NotFound(id),
            other => other.into(),
        })
    }

    /// Authenticate with email and password. Without a tenant slug only
    /// platform administrators can log in.
    pub async fn login(
        &self,
        tenant_slug: Option<&str>,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), IdentityError> {
        let tenant = match tenant_slug {
            Some(slug) => match self.tenants.resolve(slug).await {
                Ok(tenant) => tenant.id,
                Err(e) => {
                    tracing::debug!(slug = %slug, error = %e, "Login against unknown or inactive tenant");
                    verify_password(password, &self.dummy_hash);
                    return Err(IdentityError::InvalidCredentials);
                }
            },
            None => TenantId::PLATFORM,
        };

        let candidate = self
            .users
            .find_by_field(tenant, "email", email.trim())
            .await?
            .into_iter()
            .next();
        let password_ok = match &candidate {
            Some(user) => verify_password(password, &user.password_hash),
            None => {
                verify_password(password, &self.dummy_hash);
                false
            }
        };
        let user = candidate
            .filter(|u| password_ok && u.is_active)
            .ok_or(IdentityError::InvalidCredentials)?;

        let token = self.tokens.issue(&user)?;
        tracing::info!(user_id = %user.id, tenant_id = %tenant, "User logged in");
        Ok((user, token))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, IdentityError> {
        self.tokens.verify(token)
    }

    /// Resolve a bearer token to the account it was issued for. The account
    /// must still exist and be active; its current role applies, not the
    /// one recorded in the token.
    pub async fn authenticate(&self, token: &str) -> Result<User, IdentityError> {
        let claims = self.verify_token(token)?;
        let tenant = claims.tenant.unwrap_or(TenantId::PLATFORM);

        match self.users.get(tenant, claims.sub).await? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => Err(IdentityError::InvalidToken("account is deactivated".to_string())),
            None => Err(IdentityError::InvalidToken("account no longer exists".to_string())),
        }
    }

    /// Seed a platform administrator. Returns `false` when one already exists.
    pub async fn ensure_platform_admin(&self, email: &str, password: &str) -> Result<bool, IdentityError> {
        if !self.users.list(TenantId::PLATFORM).await?.is_empty() {
            return Ok(false);
        }

        self.insert_user(
            TenantId::PLATFORM,
            UserCreate {
                email: email.to_string(),
                display_name: "Platform Administrator".to_string(),
                password: password.to_string(),
                role: Role::PlatformAdmin,
            },
        )
        .await?;
        Ok(true)
    }
}
