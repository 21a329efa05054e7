use uuid::Uuid;

use super::model::Role;
use crate::domain::tenant::TenantError;
use crate::storage::StoreError;

// ============================================================================
// Identity Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Display name cannot be empty")]
    EmptyDisplayName,

    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Role {0} cannot be assigned here")]
    RoleNotAllowed(Role),

    #[error("Users cannot delete their own account")]
    SelfDeletion,

    #[error("User not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Tenant(#[from] TenantError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
