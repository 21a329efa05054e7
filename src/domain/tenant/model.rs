use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::storage::Document;

/// Tenant identifier for multi-tenant isolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Owner of platform-level records (platform administrators).
    pub const PLATFORM: TenantId = TenantId(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    pub fn is_platform(&self) -> bool {
        *self == Self::PLATFORM
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub contact_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Tenant {
    const COLLECTION: &'static str = "tenants";

    fn id(&self) -> Uuid {
        self.id.as_uuid()
    }

    // a tenant owns its own record
    fn tenant_id(&self) -> TenantId {
        self.id
    }
}

/// Create tenant payload
#[derive(Debug, Clone, Deserialize)]
pub struct TenantCreate {
    pub name: String,
    pub slug: String,
    pub contact_email: Option<String>,
}

/// Update tenant payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: Option<bool>,
}

/// Slugs are lowercase ASCII letters, digits and single dashes between them.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 63
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("pizza-palace"));
        assert!(is_valid_slug("acme42"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Pizza"));
        assert!(!is_valid_slug("-pizza"));
        assert!(!is_valid_slug("pizza-"));
        assert!(!is_valid_slug("pizza--palace"));
        assert!(!is_valid_slug("pizza palace"));
    }

    #[test]
    fn test_tenant_id_serializes_as_plain_uuid() {
        let id = TenantId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        assert!(TenantId::PLATFORM.is_platform());
        assert!(!id.is_platform());
    }
}
