use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::catalog::CatalogError;
use crate::domain::identity::IdentityError;
use crate::domain::order::{OrderError, OrderServiceError};
use crate::domain::pricing::PricingError;
use crate::domain::tenant::TenantError;
use crate::event_sourcing::EventStoreError;
use crate::storage::StoreError;

// ============================================================================
// API Errors
// ============================================================================
//
// Every domain error is mapped to one of these before it leaves a handler.
// Bodies are always `{"error": <code>, "message": <text>}`.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Internal server error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unprocessable(_) => "unprocessable",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("Insufficient role for this operation".to_string())
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend details stay in the log
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.code(),
            message: &message,
        })
    }
}

// ============================================================================
// Domain Error Mapping
// ============================================================================

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Duplicate { .. } | StoreError::UniqueViolation(_) => ApiError::Conflict(err.to_string()),
            StoreError::Serialization(_) | StoreError::Database(_) => ApiError::internal(err),
        }
    }
}

impl From<EventStoreError> for ApiError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict { .. } => ApiError::Conflict(err.to_string()),
            _ => ApiError::internal(err),
        }
    }
}

impl From<TenantError> for ApiError {
    fn from(err: TenantError) -> Self {
        match err {
            TenantError::EmptyName | TenantError::InvalidSlug(_) => ApiError::BadRequest(err.to_string()),
            TenantError::SlugTaken(_) => ApiError::Conflict(err.to_string()),
            TenantError::NotFound(_) => ApiError::NotFound(err.to_string()),
            TenantError::Inactive(_) => ApiError::Forbidden(err.to_string()),
            TenantError::Store(inner) => inner.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials | IdentityError::InvalidToken(_) => {
                ApiError::Unauthorized(err.to_string())
            }
            IdentityError::InvalidEmail(_) | IdentityError::EmptyDisplayName | IdentityError::WeakPassword(_) => {
                ApiError::BadRequest(err.to_string())
            }
            IdentityError::EmailTaken(_) | IdentityError::SelfDeletion => ApiError::Conflict(err.to_string()),
            IdentityError::RoleNotAllowed(_) => ApiError::Forbidden(err.to_string()),
            IdentityError::NotFound(_) => ApiError::NotFound(err.to_string()),
            IdentityError::Tenant(inner) => inner.into(),
            IdentityError::Store(inner) => inner.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::EmptyName(_) | CatalogError::NegativeAmount { .. } | CatalogError::SectionMismatch { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            CatalogError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            CatalogError::InUse { .. } => ApiError::Conflict(err.to_string()),
            CatalogError::Store(inner) => inner.into(),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::EmptyOrder | PricingError::InvalidQuantity { .. } | PricingError::InvalidDiscount(_) => {
                ApiError::BadRequest(err.to_string())
            }
            PricingError::BelowMinimum { .. } | PricingError::Overflow => ApiError::Unprocessable(err.to_string()),
            PricingError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PricingError::Catalog(inner) => inner.into(),
            PricingError::Store(inner) => inner.into(),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidTransition { .. } | OrderError::AlreadyInStatus(_) | OrderError::AlreadyPlaced => {
                ApiError::Conflict(err.to_string())
            }
            OrderError::EmptyItems
            | OrderError::InvalidQuantity { .. }
            | OrderError::IncompleteAddress
            | OrderError::MissingFailureReason => ApiError::BadRequest(err.to_string()),
            OrderError::NotInitialized => ApiError::internal(err),
        }
    }
}

impl From<OrderServiceError> for ApiError {
    fn from(err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            OrderServiceError::Refused(_) => ApiError::Forbidden(err.to_string()),
            OrderServiceError::RestaurantClosed(_)
            | OrderServiceError::WrongRestaurant { .. }
            | OrderServiceError::Unavailable { .. } => ApiError::Unprocessable(err.to_string()),
            OrderServiceError::Order(inner) => inner.into(),
            OrderServiceError::Pricing(inner) => inner.into(),
            OrderServiceError::Catalog(inner) => inner.into(),
            OrderServiceError::EventStore(inner) => inner.into(),
            OrderServiceError::Store(inner) => inner.into(),
        }
    }
}
