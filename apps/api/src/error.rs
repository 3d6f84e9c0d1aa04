//! Error types for the API.
//!
//! Every handler returns `Result<_, ApiError>`. The error becomes a JSON body
//! `{code, message}` with the matching status:
//!
//! ```text
//! DbError::Domain(CoreError::Validation)          → 400 VALIDATION_ERROR
//! DbError::Domain(CoreError::InsufficientStock)   → 400 INSUFFICIENT_STOCK
//! DbError::Domain(InvalidPurchaseOrderStatus)     → 400 INVALID_STATE
//! DbError::Domain(DemoLimitExceeded)              → 403 DEMO_LIMIT_EXCEEDED
//! DbError::NotFound / CoreError::*NotFound        → 404 NOT_FOUND
//! DbError::UniqueViolation                        → 409 CONFLICT
//! anything else                                   → 500 DATABASE_ERROR / INTERNAL
//! ```
//!
//! Malformed JSON bodies are 400 VALIDATION_ERROR as well (see
//! [`ApiJson`](crate::extract::ApiJson)).
//!
//! 5xx messages are generic. The underlying error rides along in the
//! response extensions and [`reveal_internal_details`] writes it out as
//! `detail` when the server runs in development mode.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tillbook_core::{CoreError, ValidationError};
use tillbook_db::DbError;
use tracing::error;

use crate::AppState;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    DemoLimitExceeded(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    InvalidState,
    Unauthorized,
    Forbidden,
    DemoLimitExceeded,
    NotFound,
    Conflict,
    DatabaseError,
    Internal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InsufficientStock(_) | ApiError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::DemoLimitExceeded(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::InsufficientStock(_) => ErrorCode::InsufficientStock,
            ApiError::InvalidState(_) => ErrorCode::InvalidState,
            ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
            ApiError::Forbidden(_) => ErrorCode::Forbidden,
            ApiError::DemoLimitExceeded(_) => ErrorCode::DemoLimitExceeded,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Conflict(_) => ErrorCode::Conflict,
            ApiError::Database(_) => ErrorCode::DatabaseError,
            ApiError::Internal(_) => ErrorCode::Internal,
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, detail) = match self {
            ApiError::Database(detail) => ("A database error occurred".to_string(), Some(detail.clone())),
            ApiError::Internal(detail) => ("An internal error occurred".to_string(), Some(detail.clone())),
            other => (other.to_string(), None),
        };

        ErrorBody {
            code: self.code(),
            message,
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = self.body();
        let public = ErrorBody {
            detail: None,
            ..body.clone()
        };
        let mut response = (status, Json(public)).into_response();
        if body.detail.is_some() {
            response.extensions_mut().insert(body);
        }
        response
    }
}

/// Middleware: in development mode, re-renders error responses with their
/// `detail`. Production responses pass through untouched.
pub async fn reveal_internal_details(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if !state.config.environment.is_development() {
        return response;
    }

    match response.extensions_mut().remove::<ErrorBody>() {
        Some(body) => (response.status(), Json(body)).into_response(),
        None => response,
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(inner) => inner.into(),
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(err.to_string()),
            CoreError::InvalidPurchaseOrderStatus { .. } => ApiError::InvalidState(err.to_string()),
            CoreError::DemoLimitExceeded { .. } => ApiError::DemoLimitExceeded(err.to_string()),
            CoreError::ProductNotFound(_)
            | CoreError::SupplierNotFound(_)
            | CoreError::PurchaseOrderNotFound(_)
            | CoreError::InvoiceNotFound(_)
            | CoreError::ShopNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::NumberExhausted { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, .. } => ApiError::NotFound(format!("{} not found", entity)),
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_mapping() {
        let err: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product: "Cola".to_string(),
            available: 1,
            requested: 2,
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert!(err.to_string().contains("Cola"));

        let err: ApiError = DbError::not_found("Product", "p1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Product not found");

        let err: ApiError = DbError::Domain(CoreError::DemoLimitExceeded {
            resource: "invoices".to_string(),
            limit: 5,
        })
        .into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), ErrorCode::DemoLimitExceeded);

        let err: ApiError = DbError::PoolExhausted.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn test_internal_message_is_generic() {
        let body = ApiError::Database("disk I/O error".to_string()).body();
        assert_eq!(body.message, "A database error occurred");
        assert_eq!(body.detail.as_deref(), Some("disk I/O error"));

        let response = ApiError::Database("disk I/O error".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let carried = response.extensions().get::<ErrorBody>().unwrap();
        assert_eq!(carried.detail.as_deref(), Some("disk I/O error"));

        let json = serde_json::to_value(ApiError::NotFound("Product not found".to_string()).body()).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Product not found");
        assert!(json.get("detail").is_none());
    }
}
