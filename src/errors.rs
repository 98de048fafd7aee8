use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

/// Service-level error taxonomy.
///
/// Every failure here is scoped to a single request; nothing is retried
/// automatically. Checkout validation failures are raised before any write
/// begins, and the stock/coupon races abort the whole transaction.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid shipping method: {0}")]
    InvalidShippingMethod(String),

    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::EmptyCart
            | Self::InvalidShippingMethod(_)
            | Self::InvalidCoupon(_)
            | Self::InvalidStatusTransition { .. } => StatusCode::BAD_REQUEST,
            Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TransactionConflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for HTTP responses. Internal errors return a generic
    /// message to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Classifies a commit-time database failure. Lock contention and
    /// serialization failures surface as a retryable conflict.
    pub fn from_commit_error(err: DbErr) -> Self {
        let msg = err.to_string();
        let lowered = msg.to_lowercase();
        if lowered.contains("locked")
            || lowered.contains("deadlock")
            || lowered.contains("serialization")
            || lowered.contains("could not serialize")
        {
            ServiceError::TransactionConflict(msg)
        } else {
            ServiceError::DatabaseError(err)
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}
