//! API error type with stable reason codes
//!
//! Callers only ever see a reason code and an HTTP status; store/oracle error
//! text stays in the logs. `ApiError` enables `?` propagation from handlers
//! without per-call `.map_err` boilerplate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Stable reason codes surfaced to the storefront and admin UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidHandle,
    BadStars,
    BadRequest,
    Unauthorized,
    OrderNotFound,
    PaymentMismatch,
    OracleUnavailable,
    InvalidTransition,
    UnknownAction,
    DbError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidHandle => "INVALID_HANDLE",
            Self::BadStars => "BAD_STARS",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::PaymentMismatch => "PAYMENT_MISMATCH",
            Self::OracleUnavailable => "ORACLE_UNAVAILABLE",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::UnknownAction => "UNKNOWN_ACTION",
            Self::DbError => "DB_ERROR",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidHandle | Self::BadStars | Self::BadRequest | Self::UnknownAction => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            // Verification failed; the order stays pending and the client may retry.
            Self::PaymentMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OracleUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidTransition => StatusCode::CONFLICT,
            Self::DbError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// API-layer error: a reason code, nothing more.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}")]
pub struct ApiError {
    pub code: ErrorCode,
}

impl ApiError {
    pub fn new(code: ErrorCode) -> Self {
        Self { code }
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        Self { code }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Database error");
        Self::new(ErrorCode::DbError)
    }
}

impl From<crate::engine::EngineError> for ApiError {
    fn from(e: crate::engine::EngineError) -> Self {
        use crate::engine::EngineError;
        match e {
            EngineError::InvalidHandle => Self::new(ErrorCode::InvalidHandle),
            EngineError::InvalidQuantity => Self::new(ErrorCode::BadStars),
            EngineError::OrderNotFound => Self::new(ErrorCode::OrderNotFound),
            EngineError::PaymentMismatch(reason) => {
                tracing::info!(%reason, "Payment verification mismatch");
                Self::new(ErrorCode::PaymentMismatch)
            }
            EngineError::OracleUnavailable => Self::new(ErrorCode::OracleUnavailable),
            EngineError::InvalidTransition { from } => {
                tracing::info!(from = from.as_str(), "Invalid admin transition");
                Self::new(ErrorCode::InvalidTransition)
            }
            EngineError::Store(err) => {
                tracing::error!(error = %err, "Ledger store error");
                Self::new(ErrorCode::DbError)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.code.http_status(),
            Json(json!({ "ok": false, "error": self.code.as_str() })),
        )
            .into_response()
    }
}

/// Convenience alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
