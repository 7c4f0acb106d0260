//! HTTP error mapping.
//!
//! Library errors (`GameCacheError` and its parts) become an [`ApiError`]
//! with a stable [`ErrorCode`], serialized as
//! `{ "code": "...", "message": "...", "details": {...} }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gamecache_core::{ConfigError, GameCacheError, ProviderError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request defects (400)
    InvalidInput,
    MissingField,
    InvalidFormat,

    // Provider failures with no cached fallback
    /// 502
    UpstreamFailure,
    /// 504
    UpstreamTimeout,

    // Our side (500, 503)
    InternalError,
    DatabaseError,
    ServiceUnavailable,
    ConnectionPoolExhausted,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput | ErrorCode::MissingField | ErrorCode::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::UpstreamFailure => StatusCode::BAD_GATEWAY,
            ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    /// Message used when a caller has nothing more specific to say.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid request",
            ErrorCode::MissingField => "A required parameter is missing",
            ErrorCode::InvalidFormat => "A parameter has the wrong format",
            ErrorCode::UpstreamFailure => "The metadata provider request failed",
            ErrorCode::UpstreamTimeout => "The metadata provider did not answer in time",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Cache storage operation failed",
            ErrorCode::ServiceUnavailable => "Cache storage is unavailable",
            ErrorCode::ConnectionPoolExhausted => "No database connection available",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR
// ============================================================================

/// Error body returned by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Provider name, retry hints, upstream status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required parameter '{}' is missing", field),
        )
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("'{}' must be {}", field, expected),
        )
    }

    pub fn upstream_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamFailure, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM LIBRARY ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match &err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(field),
            ValidationError::InvalidKey { .. } => {
                ApiError::new(ErrorCode::InvalidFormat, err.to_string())
            }
            _ => ApiError::invalid_input(err.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        let mut details = json!({ "retryable": true });
        let mut code = ErrorCode::UpstreamFailure;
        match &err {
            ProviderError::Timeout { .. } => code = ErrorCode::UpstreamTimeout,
            ProviderError::RateLimited { retry_after_ms, .. } => {
                details["retryAfterMs"] = json!(retry_after_ms);
            }
            ProviderError::RequestFailed { status, .. } => {
                details["upstreamStatus"] = json!(status);
            }
            ProviderError::NotConfigured { .. } | ProviderError::UnsupportedResource { .. } => {
                details["retryable"] = json!(false);
            }
            _ => {}
        }
        ApiError::new(code, err.to_string()).with_details(details)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Cache storage error: {:?}", err);

        if err.is_transient() {
            ApiError::service_unavailable("Cache storage is unavailable")
        } else {
            ApiError::database_error("Cache storage operation failed")
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(format!("Configuration error: {}", err))
    }
}

/// Map the library taxonomy onto HTTP: invalid requests are 400, upstream
/// failures without a cached fallback are 502, storage faults are 5xx.
impl From<GameCacheError> for ApiError {
    fn from(err: GameCacheError) -> Self {
        match err {
            GameCacheError::InvalidRequest(e) => e.into(),
            GameCacheError::UpstreamFetch { provider, source } => {
                let api_err = ApiError::from(source);
                let mut details = api_err.details.clone().unwrap_or_else(|| json!({}));
                details["provider"] = json!(provider);
                api_err.with_details(details)
            }
            GameCacheError::Storage(e) => e.into(),
            GameCacheError::Config(e) => e.into(),
        }
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);

        // Return a generic database error to avoid leaking internal details
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);

        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::internal_error(format!("Cached payload has an unexpected shape: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
