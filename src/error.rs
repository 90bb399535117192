//! Error types for the SQL API gateway.
//!
//! All fallible operations return [`GatewayResult`]. Variants carry enough context
//! for an operator to act on them; `DataSourceInitFailed` and `SqlExecutionFailed`
//! additionally carry a suggestion or SQLSTATE code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("API definition not found or not published: {method} {path}")]
    DefinitionNotFound { path: String, method: String },

    #[error("API definition {method} {path} is not published (status: {status})")]
    DefinitionNotPublished {
        path: String,
        method: String,
        status: String,
    },

    #[error("Datasource not found: {name}")]
    DataSourceNotFound { name: String },

    #[error("Failed to initialize datasource '{name}': {message}")]
    DataSourceInitFailed {
        name: String,
        message: String,
        suggestion: String,
    },

    #[error("SQL execution failed: {message}")]
    SqlExecutionFailed {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Timeout: {operation} exceeded {limit_ms}ms")]
    Timeout { operation: String, limit_ms: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn definition_not_found(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self::DefinitionNotFound {
            path: path.into(),
            method: method.into(),
        }
    }

    pub fn definition_not_published(
        path: impl Into<String>,
        method: impl Into<String>,
        status: impl std::fmt::Display,
    ) -> Self {
        Self::DefinitionNotPublished {
            path: path.into(),
            method: method.into(),
            status: status.to_string(),
        }
    }

    pub fn datasource_not_found(name: impl Into<String>) -> Self {
        Self::DataSourceNotFound { name: name.into() }
    }

    /// Create an initialization error with a hint for the operator.
    pub fn datasource_init(
        name: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::DataSourceInitFailed {
            name: name.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn sql_execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::SqlExecutionFailed {
            message: message.into(),
            sql_state,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, limit: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::DataSourceInitFailed { suggestion, .. } => Some(suggestion),
            Self::DefinitionNotPublished { .. } => {
                Some("Publish the API definition before invoking it")
            }
            Self::DataSourceNotFound { .. } => {
                Some("Register the datasource with --datasource before routing to it")
            }
            _ => None,
        }
    }

    /// Get the SQLSTATE code reported by the backend, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::SqlExecutionFailed { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::DataSourceInitFailed { .. }
        )
    }

    /// HTTP status used when the error is returned from the HTTP surface.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DefinitionNotFound { .. } | Self::DefinitionNotPublished { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::DataSourceNotFound { .. } | Self::DataSourceInitFailed { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::SqlExecutionFailed { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert sqlx errors to GatewayError.
impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                GatewayError::sql_execution(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => GatewayError::sql_execution("No rows returned", None),
            sqlx::Error::PoolTimedOut => {
                GatewayError::sql_execution("Timed out acquiring a pooled connection", None)
            }
            sqlx::Error::PoolClosed => {
                GatewayError::sql_execution("Connection pool is closed", None)
            }
            sqlx::Error::Io(io_err) => {
                GatewayError::sql_execution(format!("I/O error: {}", io_err), None)
            }
            sqlx::Error::Tls(tls_err) => {
                GatewayError::sql_execution(format!("TLS error: {}", tls_err), None)
            }
            sqlx::Error::Protocol(msg) => {
                GatewayError::sql_execution(format!("Protocol error: {}", msg), None)
            }
            sqlx::Error::ColumnNotFound(col) => {
                GatewayError::sql_execution(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnDecode { index, source } => GatewayError::sql_execution(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                GatewayError::sql_execution(format!("Decode error: {}", source), None)
            }
            sqlx::Error::Configuration(msg) => {
                GatewayError::internal(format!("Configuration error: {}", msg))
            }
            sqlx::Error::WorkerCrashed => GatewayError::internal("Database worker crashed"),
            _ => GatewayError::sql_execution(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "errorMessage": self.to_string(),
            "suggestion": self.suggestion(),
        });
        (self.status_code(), axum::Json(body)).into_response()
    }
}
