//! # Service Error Type
//!
//! What an administrator screen or the CLI sees when an operation fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate_tiers / validate_zone_draft ── ValidationError ──┐           │
//! │                                                              │           │
//! │  ZoneRepository / TierRepository ─────── DbError ──────────┼──►        │
//! │                                                              │  Service │
//! │  ServiceConfig::load ─────────────────── ConfigError ──────┘  Error   │
//! │                                                                         │
//! │  ServiceError::body() ──► { "code": "NOT_FOUND",                       │
//! │                             "message": "Zone not found: 7" }           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database details are logged, not returned: the caller gets a generic
//! persistence message and a `retryable` hint.

use serde::Serialize;
use thiserror::Error;

use delivery_core::{CoreError, ValidationError};
use delivery_db::DbError;

use crate::config::ConfigError;

/// Service operation errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before anything was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The store failed; nothing from the operation was kept.
    #[error("{message}")]
    Persistence { message: String, retryable: bool },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    PersistenceError,
    ConfigError,
}

/// Serializable error body.
///
/// ```json
/// { "code": "VALIDATION_ERROR", "message": "At least one pricing tier is required", "retryable": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Persistence { .. } => ErrorCode::PersistenceError,
            ServiceError::Config(_) => ErrorCode::ConfigError,
        }
    }

    /// True when repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Persistence { retryable: true, .. })
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        let retryable = err.is_retryable();
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => ServiceError::Persistence {
                message: format!("{} '{}' already exists", field, value),
                retryable: false,
            },
            DbError::InvalidData { entity, reason } => {
                tracing::error!(%entity, %reason, "Stored data is invalid");
                ServiceError::Persistence {
                    message: format!("Stored {} data is invalid", entity),
                    retryable: false,
                }
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ServiceError::Persistence {
                    message: "Database connection failed".to_string(),
                    retryable,
                }
            }
            DbError::PoolExhausted => ServiceError::Persistence {
                message: "Database is busy".to_string(),
                retryable,
            },
            DbError::ForeignKeyViolation { message } => ServiceError::Persistence {
                message: format!("Rejected by the database: {}", message),
                retryable: false,
            },
            DbError::QueryFailed(detail) | DbError::TransactionFailed(detail)
                if detail.contains("constraint failed") =>
            {
                ServiceError::Persistence {
                    message: format!("Rejected by the database: {}", detail),
                    retryable,
                }
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", other);
                ServiceError::Persistence {
                    message: "Database operation failed, no changes were saved".to_string(),
                    retryable,
                }
            }
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ZoneNotFound(id) => ServiceError::not_found("Zone", id),
            CoreError::Validation(e) => ServiceError::Validation(e),
        }
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================
