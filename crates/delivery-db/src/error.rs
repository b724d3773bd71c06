//! # Database Error Types
//!
//! Error types for configuration store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ServiceError (delivery-service) ← NotFound / Persistence{retryable}   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Administrator sees the message verbatim                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Updating or deleting a zone id that does not exist
    /// - Replacing tiers of a missing zone
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - The same pattern twice for one zone (drafts are deduplicated first,
    ///   so this means data written outside the service)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (includes CHECK constraint and trigger aborts).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored row or setting could not be turned into a domain record.
    #[error("Invalid stored data in {entity}: {reason}")]
    InvalidData { entity: String, reason: String },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an InvalidData error.
    pub fn invalid_data(entity: impl Into<String>, reason: impl ToString) -> Self {
        DbError::InvalidData {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    /// Reclassifies a statement failure inside a transaction. The
    /// transaction rolled back, so the whole write can be tried again.
    ///
    /// Not-found, uniqueness and foreign-key failures keep their kind.
    pub fn in_transaction(self) -> Self {
        match self {
            DbError::QueryFailed(message) | DbError::Internal(message) => DbError::TransactionFailed(message),
            other => other,
        }
    }

    /// True for failures worth retrying unchanged: lock contention,
    /// exhausted pool, dropped connection, failed commit.
    pub fn is_retryable(&self) -> bool {
        match self {
            DbError::PoolExhausted | DbError::ConnectionFailed(_) | DbError::TransactionFailed(_) => true,
            DbError::QueryFailed(message) => {
                message.contains("database is locked") || message.contains("database is busy")
            }
            _ => false,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode   → DbError::InvalidData
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>, ..."
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => DbError::InvalidData {
                entity: format!("column {}", index),
                reason: source.to_string(),
            },

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::InvalidData {
            entity: "settings".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(DbError::QueryFailed("database is locked".into()).is_retryable());
        assert!(!DbError::QueryFailed("CHECK constraint failed".into()).is_retryable());
        assert!(!DbError::not_found("Zone", 4).is_retryable());
    }

    #[test]
    fn test_failure_inside_transaction_is_retryable() {
        let err = DbError::QueryFailed("injected failure".into()).in_transaction();
        assert!(matches!(err, DbError::TransactionFailed(ref msg) if msg == "injected failure"));
        assert!(err.is_retryable());

        let unique = DbError::UniqueViolation {
            field: "zones.name".into(),
            value: "unknown".into(),
        }
        .in_transaction();
        assert!(matches!(unique, DbError::UniqueViolation { .. }));
        assert!(!unique.is_retryable());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(DbError::not_found("Zone", 4).to_string(), "Zone not found: 4");
    }
}
