//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! None of them are retried: they are rule violations, not transient faults.

use std::fmt;

#[derive(Debug)]
pub enum DomainError {
    /// Referenced book, transaction or member does not exist
    NotFound,
    /// No available copies left to issue
    OutOfStock,
    /// Operation not valid for the transaction's current status
    InvalidState(String),
    /// Date or copy-count constraint violated
    InvalidRange(String),
    /// Blocked by active references (deletion, duplicate loan)
    Conflict(String),
    /// Malformed input (missing required fields, unknown role)
    Validation(String),
    /// Database/persistence error
    Database(String),
}

impl DomainError {
    /// Stable snake_case identifier surfaced to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound => "not_found",
            DomainError::OutOfStock => "out_of_stock",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::InvalidRange(_) => "invalid_range",
            DomainError::Conflict(_) => "conflict",
            DomainError::Validation(_) => "validation",
            DomainError::Database(_) => "database",
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotFound => write!(f, "Resource not found"),
            DomainError::OutOfStock => write!(f, "No copies available"),
            DomainError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            DomainError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            DomainError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}
