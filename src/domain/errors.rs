//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! The HTTP mapping lives in `api::error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),
    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),
    /// Uniqueness or referential conflict (duplicate name, document still referenced)
    #[error("{0}")]
    Conflict(String),
    /// Applying the operation would drive a variant's stock below zero
    #[error(
        "Insufficient stock for variant {variant_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        variant_id: i32,
        available: i32,
        requested: i32,
    },
    /// Authentication / authorization failure
    #[error("{0}")]
    Unauthorized(String),
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_the_variant() {
        let err = DomainError::InsufficientStock {
            variant_id: 7,
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for variant 7: available 2, requested 5"
        );
    }

    #[test]
    fn db_errors_become_database_variant() {
        let err: DomainError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, DomainError::Database(msg) if msg.contains("boom")));
    }
}
