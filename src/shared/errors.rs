use thiserror::Error;

/// Errors raised by repositories and domain rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        DomainError::Storage(err.to_string())
    }

    /// Whether the operation may succeed if retried (lost connection, busy
    /// database, lock wait).
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_errors_are_transient() {
        assert!(DomainError::storage("database is locked").is_transient());
        assert!(!DomainError::Validation("bad".into()).is_transient());
        assert!(!DomainError::Conflict("RESV1".into()).is_transient());
    }

    #[test]
    fn not_found_message_names_the_entity() {
        let err = DomainError::NotFound {
            entity: "Booking",
            field: "code",
            value: "RESV20240601070000-ABC123".into(),
        };
        assert_eq!(
            err.to_string(),
            "Not found: Booking with code=RESV20240601070000-ABC123"
        );
    }
}
