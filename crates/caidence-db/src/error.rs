//! Database-specific error types and conversions.

use std::time::Duration;

use caidence_core::error::CaidenceError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique index {index} violated")]
    UniqueViolation { index: String },

    #[error("Record {0} already exists")]
    DuplicateRecord(String),

    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Malformed row: {0}")]
    Decode(String),
}

impl DbError {
    /// Sort a raw SurrealDB error into the cases callers react to
    /// differently. SurrealDB reports these only through its message
    /// text.
    pub fn classify(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("already contains") {
            let index = msg
                .split('`')
                .nth(1)
                .map(str::to_string)
                .unwrap_or_default();
            DbError::UniqueViolation { index }
        } else if msg.contains("already exists") {
            let record = msg
                .split('`')
                .nth(1)
                .map(str::to_string)
                .unwrap_or_default();
            DbError::DuplicateRecord(record)
        } else if msg.contains("can be retried") || msg.contains("conflict") {
            DbError::Conflict(msg)
        } else if msg.contains("connection") || msg.contains("Connection") {
            DbError::Connection(msg)
        } else {
            DbError::Surreal(err)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }
}

/// Map a unique index name to the user-facing field it guards.
fn field_for_index(index: &str) -> String {
    if index.contains("username") {
        "username".into()
    } else if index.contains("email") {
        "email".into()
    } else {
        index.to_string()
    }
}

impl From<DbError> for CaidenceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CaidenceError::NotFound { entity, id },
            DbError::UniqueViolation { index } => CaidenceError::DuplicateIdentity {
                field: field_for_index(&index),
            },
            // Record ids derive from the identity, so a colliding id is a
            // colliding identity.
            DbError::DuplicateRecord(_) => CaidenceError::DuplicateIdentity {
                field: "username".into(),
            },
            DbError::Timeout(_) | DbError::Conflict(_) | DbError::Connection(_) => {
                CaidenceError::TransientStoreFailure(err.to_string())
            }
            other => CaidenceError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_duplicate_identity() {
        let err: CaidenceError = DbError::UniqueViolation {
            index: "idx_users_email".into(),
        }
        .into();
        match err {
            CaidenceError::DuplicateIdentity { field } => assert_eq!(field, "email"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn record_collision_maps_to_duplicate_identity() {
        let err: CaidenceError = DbError::DuplicateRecord("users:abc".into()).into();
        assert!(matches!(err, CaidenceError::DuplicateIdentity { .. }));
    }

    #[test]
    fn timeouts_are_transient() {
        let err: CaidenceError = DbError::Timeout(Duration::from_secs(5)).into();
        assert!(err.is_transient());
    }

    #[test]
    fn decode_errors_are_not_transient() {
        let err: CaidenceError = DbError::Decode("bad role".into()).into();
        assert!(!err.is_transient());
    }
}
