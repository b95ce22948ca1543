//! Error types for the Caidence auth subsystem.
//!
//! Every failure a caller can observe is one of these variants. Finer
//! distinctions (why a token was rejected, why a login failed) live in
//! the auth crate and are only visible in logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaidenceError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Identity already in use: {field}")]
    DuplicateIdentity { field: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Store temporarily unavailable: {0}")]
    TransientStoreFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaidenceError {
    /// Whether the caller may retry the same operation unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStoreFailure(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type CaidenceResult<T> = Result<T, CaidenceError>;
