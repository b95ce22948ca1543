//! Authentication error types.
//!
//! The variants here keep the internal reason for a rejection so it can
//! be logged. Converting into [`CaidenceError`] collapses every
//! credential failure into `InvalidCredentials` and every token failure
//! into `InvalidOrExpiredToken`.

use caidence_core::error::CaidenceError;
use thiserror::Error;

/// Why a username/password pair was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownUser,
    InactiveUser,
    WrongPassword,
}

/// Why a session token was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRejection {
    Malformed(String),
    BadSignature,
    UnknownKey,
    SessionNotFound,
    SessionEnded,
    SessionExpired,
    SubjectMismatch,
    AccountMissing,
    AccountInactive,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials ({0:?})")]
    Credentials(CredentialFailure),

    #[error("token rejected ({0:?})")]
    Token(TokenRejection),

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for CaidenceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Credentials(_) => CaidenceError::InvalidCredentials,
            AuthError::Token(_) => CaidenceError::InvalidOrExpiredToken,
            AuthError::WeakPassword { .. }
            | AuthError::InvalidInput(_)
            | AuthError::InvalidConfig(_) => CaidenceError::Validation {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => CaidenceError::Crypto(msg),
        }
    }
}
