//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations must surface
//! timeouts and connection loss as
//! [`CaidenceError::TransientStoreFailure`](crate::error::CaidenceError)
//! and unique-key collisions as `DuplicateIdentity`.

use chrono::{DateTime, Utc};

use crate::error::CaidenceResult;
use crate::models::{
    login_attempt::{LoginAttempt, NewLoginAttempt},
    preferences::Preferences,
    session::{NewSession, Session, SessionEndReason},
    user::{NewUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Credential store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Insert a prepared user. Fails with `DuplicateIdentity` if the
    /// username or email is held by any user, active or not.
    fn create(&self, input: NewUser) -> impl Future<Output = CaidenceResult<User>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = CaidenceResult<User>> + Send;
    /// Exact, case-sensitive match against either username or email.
    fn get_by_username_or_email(
        &self,
        login: &str,
    ) -> impl Future<Output = CaidenceResult<User>> + Send;
    /// Whether a username or email is already taken. Advisory only; the
    /// unique indexes are authoritative.
    fn identity_exists(
        &self,
        username: &str,
        email: &str,
    ) -> impl Future<Output = CaidenceResult<bool>> + Send;
    fn update(
        &self,
        id: &str,
        input: UpdateUser,
    ) -> impl Future<Output = CaidenceResult<User>> + Send;
    fn set_preferences(
        &self,
        id: &str,
        preferences: Preferences,
    ) -> impl Future<Output = CaidenceResult<User>> + Send;
    /// Idempotent.
    fn set_last_login(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CaidenceResult<()>> + Send;
    fn count_active_admins(&self) -> impl Future<Output = CaidenceResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: NewSession) -> impl Future<Output = CaidenceResult<Session>> + Send;
    fn get_by_id(&self, id: &str) -> impl Future<Output = CaidenceResult<Session>> + Send;
    /// Set `last_activity_at` if and only if the session is still
    /// active. Returns whether a row changed.
    fn touch(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CaidenceResult<bool>> + Send;
    /// Flip an active session to inactive. Returns false when the
    /// session was already inactive or does not exist.
    fn deactivate(
        &self,
        id: &str,
        reason: SessionEndReason,
    ) -> impl Future<Output = CaidenceResult<bool>> + Send;
    /// Deactivate every active session of a user.
    fn deactivate_user_sessions(
        &self,
        user_id: &str,
        reason: SessionEndReason,
    ) -> impl Future<Output = CaidenceResult<u64>> + Send;
    /// Active sessions of a user, most recently used first.
    fn list_active_by_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = CaidenceResult<Vec<Session>>> + Send;
    /// Deactivate all active sessions with `expires_at < now`.
    fn deactivate_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = CaidenceResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Login attempts (append-only)
// ---------------------------------------------------------------------------

pub trait LoginAttemptRepository: Send + Sync {
    /// Append a new attempt. No update or delete operations exist.
    fn record(
        &self,
        input: NewLoginAttempt,
    ) -> impl Future<Output = CaidenceResult<LoginAttempt>> + Send;
    /// Attempts for a typed username, newest first.
    fn list_by_username(
        &self,
        username: &str,
        pagination: Pagination,
    ) -> impl Future<Output = CaidenceResult<PaginatedResult<LoginAttempt>>> + Send;
}
