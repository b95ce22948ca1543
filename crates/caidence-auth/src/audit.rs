//! Login attempt auditing.

use std::sync::Arc;

use caidence_core::error::CaidenceResult;
use caidence_core::models::login_attempt::{LoginAttempt, NewLoginAttempt};
use caidence_core::repository::{LoginAttemptRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use tracing::{debug, error};

/// Appends one record per login attempt. Recording is best effort: a
/// failed write is logged and never reaches the caller.
pub struct LoginAuditor<A> {
    attempts: Arc<A>,
}

impl<A: LoginAttemptRepository> LoginAuditor<A> {
    pub fn new(attempts: Arc<A>) -> Self {
        Self { attempts }
    }

    pub async fn record(
        &self,
        username: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
        success: bool,
        timestamp: DateTime<Utc>,
    ) {
        let attempt = NewLoginAttempt {
            username: username.to_string(),
            ip_address,
            user_agent,
            timestamp,
            success,
        };
        match self.attempts.record(attempt).await {
            Ok(recorded) => debug!(attempt_id = %recorded.id, success, "Recorded login attempt"),
            Err(e) => error!(username, success, error = %e, "Failed to record login attempt"),
        }
    }

    /// Attempts for a typed username, newest first.
    pub async fn recent_attempts(
        &self,
        username: &str,
        pagination: Pagination,
    ) -> CaidenceResult<PaginatedResult<LoginAttempt>> {
        self.attempts.list_by_username(username, pagination).await
    }
}
