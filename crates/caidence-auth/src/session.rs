//! Session lifecycle: issue, validate, end.
//!
//! Sessions move `Active -> {Expired | LoggedOut | Revoked}` and never
//! back. Expiry is lazy: a past-expiry session stays flagged active until
//! a validation or a cleanup sweep observes it.

use std::sync::Arc;

use caidence_core::clock::Clock;
use caidence_core::error::CaidenceResult;
use caidence_core::models::session::{NewSession, Session, SessionEndReason, SessionState};
use caidence_core::models::user::User;
use caidence_core::repository::{SessionRepository, UserRepository};
use chrono::Duration;
use tracing::{debug, info};

use crate::config::SigningKeys;
use crate::error::{AuthError, TokenRejection};
use crate::token::{self, SessionClaims};

/// A freshly created session and the signed token that names it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

pub struct SessionManager<S, U> {
    sessions: Arc<S>,
    users: Arc<U>,
    keys: SigningKeys,
    issuer: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: SessionRepository, U: UserRepository> SessionManager<S, U> {
    pub fn new(
        sessions: Arc<S>,
        users: Arc<U>,
        keys: SigningKeys,
        issuer: String,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            users,
            keys,
            issuer,
            ttl,
            clock,
        }
    }

    pub async fn create_session(
        &self,
        user: &User,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> CaidenceResult<IssuedSession> {
        let now = self.clock.now();
        let expires_at = now + self.ttl;

        let session = self
            .sessions
            .create(NewSession {
                id: token::generate_session_id(),
                user_id: user.id.clone(),
                created_at: now,
                expires_at,
                ip_address,
                user_agent,
            })
            .await?;

        let claims = SessionClaims {
            sid: session.id.clone(),
            sub: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = token::issue_session_token(&claims, &self.keys)?;

        debug!(user_id = %user.id, session_id = %session.id, %expires_at, "Created session");
        Ok(IssuedSession { token, session })
    }

    /// Resolve a token to its user, refreshing the session's activity
    /// time. Every failure surfaces as `InvalidOrExpiredToken`.
    ///
    /// A session found past its expiry is ended with reason `expired`
    /// before the call fails.
    pub async fn validate_session(&self, token: &str) -> CaidenceResult<User> {
        match self.check(token).await? {
            Ok(user) => Ok(user),
            Err(rejection) => {
                debug!(reason = ?rejection, "Session token rejected");
                Err(AuthError::Token(rejection).into())
            }
        }
    }

    async fn check(&self, token: &str) -> CaidenceResult<Result<User, TokenRejection>> {
        let now = self.clock.now();

        let claims = match token::decode_session_token(token, &self.keys, &self.issuer, now) {
            Ok(claims) => claims,
            Err(rejection) => return Ok(Err(rejection)),
        };

        let session = match self.sessions.get_by_id(&claims.sid).await {
            Ok(session) => session,
            Err(e) if e.is_not_found() => return Ok(Err(TokenRejection::SessionNotFound)),
            Err(e) => return Err(e),
        };
        if session.user_id != claims.sub {
            return Ok(Err(TokenRejection::SubjectMismatch));
        }
        let state = session.state_at(now);
        if let SessionState::Ended(reason) = state {
            debug!(session_id = %session.id, reason = %reason, "Session already ended");
            return Ok(Err(TokenRejection::SessionEnded));
        }

        let user = match self.users.get_by_id(&session.user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Ok(Err(TokenRejection::AccountMissing)),
            Err(e) => return Err(e),
        };
        if !user.is_active {
            return Ok(Err(TokenRejection::AccountInactive));
        }

        if state == SessionState::PendingExpiry {
            if self
                .sessions
                .deactivate(&session.id, SessionEndReason::Expired)
                .await?
            {
                info!(session_id = %session.id, user_id = %session.user_id, "Session expired");
            }
            return Ok(Err(TokenRejection::SessionExpired));
        }

        // Loses to a logout or expiry that landed after the read above.
        if !self.sessions.touch(&session.id, now).await? {
            return Ok(Err(TokenRejection::SessionEnded));
        }

        Ok(Ok(user))
    }

    /// End the session named by `token`. Returns whether a session was
    /// actually ended; unknown, already-ended and badly signed tokens
    /// all yield `false`.
    pub async fn logout(&self, token: &str) -> CaidenceResult<bool> {
        let claims =
            match token::decode_session_token(token, &self.keys, &self.issuer, self.clock.now()) {
                Ok(claims) => claims,
                Err(rejection) => {
                    debug!(reason = ?rejection, "Logout with unusable token");
                    return Ok(false);
                }
            };

        let ended = self
            .sessions
            .deactivate(&claims.sid, SessionEndReason::LoggedOut)
            .await?;
        if ended {
            info!(session_id = %claims.sid, user_id = %claims.sub, "Logged out");
        }
        Ok(ended)
    }

    /// Revoke every active session of a user.
    pub async fn logout_all(&self, user_id: &str) -> CaidenceResult<u64> {
        let revoked = self
            .sessions
            .deactivate_user_sessions(user_id, SessionEndReason::Revoked)
            .await?;
        info!(user_id, revoked, "Revoked user sessions");
        Ok(revoked)
    }

    /// Sessions still flagged active, most recently used first. May
    /// include sessions past expiry that nothing has swept yet.
    pub async fn list_active_sessions(&self, user_id: &str) -> CaidenceResult<Vec<Session>> {
        self.sessions.list_active_by_user(user_id).await
    }

    /// End every active session whose expiry has passed. Safe to run
    /// repeatedly and concurrently with validation.
    pub async fn cleanup_expired(&self) -> CaidenceResult<u64> {
        let swept = self.sessions.deactivate_expired(self.clock.now()).await?;
        info!(swept, "Expired sessions cleaned up");
        Ok(swept)
    }
}
