//! Authentication service: the boundary the rest of the platform calls.

use std::fmt;
use std::sync::Arc;

use caidence_core::clock::{Clock, SystemClock};
use caidence_core::error::CaidenceResult;
use caidence_core::models::login_attempt::LoginAttempt;
use caidence_core::models::role::Role;
use caidence_core::models::session::Session;
use caidence_core::models::user::{CreateUser, User};
use caidence_core::repository::{
    LoginAttemptRepository, PaginatedResult, Pagination, SessionRepository, UserRepository,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::access;
use crate::audit::LoginAuditor;
use crate::config::AuthConfig;
use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::password::PasswordHasherPool;
use crate::session::SessionManager;

/// Input for the login flow.
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl fmt::Debug for LoginInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginInput")
            .field("username_or_email", &self.username_or_email)
            .field("password", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed session token (return to client).
    pub token: String,
    pub user: User,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, S, A> {
    credentials: CredentialStore<U>,
    sessions: SessionManager<S, U>,
    auditor: LoginAuditor<A>,
    clock: Arc<dyn Clock>,
}

impl<U, S, A> AuthService<U, S, A>
where
    U: UserRepository,
    S: SessionRepository,
    A: LoginAttemptRepository,
{
    pub fn new(users: U, sessions: S, attempts: A, config: AuthConfig) -> Result<Self, AuthError> {
        Self::with_clock(users, sessions, attempts, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        users: U,
        sessions: S,
        attempts: A,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let hasher =
            PasswordHasherPool::new(config.hashing_workers, config.pepper.clone(), config.hashing)?;
        let users = Arc::new(users);
        let ttl = config.session_ttl();

        Ok(Self {
            credentials: CredentialStore::new(
                users.clone(),
                hasher,
                config.min_password_length,
                clock.clone(),
            ),
            sessions: SessionManager::new(
                Arc::new(sessions),
                users,
                config.signing_keys,
                config.token_issuer,
                ttl,
                clock.clone(),
            ),
            auditor: LoginAuditor::new(Arc::new(attempts)),
            clock,
        })
    }

    pub fn credentials(&self) -> &CredentialStore<U> {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionManager<S, U> {
        &self.sessions
    }

    pub fn auditor(&self) -> &LoginAuditor<A> {
        &self.auditor
    }

    pub async fn create_user(&self, input: CreateUser) -> CaidenceResult<User> {
        self.credentials.create_user(input).await
    }

    /// Check credentials and open a session.
    ///
    /// Exactly one login attempt is recorded per call, successful or
    /// not. A failure to record it never fails the login.
    pub async fn authenticate(&self, input: LoginInput) -> CaidenceResult<LoginOutput> {
        let LoginInput {
            username_or_email,
            password,
            ip_address,
            user_agent,
        } = input;
        let now = self.clock.now();

        let outcome = self
            .open_session(&username_or_email, &password, ip_address.clone(), user_agent.clone())
            .await;

        self.auditor
            .record(
                &username_or_email,
                ip_address,
                user_agent,
                outcome.is_ok(),
                now,
            )
            .await;

        let mut output = outcome?;

        if let Err(e) = self
            .credentials
            .set_last_login(&output.user.id, now)
            .await
        {
            warn!(user_id = %output.user.id, error = %e, "Failed to record last login");
        } else {
            output.user.last_login_at = Some(now);
        }

        info!(user_id = %output.user.id, session_id = %output.session_id, "User authenticated");
        Ok(output)
    }

    async fn open_session(
        &self,
        login: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> CaidenceResult<LoginOutput> {
        let user = self.credentials.verify_credentials(login, password).await?;
        let issued = self
            .sessions
            .create_session(&user, ip_address, user_agent)
            .await?;

        Ok(LoginOutput {
            token: issued.token,
            user,
            session_id: issued.session.id,
            expires_at: issued.session.expires_at,
        })
    }

    pub async fn validate_session(&self, token: &str) -> CaidenceResult<User> {
        self.sessions.validate_session(token).await
    }

    pub async fn logout(&self, token: &str) -> CaidenceResult<bool> {
        self.sessions.logout(token).await
    }

    pub async fn logout_all(&self, user_id: &str) -> CaidenceResult<u64> {
        self.sessions.logout_all(user_id).await
    }

    pub fn authorize(&self, user: &User, required: Role) -> bool {
        access::authorize(user, required)
    }

    pub async fn list_active_sessions(&self, user_id: &str) -> CaidenceResult<Vec<Session>> {
        self.sessions.list_active_sessions(user_id).await
    }

    pub async fn cleanup_expired(&self) -> CaidenceResult<u64> {
        self.sessions.cleanup_expired().await
    }

    /// Deactivate an account. Its sessions stop validating immediately.
    pub async fn deactivate_user(&self, user_id: &str) -> CaidenceResult<User> {
        self.credentials.deactivate_user(user_id).await
    }

    pub async fn recent_login_attempts(
        &self,
        username: &str,
        pagination: Pagination,
    ) -> CaidenceResult<PaginatedResult<LoginAttempt>> {
        self.auditor.recent_attempts(username, pagination).await
    }
}
