//! Credential store: account creation and password verification.

use std::sync::Arc;

use caidence_core::clock::Clock;
use caidence_core::error::{CaidenceError, CaidenceResult};
use caidence_core::models::preferences::Preferences;
use caidence_core::models::user::{CreateUser, NewUser, UpdateUser, User, generate_user_id};
use caidence_core::repository::UserRepository;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{AuthError, CredentialFailure};
use crate::password::PasswordHasherPool;

pub struct CredentialStore<U> {
    users: Arc<U>,
    hasher: PasswordHasherPool,
    min_password_length: usize,
    clock: Arc<dyn Clock>,
}

impl<U: UserRepository> CredentialStore<U> {
    pub fn new(
        users: Arc<U>,
        hasher: PasswordHasherPool,
        min_password_length: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            hasher,
            min_password_length,
            clock,
        }
    }

    /// Register a new account.
    ///
    /// Username and email must be unused by any account, active or not.
    /// Under concurrent registration of the same identity exactly one
    /// caller succeeds and the rest get `DuplicateIdentity`.
    pub async fn create_user(&self, input: CreateUser) -> CaidenceResult<User> {
        self.validate(&input)?;

        // Cheap rejection before paying for a hash. The unique indexes
        // still decide races.
        if self
            .users
            .identity_exists(&input.username, &input.email)
            .await?
        {
            return Err(CaidenceError::DuplicateIdentity {
                field: "username or email".into(),
            });
        }

        let password_hash = self.hasher.hash(input.password).await?;
        let created_at = self.clock.now();

        let user = self
            .users
            .create(NewUser {
                id: generate_user_id(&input.username, &input.email, created_at),
                username: input.username,
                email: input.email,
                full_name: input.full_name,
                password_hash,
                role: input.role,
                created_at,
                preferences: Preferences::new(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "Created user");
        Ok(user)
    }

    /// Check a username-or-email and password pair.
    ///
    /// Unknown accounts, inactive accounts and wrong passwords all fail
    /// with the same `InvalidCredentials`; only the log says which.
    pub async fn verify_credentials(&self, login: &str, password: &str) -> CaidenceResult<User> {
        match self.check(login, password).await? {
            Ok(user) => Ok(user),
            Err(failure) => {
                match failure {
                    CredentialFailure::UnknownUser => {
                        warn!(login, "Credential check failed: no such user")
                    }
                    CredentialFailure::InactiveUser => {
                        warn!(login, "Credential check failed: account inactive")
                    }
                    CredentialFailure::WrongPassword => {
                        warn!(login, "Credential check failed: wrong password")
                    }
                }
                Err(AuthError::Credentials(failure).into())
            }
        }
    }

    /// Outer result is a store failure; inner result is the verdict.
    async fn check(
        &self,
        login: &str,
        password: &str,
    ) -> CaidenceResult<Result<User, CredentialFailure>> {
        let user = match self.users.get_by_username_or_email(login).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                self.hasher.verify_dummy(password.to_string()).await?;
                return Ok(Err(CredentialFailure::UnknownUser));
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            self.hasher.verify_dummy(password.to_string()).await?;
            return Ok(Err(CredentialFailure::InactiveUser));
        }

        let valid = self
            .hasher
            .verify(password.to_string(), user.password_hash.clone())
            .await?;
        if !valid {
            return Ok(Err(CredentialFailure::WrongPassword));
        }

        Ok(Ok(user))
    }

    pub async fn set_last_login(&self, user_id: &str, at: DateTime<Utc>) -> CaidenceResult<()> {
        self.users.set_last_login(user_id, at).await
    }

    pub async fn get_user(&self, user_id: &str) -> CaidenceResult<User> {
        self.users.get_by_id(user_id).await
    }

    pub async fn get_user_by_username_or_email(&self, login: &str) -> CaidenceResult<User> {
        self.users.get_by_username_or_email(login).await
    }

    pub async fn deactivate_user(&self, user_id: &str) -> CaidenceResult<User> {
        let user = self.set_active(user_id, false).await?;
        info!(user_id, "Deactivated user");
        Ok(user)
    }

    pub async fn activate_user(&self, user_id: &str) -> CaidenceResult<User> {
        let user = self.set_active(user_id, true).await?;
        info!(user_id, "Activated user");
        Ok(user)
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        preferences: Preferences,
    ) -> CaidenceResult<User> {
        self.users.set_preferences(user_id, preferences).await
    }

    pub async fn count_active_admins(&self) -> CaidenceResult<u64> {
        self.users.count_active_admins().await
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> CaidenceResult<User> {
        self.users
            .update(
                user_id,
                UpdateUser {
                    is_active: Some(is_active),
                    ..Default::default()
                },
            )
            .await
    }

    fn validate(&self, input: &CreateUser) -> Result<(), AuthError> {
        if input.username.trim().is_empty() {
            return Err(AuthError::InvalidInput("username is required".into()));
        }
        if input.username.trim() != input.username {
            return Err(AuthError::InvalidInput(
                "username must not start or end with whitespace".into(),
            ));
        }
        if !input.email.contains('@') || input.email.trim() != input.email {
            return Err(AuthError::InvalidInput("email is not valid".into()));
        }
        if input.password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.min_password_length,
            });
        }
        Ok(())
    }
}
