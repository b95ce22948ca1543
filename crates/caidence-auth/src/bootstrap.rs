//! First-run administrator provisioning.

use std::fmt;

use caidence_core::error::{CaidenceError, CaidenceResult};
use caidence_core::models::role::Role;
use caidence_core::models::user::{CreateUser, User};
use caidence_core::repository::{LoginAttemptRepository, SessionRepository, UserRepository};
use tracing::info;

use crate::service::AuthService;

/// The administrator account to create on an empty deployment.
#[derive(Clone)]
pub struct DefaultAdmin {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

impl DefaultAdmin {
    /// `admin` / `admin@caidence.local` with the given password.
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            username: "admin".into(),
            email: "admin@caidence.local".into(),
            full_name: "System Administrator".into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for DefaultAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultAdmin")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Create `admin` unless an active administrator already exists.
///
/// Returns the created user, or `None` when nothing was done. Losing a
/// creation race to another instance also counts as nothing done.
pub async fn ensure_default_admin<U, S, A>(
    service: &AuthService<U, S, A>,
    admin: DefaultAdmin,
) -> CaidenceResult<Option<User>>
where
    U: UserRepository,
    S: SessionRepository,
    A: LoginAttemptRepository,
{
    let existing = service.credentials().count_active_admins().await?;
    if existing > 0 {
        info!(existing, "Administrator present, skipping bootstrap");
        return Ok(None);
    }

    let created = service
        .create_user(CreateUser {
            username: admin.username,
            email: admin.email,
            full_name: admin.full_name,
            password: admin.password,
            role: Role::Admin,
        })
        .await;

    match created {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "Created default administrator");
            Ok(Some(user))
        }
        Err(CaidenceError::DuplicateIdentity { field }) => {
            info!(%field, "Default administrator identity already taken");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
