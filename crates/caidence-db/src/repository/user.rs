//! SurrealDB implementation of [`UserRepository`].
//!
//! Rows live in the `users` table keyed by the derived user id. The
//! unique indexes on `username` and `email` are what enforce identity
//! uniqueness; concurrent inserts that collide on commit are retried
//! until they either succeed or hit the index.

use std::time::Duration;

use caidence_core::error::CaidenceResult;
use caidence_core::models::preferences::Preferences;
use caidence_core::models::role::Role;
use caidence_core::models::user::{NewUser, UpdateUser, User};
use caidence_core::repository::UserRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use super::support::{CountRow, DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

/// Attempts for an insert that keeps losing commit races.
const MAX_CONFLICT_RETRIES: u32 = 10;

/// DB-side row struct for queries where the id is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    preferences: serde_json::Value,
}

/// DB-side row struct that includes the record id via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    preferences: serde_json::Value,
}

impl UserRow {
    fn into_user(self, id: String) -> Result<User, DbError> {
        let preferences = Preferences::from_json(self.preferences)
            .map_err(|e| DbError::Decode(format!("user {id}: {e}")))?;
        Ok(User {
            id,
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            role: Role::from_name(&self.role),
            is_active: self.is_active,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            preferences,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        UserRow {
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            password_hash: self.password_hash,
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
            preferences: self.preferences,
        }
        .into_user(self.record_id)
    }
}

fn first_or_not_found<T>(rows: Vec<T>, id: impl Into<String>) -> Result<T, DbError> {
    rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "user".into(),
        id: id.into(),
    })
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::with_timeout(db, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeout(db: Surreal<C>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn insert_once(
        &self,
        input: &NewUser,
        preferences: &serde_json::Value,
    ) -> Result<User, DbError> {
        let result = bounded(
            self.timeout,
            self.db
                .query(
                    "CREATE type::record('users', $id) SET \
                     username = $username, email = $email, \
                     full_name = $full_name, \
                     password_hash = $password_hash, \
                     role = $role, is_active = true, \
                     created_at = $created_at, \
                     last_login_at = NONE, \
                     preferences = $preferences",
                )
                .bind(("id", input.id.clone()))
                .bind(("username", input.username.clone()))
                .bind(("email", input.email.clone()))
                .bind(("full_name", input.full_name.clone()))
                .bind(("password_hash", input.password_hash.clone()))
                .bind(("role", input.role.as_str().to_string()))
                .bind(("created_at", input.created_at))
                .bind(("preferences", preferences.clone())),
        )
        .await?;

        let mut result = result.check().map_err(DbError::classify)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        first_or_not_found(rows, input.id.clone())?.into_user(input.id.clone())
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: NewUser) -> CaidenceResult<User> {
        let preferences = input.preferences.to_json()?;
        let mut attempt = 0;
        loop {
            match self.insert_once(&input, &preferences).await {
                Err(e) if e.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(attempt, username = %input.username, "Retrying user insert after conflict");
                    tokio::time::sleep(Duration::from_millis(2 * u64::from(attempt))).await;
                }
                other => return Ok(other?),
            }
        }
    }

    async fn get_by_id(&self, id: &str) -> CaidenceResult<User> {
        let mut result = bounded(
            self.timeout,
            self.db
                .query("SELECT * FROM type::record('users', $id)")
                .bind(("id", id.to_string())),
        )
        .await?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_or_not_found(rows, id)?.into_user(id.to_string())?)
    }

    async fn get_by_username_or_email(&self, login: &str) -> CaidenceResult<User> {
        let mut result = bounded(
            self.timeout,
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM users \
                     WHERE username = $login OR email = $login \
                     ORDER BY created_at ASC LIMIT 2",
                )
                .bind(("login", login.to_string())),
        )
        .await?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        // One user's username may equal another's email. An active account
        // always wins; between equals the username match does.
        let row = rows
            .into_iter()
            .min_by_key(|r| (!r.is_active, r.username != login));
        let row = row.ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("login={login}"),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn identity_exists(&self, username: &str, email: &str) -> CaidenceResult<bool> {
        let mut result = bounded(
            self.timeout,
            self.db
                .query(
                    "SELECT count() AS total FROM users \
                     WHERE username = $username OR email = $email GROUP ALL",
                )
                .bind(("username", username.to_string()))
                .bind(("email", email.to_string())),
        )
        .await?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn update(&self, id: &str, input: UpdateUser) -> CaidenceResult<User> {
        // Encode first so a rejected value never reaches the row.
        let preferences = input.preferences.as_ref().map(Preferences::to_json).transpose()?;

        let mut sets = Vec::new();
        if input.full_name.is_some() {
            sets.push("full_name = $full_name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if preferences.is_some() {
            sets.push("preferences = $preferences");
        }
        if sets.is_empty() {
            return self.get_by_id(id).await;
        }

        let query = format!(
            "UPDATE type::record('users', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(full_name) = input.full_name {
            builder = builder.bind(("full_name", full_name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(preferences) = preferences {
            builder = builder.bind(("preferences", preferences));
        }

        let result = bounded(self.timeout, builder).await?;
        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_or_not_found(rows, id)?.into_user(id.to_string())?)
    }

    async fn set_preferences(&self, id: &str, preferences: Preferences) -> CaidenceResult<User> {
        self.update(
            id,
            UpdateUser {
                preferences: Some(preferences),
                ..Default::default()
            },
        )
        .await
    }

    async fn set_last_login(&self, id: &str, at: DateTime<Utc>) -> CaidenceResult<()> {
        let result = bounded(
            self.timeout,
            self.db
                .query("UPDATE type::record('users', $id) SET last_login_at = $at")
                .bind(("id", id.to_string()))
                .bind(("at", at)),
        )
        .await?;
        result.check().map_err(DbError::classify)?;
        Ok(())
    }

    async fn count_active_admins(&self) -> CaidenceResult<u64> {
        let mut result = bounded(
            self.timeout,
            self.db
                .query(
                    "SELECT count() AS total FROM users \
                     WHERE role = $role AND is_active = true GROUP ALL",
                )
                .bind(("role", Role::Admin.as_str().to_string())),
        )
        .await?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
