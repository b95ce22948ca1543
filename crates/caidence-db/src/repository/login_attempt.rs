//! SurrealDB implementation of [`LoginAttemptRepository`].

use std::time::Duration;

use caidence_core::error::CaidenceResult;
use caidence_core::models::login_attempt::{LoginAttempt, NewLoginAttempt};
use caidence_core::repository::{LoginAttemptRepository, PaginatedResult, Pagination};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::support::{CountRow, DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AttemptRow {
    username: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    timestamp: DateTime<Utc>,
    success: bool,
}

#[derive(Debug, SurrealValue)]
struct AttemptRowWithId {
    record_id: String,
    username: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    timestamp: DateTime<Utc>,
    success: bool,
}

impl AttemptRow {
    fn into_attempt(self, id: Uuid) -> LoginAttempt {
        LoginAttempt {
            id,
            username: self.username,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            timestamp: self.timestamp,
            success: self.success,
        }
    }
}

impl AttemptRowWithId {
    fn try_into_attempt(self) -> Result<LoginAttempt, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid login attempt UUID: {e}")))?;
        Ok(LoginAttempt {
            id,
            username: self.username,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            timestamp: self.timestamp,
            success: self.success,
        })
    }
}

/// SurrealDB implementation of the append-only login attempt log.
#[derive(Clone)]
pub struct SurrealLoginAttemptRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealLoginAttemptRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::with_timeout(db, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeout(db: Surreal<C>, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

impl<C: Connection> LoginAttemptRepository for SurrealLoginAttemptRepository<C> {
    async fn record(&self, input: NewLoginAttempt) -> CaidenceResult<LoginAttempt> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = bounded(
            self.timeout,
            self.db
                .query(
                    "CREATE type::record('login_attempts', $id) SET \
                     username = $username, \
                     ip_address = $ip_address, \
                     user_agent = $user_agent, \
                     timestamp = $timestamp, \
                     success = $success",
                )
                .bind(("id", id_str.clone()))
                .bind(("username", input.username))
                .bind(("ip_address", input.ip_address))
                .bind(("user_agent", input.user_agent))
                .bind(("timestamp", input.timestamp))
                .bind(("success", input.success)),
        )
        .await?;

        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<AttemptRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "login_attempt".into(),
            id: id_str,
        })?;

        Ok(row.into_attempt(id))
    }

    async fn list_by_username(
        &self,
        username: &str,
        pagination: Pagination,
    ) -> CaidenceResult<PaginatedResult<LoginAttempt>> {
        let mut count_result = bounded(
            self.timeout,
            self.db
                .query(
                    "SELECT count() AS total FROM login_attempts \
                     WHERE username = $username GROUP ALL",
                )
                .bind(("username", username.to_string())),
        )
        .await?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = bounded(
            self.timeout,
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM login_attempts \
                     WHERE username = $username \
                     ORDER BY timestamp DESC \
                     LIMIT $limit START $offset",
                )
                .bind(("username", username.to_string()))
                .bind(("limit", pagination.limit))
                .bind(("offset", pagination.offset)),
        )
        .await?;

        let rows: Vec<AttemptRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AttemptRowWithId::try_into_attempt)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
