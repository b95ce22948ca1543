//! SurrealDB implementation of [`SessionRepository`].
//!
//! Sessions are never deleted. Every state change is a conditional
//! `UPDATE ... WHERE is_active = true`, so once a session has ended no
//! later write can touch or revive it, and of two racing writers exactly
//! one observes the active row.

use std::time::Duration;

use caidence_core::error::CaidenceResult;
use caidence_core::models::session::{NewSession, Session, SessionEndReason};
use caidence_core::repository::SessionRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use super::support::{DEFAULT_QUERY_TIMEOUT, bounded};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    is_active: bool,
    end_reason: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    is_active: bool,
    end_reason: Option<String>,
}

fn row_to_session(row: SessionRow, id: String) -> Result<Session, DbError> {
    let end_reason = row
        .end_reason
        .as_deref()
        .map(str::parse::<SessionEndReason>)
        .transpose()
        .map_err(DbError::Decode)?;
    Ok(Session {
        id,
        user_id: row.user_id,
        created_at: row.created_at,
        expires_at: row.expires_at,
        last_activity_at: row.last_activity_at,
        ip_address: row.ip_address,
        user_agent: row.user_agent,
        is_active: row.is_active,
        end_reason,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        row_to_session(
            SessionRow {
                user_id: self.user_id,
                created_at: self.created_at,
                expires_at: self.expires_at,
                last_activity_at: self.last_activity_at,
                ip_address: self.ip_address,
                user_agent: self.user_agent,
                is_active: self.is_active,
                end_reason: self.end_reason,
            },
            self.record_id,
        )
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
    timeout: Duration,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::with_timeout(db, DEFAULT_QUERY_TIMEOUT)
    }

    pub fn with_timeout(db: Surreal<C>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Run a conditional update and report how many rows it changed.
    async fn changed_rows(
        &self,
        query: &'static str,
        binds: Vec<(&'static str, String)>,
        at: Option<DateTime<Utc>>,
    ) -> Result<u64, DbError> {
        let mut builder = self.db.query(query);
        for bind in binds {
            builder = builder.bind(bind);
        }
        if let Some(at) = at {
            builder = builder.bind(("at", at));
        }

        let result = bounded(self.timeout, builder).await?;
        let mut result = result.check().map_err(DbError::classify)?;
        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.len() as u64)
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: NewSession) -> CaidenceResult<Session> {
        let result = bounded(
            self.timeout,
            self.db
                .query(
                    "CREATE type::record('sessions', $id) SET \
                     user_id = $user_id, \
                     created_at = $created_at, \
                     expires_at = $expires_at, \
                     last_activity_at = $created_at, \
                     ip_address = $ip_address, \
                     user_agent = $user_agent, \
                     is_active = true, \
                     end_reason = NONE",
                )
                .bind(("id", input.id.clone()))
                .bind(("user_id", input.user_id))
                .bind(("created_at", input.created_at))
                .bind(("expires_at", input.expires_at))
                .bind(("ip_address", input.ip_address))
                .bind(("user_agent", input.user_agent)),
        )
        .await?;

        let mut result = result.check().map_err(DbError::classify)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: input.id.clone(),
        })?;

        Ok(row_to_session(row, input.id)?)
    }

    async fn get_by_id(&self, id: &str) -> CaidenceResult<Session> {
        let mut result = bounded(
            self.timeout,
            self.db
                .query("SELECT * FROM type::record('sessions', $id)")
                .bind(("id", id.to_string())),
        )
        .await?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id.to_string(),
        })?;

        Ok(row_to_session(row, id.to_string())?)
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> CaidenceResult<bool> {
        let changed = self
            .changed_rows(
                "UPDATE type::record('sessions', $id) \
                 SET last_activity_at = $at WHERE is_active = true",
                vec![("id", id.to_string())],
                Some(at),
            )
            .await?;
        Ok(changed > 0)
    }

    async fn deactivate(&self, id: &str, reason: SessionEndReason) -> CaidenceResult<bool> {
        let changed = self
            .changed_rows(
                "UPDATE type::record('sessions', $id) \
                 SET is_active = false, end_reason = $reason \
                 WHERE is_active = true",
                vec![
                    ("id", id.to_string()),
                    ("reason", reason.as_str().to_string()),
                ],
                None,
            )
            .await?;
        Ok(changed > 0)
    }

    async fn deactivate_user_sessions(
        &self,
        user_id: &str,
        reason: SessionEndReason,
    ) -> CaidenceResult<u64> {
        Ok(self
            .changed_rows(
                "UPDATE sessions SET is_active = false, end_reason = $reason \
                 WHERE user_id = $user_id AND is_active = true",
                vec![
                    ("user_id", user_id.to_string()),
                    ("reason", reason.as_str().to_string()),
                ],
                None,
            )
            .await?)
    }

    async fn list_active_by_user(&self, user_id: &str) -> CaidenceResult<Vec<Session>> {
        let mut result = bounded(
            self.timeout,
            self.db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM sessions \
                     WHERE user_id = $user_id AND is_active = true \
                     ORDER BY last_activity_at DESC",
                )
                .bind(("user_id", user_id.to_string())),
        )
        .await?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let sessions = rows
            .into_iter()
            .map(SessionRowWithId::try_into_session)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(sessions)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> CaidenceResult<u64> {
        Ok(self
            .changed_rows(
                "UPDATE sessions SET is_active = false, end_reason = 'expired' \
                 WHERE is_active = true AND expires_at < $at",
                Vec::new(),
                Some(now),
            )
            .await?)
    }
}
