//! Helpers shared by the repository implementations.

use std::future::IntoFuture;
use std::time::Duration;

use surrealdb_types::SurrealValue;

use crate::error::DbError;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Await a SurrealDB call, failing with [`DbError::Timeout`] once
/// `limit` elapses. Errors are classified so unique-index violations
/// and transaction conflicts can be told apart from other failures.
pub(crate) async fn bounded<F, T>(limit: Duration, call: F) -> Result<T, DbError>
where
    F: IntoFuture<Output = Result<T, surrealdb::Error>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| DbError::Timeout(limit))?
        .map_err(DbError::classify)
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}
