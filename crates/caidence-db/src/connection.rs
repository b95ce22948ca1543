//! SurrealDB connection management.

use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
    /// Upper bound on a single repository query.
    pub query_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "caidence".into(),
            database: "auth".into(),
            username: "root".into(),
            password: "root".into(),
            query_timeout: Duration::from_secs(5),
        }
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
    query_timeout: Duration,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager. The whole handshake
    /// is bounded by `query_timeout`.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let handshake = async {
            let db = Surreal::new::<Ws>(&config.url).await?;

            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;

            db.use_ns(&config.namespace)
                .use_db(&config.database)
                .await?;

            Ok::<_, surrealdb::Error>(db)
        };

        let db = tokio::time::timeout(config.query_timeout, handshake)
            .await
            .map_err(|_| DbError::Timeout(config.query_timeout))?
            .map_err(|e| DbError::Connection(e.to_string()))?;

        info!("Successfully connected to SurrealDB");

        Ok(Self {
            db,
            query_timeout: config.query_timeout,
        })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }
}
