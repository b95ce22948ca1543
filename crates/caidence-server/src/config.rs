//! Configuration for the Caidence auth server.

use std::time::Duration;

use caidence_auth::{AuthConfig, DefaultAdmin, RetiredKey, SigningKey, SigningKeys};
use caidence_db::DbConfig;
use chrono::{DateTime, Utc};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SurrealDB connection
    pub db: DbConfig,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// How often expired sessions are swept
    pub cleanup_interval: Duration,

    /// Administrator to provision on an empty store, if any
    pub admin: Option<DefaultAdmin>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), Utc::now())
    }

    pub(crate) fn from_lookup(
        var: impl Fn(&str) -> Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ConfigError> {
        let defaults = DbConfig::default();

        // Database
        let query_timeout_secs: u64 = parse_or(&var, "CAIDENCE_DB_TIMEOUT_SECS", 5)?;
        let db = DbConfig {
            url: var("CAIDENCE_DB_URL").ok_or(ConfigError::Missing("CAIDENCE_DB_URL"))?,
            namespace: var("CAIDENCE_DB_NAMESPACE").unwrap_or(defaults.namespace),
            database: var("CAIDENCE_DB_DATABASE").unwrap_or(defaults.database),
            username: var("CAIDENCE_DB_USER").unwrap_or(defaults.username),
            password: var("CAIDENCE_DB_PASSWORD").unwrap_or(defaults.password),
            query_timeout: Duration::from_secs(query_timeout_secs),
        };

        // Signing keys (secret at least 32 bytes)
        let allow_ephemeral: bool = parse_or(&var, "CAIDENCE_ALLOW_EPHEMERAL_KEY", false)?;
        let current = match var("CAIDENCE_SIGNING_KEY") {
            Some(secret) => {
                let kid = var("CAIDENCE_SIGNING_KEY_ID").unwrap_or_else(|| "primary".into());
                SigningKey::new(kid, secret.into_bytes())
                    .map_err(|_| ConfigError::Invalid("CAIDENCE_SIGNING_KEY"))?
            }
            None if allow_ephemeral => {
                tracing::warn!("No signing key configured; sessions will not survive a restart");
                SigningKey::generate("ephemeral")
            }
            None => return Err(ConfigError::Missing("CAIDENCE_SIGNING_KEY")),
        };

        let mut signing_keys = SigningKeys::single(current.clone());
        if let Some(secret) = var("CAIDENCE_PREVIOUS_SIGNING_KEY") {
            let kid = var("CAIDENCE_PREVIOUS_SIGNING_KEY_ID")
                .ok_or(ConfigError::Missing("CAIDENCE_PREVIOUS_SIGNING_KEY_ID"))?;
            let previous = SigningKey::new(kid, secret.into_bytes())
                .map_err(|_| ConfigError::Invalid("CAIDENCE_PREVIOUS_SIGNING_KEY"))?;
            if previous.kid() == current.kid() {
                return Err(ConfigError::Invalid("CAIDENCE_PREVIOUS_SIGNING_KEY_ID"));
            }
            let accept_until = var("CAIDENCE_PREVIOUS_KEY_ACCEPT_UNTIL")
                .ok_or(ConfigError::Missing("CAIDENCE_PREVIOUS_KEY_ACCEPT_UNTIL"))?;
            let accept_until = DateTime::parse_from_rfc3339(accept_until.trim())
                .map_err(|_| ConfigError::Invalid("CAIDENCE_PREVIOUS_KEY_ACCEPT_UNTIL"))?
                .with_timezone(&Utc);
            if accept_until > now {
                signing_keys.previous = Some(RetiredKey {
                    key: previous,
                    accept_until,
                });
            } else {
                tracing::warn!(
                    kid = previous.kid(),
                    %accept_until,
                    "Previous signing key is past its deadline; ignoring it"
                );
            }
        }

        // Sessions (default 8 hours)
        let mut auth = AuthConfig::new(signing_keys);
        auth.session_ttl_secs = parse_or(&var, "CAIDENCE_SESSION_TTL_SECS", 28_800)?;
        if auth.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid("CAIDENCE_SESSION_TTL_SECS"));
        }
        auth.pepper = var("CAIDENCE_PASSWORD_PEPPER");

        // Cleanup sweep (default 15 minutes)
        let cleanup_secs: u64 = parse_or(&var, "CAIDENCE_CLEANUP_INTERVAL_SECS", 900)?;
        if cleanup_secs == 0 {
            return Err(ConfigError::Invalid("CAIDENCE_CLEANUP_INTERVAL_SECS"));
        }

        // Bootstrap admin
        let admin = var("CAIDENCE_ADMIN_PASSWORD").map(|password| {
            let mut admin = DefaultAdmin::new(password);
            if let Some(username) = var("CAIDENCE_ADMIN_USERNAME") {
                admin.email = format!("{username}@caidence.local");
                admin.username = username;
            }
            admin
        });

        Ok(Self {
            db,
            auth,
            cleanup_interval: Duration::from_secs(cleanup_secs),
            admin,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
