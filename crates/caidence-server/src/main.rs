//! Caidence Server: applies migrations, provisions the first
//! administrator and sweeps expired sessions until shutdown.

mod config;

use anyhow::Context;
use caidence_auth::{AuthService, ensure_default_admin};
use caidence_db::DbManager;
use caidence_db::repository::{
    SurrealLoginAttemptRepository, SurrealSessionRepository, SurrealUserRepository,
};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("caidence=info".parse()?))
        .json()
        .init();

    info!("Starting Caidence server...");

    let config = Config::from_env().context("loading configuration")?;

    let db = DbManager::connect(&config.db)
        .await
        .context("connecting to SurrealDB")?;
    let applied = caidence_db::run_migrations(db.client())
        .await
        .context("applying schema migrations")?;
    info!(applied, "Schema up to date");

    let client = db.client().clone();
    let service = AuthService::new(
        SurrealUserRepository::with_timeout(client.clone(), db.query_timeout()),
        SurrealSessionRepository::with_timeout(client.clone(), db.query_timeout()),
        SurrealLoginAttemptRepository::with_timeout(client, db.query_timeout()),
        config.auth,
    )?;

    match config.admin {
        Some(admin) => {
            ensure_default_admin(&service, admin)
                .await
                .context("provisioning default administrator")?;
        }
        None => warn!("CAIDENCE_ADMIN_PASSWORD not set; skipping administrator bootstrap"),
    }

    let mut sweep = tokio::time::interval(config.cleanup_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                if let Err(e) = service.cleanup_expired().await {
                    warn!(error = %e, "Expired session sweep failed");
                }
            }
            signal = &mut shutdown => {
                signal.context("listening for shutdown signal")?;
                break;
            }
        }
    }

    info!("Caidence server stopped.");
    Ok(())
}
