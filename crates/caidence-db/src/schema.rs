//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. Row identifiers are the
//! record keys themselves; enums are stored as lowercase strings. The
//! user role is deliberately unconstrained so that a role name written
//! by a newer release decodes as `Role::Unknown` instead of failing.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "auth_tables",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: users, sessions, login attempts
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE users SCHEMAFULL;
DEFINE FIELD username ON TABLE users TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD email ON TABLE users TYPE string \
    ASSERT string::len($value) > 0;
DEFINE FIELD full_name ON TABLE users TYPE string;
DEFINE FIELD password_hash ON TABLE users TYPE string;
DEFINE FIELD role ON TABLE users TYPE string;
DEFINE FIELD is_active ON TABLE users TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE users TYPE datetime;
DEFINE FIELD last_login_at ON TABLE users TYPE option<datetime>;
DEFINE FIELD preferences ON TABLE users TYPE object FLEXIBLE DEFAULT {};
DEFINE INDEX idx_users_username ON TABLE users COLUMNS username UNIQUE;
DEFINE INDEX idx_users_email ON TABLE users COLUMNS email UNIQUE;
DEFINE INDEX idx_users_role ON TABLE users COLUMNS role, is_active;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE sessions SCHEMAFULL;
DEFINE FIELD user_id ON TABLE sessions TYPE string;
DEFINE FIELD created_at ON TABLE sessions TYPE datetime;
DEFINE FIELD expires_at ON TABLE sessions TYPE datetime;
DEFINE FIELD last_activity_at ON TABLE sessions TYPE datetime;
DEFINE FIELD ip_address ON TABLE sessions TYPE option<string>;
DEFINE FIELD user_agent ON TABLE sessions TYPE option<string>;
DEFINE FIELD is_active ON TABLE sessions TYPE bool DEFAULT true;
DEFINE FIELD end_reason ON TABLE sessions TYPE option<string> \
    ASSERT $value = NONE OR $value IN ['logged_out', 'expired', 'revoked'];
DEFINE INDEX idx_sessions_user ON TABLE sessions COLUMNS user_id, is_active;
DEFINE INDEX idx_sessions_expiry ON TABLE sessions \
    COLUMNS is_active, expires_at;

-- =======================================================================
-- Login attempts (append-only)
-- =======================================================================
DEFINE TABLE login_attempts SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD username ON TABLE login_attempts TYPE string;
DEFINE FIELD ip_address ON TABLE login_attempts TYPE option<string>;
DEFINE FIELD user_agent ON TABLE login_attempts TYPE option<string>;
DEFINE FIELD timestamp ON TABLE login_attempts TYPE datetime;
DEFINE FIELD success ON TABLE login_attempts TYPE bool;
DEFINE INDEX idx_login_attempts_username ON TABLE login_attempts \
    COLUMNS username, timestamp;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client and
/// return how many were applied.
///
/// The `_migration` bookkeeping table is created on first run. Each
/// migration runs together with its bookkeeping row inside a single
/// transaction, so a failed migration leaves no version recorded and two
/// processes racing to migrate cannot both record the same version.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = current_version(db).await?;
    let mut applied = 0;

    for migration in pending(current) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        let script = format!(
            "BEGIN TRANSACTION;\n{}\nCREATE _migration SET version = $version, name = $name;\nCOMMIT TRANSACTION;",
            migration.sql
        );
        db.query(&script)
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "v{} '{}': {e}",
                    migration.version, migration.name
                ))
            })?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, from = current, "Schema migrated");
    }
    Ok(applied)
}

async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    Ok(records.first().map(|m| m.version).unwrap_or(0))
}

fn pending(current: u32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS.iter().filter(move |m| m.version > current)
}

/// Raw DDL for version 1, for tooling that inspects the schema.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
