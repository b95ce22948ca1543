//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn fresh_db() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = fresh_db().await;

    let applied = caidence_db::run_migrations(&db).await.unwrap();
    assert_eq!(applied, 1);

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("users"), "missing users table");
    assert!(info_str.contains("sessions"), "missing sessions table");
    assert!(
        info_str.contains("login_attempts"),
        "missing login_attempts table"
    );
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = fresh_db().await;

    assert_eq!(caidence_db::run_migrations(&db).await.unwrap(), 1);
    assert_eq!(caidence_db::run_migrations(&db).await.unwrap(), 0);

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 1, "expected exactly one migration record");
}

#[tokio::test]
async fn unique_index_prevents_duplicate_usernames() {
    let db = fresh_db().await;
    caidence_db::run_migrations(&db).await.unwrap();

    db.query(
        "CREATE users SET username = 'alice', email = 'alice@x.com', \
         full_name = 'Alice', password_hash = 'h', role = 'viewer', \
         created_at = time::now()",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let result = db
        .query(
            "CREATE users SET username = 'alice', email = 'other@x.com', \
             full_name = 'Other', password_hash = 'h', role = 'viewer', \
             created_at = time::now()",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "duplicate username should be rejected");
}

#[tokio::test]
async fn session_end_reason_is_constrained() {
    let db = fresh_db().await;
    caidence_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE sessions SET user_id = 'u', created_at = time::now(), \
             expires_at = time::now(), last_activity_at = time::now(), \
             is_active = false, end_reason = 'vanished'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "unknown end reason should be rejected");
}
