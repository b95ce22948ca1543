//! Integration tests for the User repository using in-memory SurrealDB.

use caidence_core::error::CaidenceError;
use caidence_core::models::preferences::Preferences;
use caidence_core::models::role::Role;
use caidence_core::models::user::{NewUser, UpdateUser, generate_user_id};
use caidence_core::repository::UserRepository;
use caidence_db::repository::SurrealUserRepository;
use chrono::{Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    caidence_db::run_migrations(&db).await.unwrap();
    db
}

fn new_user(username: &str, email: &str, role: Role) -> NewUser {
    let created_at = Utc::now();
    NewUser {
        id: generate_user_id(username, email, created_at),
        username: username.into(),
        email: email.into(),
        full_name: format!("{username} tester"),
        password_hash: "$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA".into(),
        role,
        created_at,
        preferences: Preferences::new(),
    }
}

#[tokio::test]
async fn create_and_get_user() {
    let repo = SurrealUserRepository::new(setup().await);

    let input = new_user("alice", "alice@x.com", Role::Viewer);
    let user = repo.create(input.clone()).await.unwrap();

    assert_eq!(user.id, input.id);
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@x.com");
    assert_eq!(user.role, Role::Viewer);
    assert!(user.is_active);
    assert!(user.last_login_at.is_none());

    let fetched = repo.get_by_id(&user.id).await.unwrap();
    assert_eq!(fetched.username, "alice");
    assert_eq!(fetched.password_hash, input.password_hash);
}

#[tokio::test]
async fn get_missing_user_is_not_found() {
    let repo = SurrealUserRepository::new(setup().await);
    let err = repo.get_by_id("does-not-exist").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("alice", "alice@x.com", Role::Viewer))
        .await
        .unwrap();

    let err = repo
        .create(new_user("alice", "alice2@x.com", Role::Viewer))
        .await
        .unwrap_err();
    match err {
        CaidenceError::DuplicateIdentity { field } => assert_eq!(field, "username"),
        other => panic!("expected DuplicateIdentity, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_email_is_rejected_even_for_inactive_owner() {
    let repo = SurrealUserRepository::new(setup().await);
    let first = repo
        .create(new_user("alice", "alice@x.com", Role::Viewer))
        .await
        .unwrap();
    repo.update(
        &first.id,
        UpdateUser {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = repo
        .create(new_user("alicia", "alice@x.com", Role::Viewer))
        .await
        .unwrap_err();
    match err {
        CaidenceError::DuplicateIdentity { field } => assert_eq!(field, "email"),
        other => panic!("expected DuplicateIdentity, got {other:?}"),
    }
}

#[tokio::test]
async fn lookup_by_username_or_email_is_exact() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("alice", "alice@x.com", Role::Viewer))
        .await
        .unwrap();

    assert_eq!(repo.get_by_username_or_email("alice").await.unwrap().id, user.id);
    assert_eq!(
        repo.get_by_username_or_email("alice@x.com").await.unwrap().id,
        user.id
    );
    assert!(repo.get_by_username_or_email("Alice").await.unwrap_err().is_not_found());
    assert!(repo.get_by_username_or_email("ALICE@X.COM").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn inactive_username_does_not_shadow_active_email() {
    let repo = SurrealUserRepository::new(setup().await);
    let stale = repo
        .create(new_user("carol@x.com", "carol.old@x.com", Role::Viewer))
        .await
        .unwrap();
    repo.update(
        &stale.id,
        UpdateUser {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let carol = repo
        .create(new_user("carol", "carol@x.com", Role::Analyst))
        .await
        .unwrap();

    let found = repo.get_by_username_or_email("carol@x.com").await.unwrap();
    assert_eq!(found.id, carol.id);
    assert!(found.is_active);

    // With both rows active the username match wins.
    repo.update(
        &stale.id,
        UpdateUser {
            is_active: Some(true),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let found = repo.get_by_username_or_email("carol@x.com").await.unwrap();
    assert_eq!(found.id, stale.id);
}

#[tokio::test]
async fn identity_exists_checks_both_fields() {
    let repo = SurrealUserRepository::new(setup().await);
    repo.create(new_user("alice", "alice@x.com", Role::Viewer))
        .await
        .unwrap();

    assert!(repo.identity_exists("alice", "new@x.com").await.unwrap());
    assert!(repo.identity_exists("bob", "alice@x.com").await.unwrap());
    assert!(!repo.identity_exists("bob", "bob@x.com").await.unwrap());
}

#[tokio::test]
async fn update_and_preferences() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("carol", "carol@x.com", Role::Analyst))
        .await
        .unwrap();

    let updated = repo
        .update(
            &user.id,
            UpdateUser {
                full_name: Some("Carol Danvers".into()),
                role: Some(Role::Clinician),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name, "Carol Danvers");
    assert_eq!(updated.role, Role::Clinician);

    let mut prefs = Preferences::new();
    prefs.set("theme", "dark");
    prefs.set("page_size", 25i64);
    prefs.set("cohorts", vec!["a", "b"]);
    let with_prefs = repo.set_preferences(&user.id, prefs.clone()).await.unwrap();
    assert_eq!(with_prefs.preferences, prefs);

    let fetched = repo.get_by_id(&user.id).await.unwrap();
    assert_eq!(fetched.preferences, prefs);
}

#[tokio::test]
async fn non_finite_preference_is_refused_and_row_stays_readable() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("dana", "dana@x.com", Role::Viewer))
        .await
        .unwrap();

    let mut prefs = Preferences::new();
    prefs.set("zoom", f64::NAN);
    let err = repo.set_preferences(&user.id, prefs).await.unwrap_err();
    assert!(matches!(err, CaidenceError::Validation { .. }));

    let fetched = repo.get_by_username_or_email("dana").await.unwrap();
    assert!(fetched.preferences.is_empty());

    let mut input = new_user("erin", "erin@x.com", Role::Viewer);
    input.preferences.set("scale", f64::INFINITY);
    let err = repo.create(input).await.unwrap_err();
    assert!(matches!(err, CaidenceError::Validation { .. }));
    assert!(repo.get_by_username_or_email("erin").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn set_last_login_is_idempotent() {
    let repo = SurrealUserRepository::new(setup().await);
    let user = repo
        .create(new_user("dave", "dave@x.com", Role::Viewer))
        .await
        .unwrap();

    let at = Utc::now() + Duration::minutes(5);
    repo.set_last_login(&user.id, at).await.unwrap();
    repo.set_last_login(&user.id, at).await.unwrap();

    let fetched = repo.get_by_id(&user.id).await.unwrap();
    let stored = fetched.last_login_at.expect("last login recorded");
    assert_eq!(stored.timestamp_millis(), at.timestamp_millis());
}

#[tokio::test]
async fn count_active_admins_ignores_inactive() {
    let repo = SurrealUserRepository::new(setup().await);
    assert_eq!(repo.count_active_admins().await.unwrap(), 0);

    let admin = repo
        .create(new_user("root", "root@x.com", Role::Admin))
        .await
        .unwrap();
    repo.create(new_user("eve", "eve@x.com", Role::Researcher))
        .await
        .unwrap();
    assert_eq!(repo.count_active_admins().await.unwrap(), 1);

    repo.update(
        &admin.id,
        UpdateUser {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.count_active_admins().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_stored_role_decodes_as_unknown() {
    let db = setup().await;
    db.query(
        "CREATE type::record('users', 'legacy') SET username = 'legacy', \
         email = 'legacy@x.com', full_name = 'Legacy', password_hash = 'h', \
         role = 'superuser', created_at = time::now()",
    )
    .await
    .unwrap()
    .check()
    .unwrap();

    let repo = SurrealUserRepository::new(db);
    let user = repo.get_by_id("legacy").await.unwrap();
    assert_eq!(user.role, Role::Unknown);
}
