//! User domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::preferences::Preferences;
use super::role::Role;

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub preferences: Preferences,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .field("last_login_at", &self.last_login_at)
            .field("preferences", &self.preferences)
            .finish()
    }
}

/// Registration input as supplied by a caller.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub role: Role,
}

impl fmt::Debug for CreateUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// A fully prepared user row, password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub preferences: Option<Preferences>,
}

/// Derive the opaque user identifier from username, email and creation
/// time: the first 128 bits of SHA-256 over `username:email:created_at`,
/// hex-encoded.
pub fn generate_user_id(username: &str, email: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(created_at.to_rfc3339().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User {
            id: "0123456789abcdef0123456789abcdef".into(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            full_name: "Alice".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: Role::Viewer,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
            preferences: Preferences::new(),
        }
    }

    #[test]
    fn user_id_is_deterministic_hex() {
        let at = Utc::now();
        let a = generate_user_id("alice", "alice@x.com", at);
        assert_eq!(a, generate_user_id("alice", "alice@x.com", at));
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn user_id_depends_on_every_input() {
        let at = Utc::now();
        let base = generate_user_id("alice", "alice@x.com", at);
        assert_ne!(base, generate_user_id("alicf", "alice@x.com", at));
        assert_ne!(base, generate_user_id("alice", "alice@y.com", at));
        assert_ne!(
            base,
            generate_user_id("alice", "alice@x.com", at + Duration::microseconds(1))
        );
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn debug_redacts_password_hash() {
        let dbg = format!("{:?}", sample_user());
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("argon2"));
    }
}
