//! Authentication configuration.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::error::AuthError;

/// Minimum HMAC secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// An HS256 signing secret together with the key id stamped into the
/// `kid` header of every token it signs.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    secret: Vec<u8>,
}

impl SigningKey {
    pub fn new(kid: impl Into<String>, secret: impl Into<Vec<u8>>) -> Result<Self, AuthError> {
        let kid = kid.into();
        let secret = secret.into();
        if kid.is_empty() {
            return Err(AuthError::InvalidConfig("signing key id is empty".into()));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::InvalidConfig(format!(
                "signing key '{kid}' must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        Ok(Self { kid, secret })
    }

    /// A fresh random key held only in memory. Tokens signed with it die
    /// with the process.
    pub fn generate(kid: impl Into<String>) -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 32] = rand::Rng::random(&mut rng);
        Self {
            kid: kid.into(),
            secret: bytes.to_vec(),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A key that no longer signs but still verifies until `accept_until`.
#[derive(Debug, Clone)]
pub struct RetiredKey {
    pub key: SigningKey,
    pub accept_until: DateTime<Utc>,
}

/// The active signing key plus at most one retired key in its grace
/// window.
///
/// Rotating without a grace window invalidates every outstanding token,
/// since verification only ever considers these two keys.
#[derive(Debug, Clone)]
pub struct SigningKeys {
    pub current: SigningKey,
    pub previous: Option<RetiredKey>,
}

impl SigningKeys {
    pub fn single(current: SigningKey) -> Self {
        Self {
            current,
            previous: None,
        }
    }

    /// Promote `next` to current; the old current key keeps verifying
    /// for `grace` after `now`.
    pub fn rotate(self, next: SigningKey, grace: Duration, now: DateTime<Utc>) -> Self {
        Self {
            current: next,
            previous: Some(RetiredKey {
                key: self.current,
                accept_until: now + grace,
            }),
        }
    }

    /// The key that may verify a token carrying `kid` at `now`.
    pub(crate) fn verification_key(&self, kid: &str, now: DateTime<Utc>) -> Option<&SigningKey> {
        if self.current.kid == kid {
            return Some(&self.current);
        }
        self.previous
            .as_ref()
            .filter(|retired| retired.key.kid == kid && now <= retired.accept_until)
            .map(|retired| &retired.key)
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// OWASP recommendation: m=19456 (19 MiB), t=2, p=1.
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingParams {
    /// The cheapest parameters Argon2 accepts. Only for tests.
    pub fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 keys for session tokens.
    pub signing_keys: SigningKeys,
    /// Session lifetime in seconds (default: 28_800 = 8 hours).
    pub session_ttl_secs: u64,
    /// Token issuer (`iss` claim).
    pub token_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length in characters (default: 8).
    pub min_password_length: usize,
    pub hashing: HashingParams,
    /// Concurrent password hashes allowed on the blocking pool.
    pub hashing_workers: usize,
}

impl AuthConfig {
    pub fn new(signing_keys: SigningKeys) -> Self {
        Self {
            signing_keys,
            session_ttl_secs: 28_800,
            token_issuer: "caidence".into(),
            pepper: None,
            min_password_length: 8,
            hashing: HashingParams::default(),
            hashing_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(kid: &str) -> SigningKey {
        SigningKey::new(kid, vec![7u8; 32]).unwrap()
    }

    #[test]
    fn short_secrets_are_rejected() {
        assert!(SigningKey::new("k1", vec![0u8; 31]).is_err());
        assert!(SigningKey::new("", vec![0u8; 32]).is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let dbg = format!("{:?}", SigningKey::new("k1", b"0123456789abcdef0123456789abcdef".to_vec()).unwrap());
        assert!(!dbg.contains("0123456789abcdef"));
    }

    #[test]
    fn generated_keys_differ() {
        let a = SigningKey::generate("a");
        let b = SigningKey::generate("b");
        assert_ne!(a.secret(), b.secret());
        assert_eq!(a.secret().len(), 32);
    }

    #[test]
    fn retired_key_verifies_only_within_grace() {
        let now = Utc::now();
        let keys = SigningKeys::single(key("old")).rotate(key("new"), Duration::minutes(10), now);

        assert_eq!(keys.verification_key("new", now).unwrap().kid(), "new");
        assert_eq!(keys.verification_key("old", now).unwrap().kid(), "old");
        assert!(
            keys.verification_key("old", now + Duration::minutes(11))
                .is_none()
        );
        assert!(keys.verification_key("other", now).is_none());
    }

    #[test]
    fn defaults_match_eight_hour_sessions() {
        let config = AuthConfig::new(SigningKeys::single(key("k")));
        assert_eq!(config.session_ttl(), Duration::hours(8));
        assert_eq!(config.min_password_length, 8);
        assert!(config.hashing_workers >= 1);
    }
}
