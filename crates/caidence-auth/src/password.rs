//! Password hashing and verification using Argon2id.

use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use tokio::sync::{OnceCell, Semaphore};

use crate::config::HashingParams;
use crate::error::AuthError;

fn peppered(password: &str, pepper: Option<&str>) -> Vec<u8> {
    match pepper {
        Some(p) => format!("{p}{password}").into_bytes(),
        None => password.as_bytes().to_vec(),
    }
}

fn argon2(params: &HashingParams) -> Result<Argon2<'static>, AuthError> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        None,
    )
    .map_err(|e| AuthError::InvalidConfig(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password into an Argon2id PHC string with a fresh
/// random salt.
///
/// If `pepper` is provided it is prepended to the password before
/// hashing.
pub fn hash_password(
    password: &str,
    pepper: Option<&str>,
    params: &HashingParams,
) -> Result<String, AuthError> {
    let input = peppered(password, pepper);
    let salt = SaltString::generate(&mut OsRng);
    argon2(params)?
        .hash_password(&input, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Crypto(format!("hash error: {e}")))
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// The cost parameters are read from the hash itself, so hashes made
/// under older parameters keep verifying.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let input = peppered(password, pepper);

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(&input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Runs Argon2 work on the blocking thread pool, at most `workers` hashes
/// at a time, so a login burst cannot starve the async runtime.
#[derive(Clone)]
pub struct PasswordHasherPool {
    permits: Arc<Semaphore>,
    pepper: Option<Arc<str>>,
    params: HashingParams,
    dummy_hash: Arc<OnceCell<String>>,
}

impl PasswordHasherPool {
    pub fn new(
        workers: usize,
        pepper: Option<String>,
        params: HashingParams,
    ) -> Result<Self, AuthError> {
        // Reject bad parameters up front rather than on the first login.
        argon2(&params)?;
        Ok(Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            pepper: pepper.map(Arc::from),
            params,
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    pub async fn hash(&self, password: String) -> Result<String, AuthError> {
        let pepper = self.pepper.clone();
        let params = self.params;
        self.run(move || hash_password(&password, pepper.as_deref(), &params))
            .await
    }

    pub async fn verify(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let pepper = self.pepper.clone();
        self.run(move || verify_password(&password, &hash, pepper.as_deref()))
            .await
    }

    /// Spend the same effort as a real verification when there is no
    /// stored hash to check against.
    pub async fn verify_dummy(&self, password: String) -> Result<(), AuthError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| self.hash("caidence-timing-equalizer".into()))
            .await?
            .clone();
        self.verify(password, hash).await.map(|_| ())
    }

    async fn run<T, F>(&self, work: F) -> Result<T, AuthError>
    where
        F: FnOnce() -> Result<T, AuthError> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AuthError::Crypto("hashing pool closed".into()))?;
        tokio::task::spawn_blocking(work)
            .await
            .map_err(|e| AuthError::Crypto(format!("hashing task failed: {e}")))?
    }
}
