//! Signed session tokens and session id generation.
//!
//! A session token is an HS256 JWT whose `kid` header names the signing
//! key. Expiry is deliberately not enforced by the JWT layer: the session
//! manager compares `exp` against its own clock so that an expired
//! session can be marked ended when it is seen.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use caidence_core::models::role::Role;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SigningKeys;
use crate::error::{AuthError, TokenRejection};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session id.
    pub sid: String,
    /// Subject: user id.
    pub sub: String,
    pub username: String,
    pub role: Role,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Generate a cryptographically random session id
/// (32 bytes, base64url-encoded without padding).
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Sign `claims` with the current key.
pub fn issue_session_token(claims: &SessionClaims, keys: &SigningKeys) -> Result<String, AuthError> {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(keys.current.kid().to_string());

    let key = EncodingKey::from_secret(keys.current.secret());
    jsonwebtoken::encode(&header, claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Verify the signature and issuer of a session token.
///
/// A token signed by the retired key is accepted only while `now` is
/// inside that key's grace window.
pub fn decode_session_token(
    token: &str,
    keys: &SigningKeys,
    issuer: &str,
    now: DateTime<Utc>,
) -> Result<SessionClaims, TokenRejection> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| TokenRejection::Malformed(e.to_string()))?;
    let kid = header.kid.ok_or(TokenRejection::UnknownKey)?;
    let key = keys
        .verification_key(&kid, now)
        .ok_or(TokenRejection::UnknownKey)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<SessionClaims>(token, &DecodingKey::from_secret(key.secret()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenRejection::BadSignature,
            _ => TokenRejection::Malformed(e.to_string()),
        })
}
