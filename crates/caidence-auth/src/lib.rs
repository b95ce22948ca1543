//! Caidence Auth: credential storage, session tokens, login auditing
//! and role-based access control.

pub mod access;
pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod error;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use access::{authorize, require};
pub use bootstrap::{DefaultAdmin, ensure_default_admin};
pub use config::{AuthConfig, HashingParams, RetiredKey, SigningKey, SigningKeys};
pub use error::AuthError;
pub use service::{AuthService, LoginInput, LoginOutput};
pub use session::IssuedSession;
pub use token::SessionClaims;
