//! SurrealDB repository implementations.

mod login_attempt;
mod session;
mod support;
mod user;

pub use login_attempt::SurrealLoginAttemptRepository;
pub use session::SurrealSessionRepository;
pub use support::DEFAULT_QUERY_TIMEOUT;
pub use user::SurrealUserRepository;
