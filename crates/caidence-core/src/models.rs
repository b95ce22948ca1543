//! Domain models for Caidence auth.
//!
//! These are the types shared across the persistence and auth crates.

pub mod login_attempt;
pub mod preferences;
pub mod role;
pub mod session;
pub mod user;
