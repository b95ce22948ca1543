//! Caidence Core: domain models, repository traits and the error
//! taxonomy shared by the auth, persistence and server crates.

pub mod clock;
pub mod error;
pub mod models;
pub mod repository;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CaidenceError, CaidenceResult};
