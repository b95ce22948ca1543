//! Session domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a session stopped being active. Set exactly once, when
/// `is_active` flips to false.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    LoggedOut,
    Expired,
    Revoked,
}

impl SessionEndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionEndReason::LoggedOut => "logged_out",
            SessionEndReason::Expired => "expired",
            SessionEndReason::Revoked => "revoked",
        }
    }
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionEndReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logged_out" => Ok(SessionEndReason::LoggedOut),
            "expired" => Ok(SessionEndReason::Expired),
            "revoked" => Ok(SessionEndReason::Revoked),
            other => Err(format!("unknown session end reason: {other}")),
        }
    }
}

/// Lifecycle state as observed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// Still flagged active but past `expires_at`; the next validation
    /// or cleanup will end it.
    PendingExpiry,
    Ended(SessionEndReason),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub end_reason: Option<SessionEndReason>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if !self.is_active {
            // Rows deactivated before end reasons were recorded count as logouts.
            return SessionState::Ended(self.end_reason.unwrap_or(SessionEndReason::LoggedOut));
        }
        if self.is_expired_at(now) {
            SessionState::PendingExpiry
        } else {
            SessionState::Active
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(created: DateTime<Utc>) -> Session {
        Session {
            id: "sid".into(),
            user_id: "uid".into(),
            created_at: created,
            expires_at: created + Duration::hours(8),
            last_activity_at: created,
            ip_address: None,
            user_agent: None,
            is_active: true,
            end_reason: None,
        }
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let s = session(now);
        assert!(!s.is_expired_at(s.expires_at));
        assert!(s.is_expired_at(s.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn state_reflects_flag_then_clock() {
        let now = Utc::now();
        let mut s = session(now);
        assert_eq!(s.state_at(now), SessionState::Active);
        assert_eq!(
            s.state_at(now + Duration::hours(9)),
            SessionState::PendingExpiry
        );

        s.is_active = false;
        s.end_reason = Some(SessionEndReason::Expired);
        assert_eq!(
            s.state_at(now),
            SessionState::Ended(SessionEndReason::Expired)
        );
    }

    #[test]
    fn end_reason_names_roundtrip() {
        for r in [
            SessionEndReason::LoggedOut,
            SessionEndReason::Expired,
            SessionEndReason::Revoked,
        ] {
            assert_eq!(r.as_str().parse::<SessionEndReason>().unwrap(), r);
        }
    }
}
