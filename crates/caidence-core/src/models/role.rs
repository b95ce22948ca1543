//! Role domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User role, ordered Admin > Researcher > Clinician > Analyst > Viewer.
///
/// Role names are stored in lowercase. A stored name that is not one of
/// the five known roles decodes as [`Role::Unknown`], which ranks below
/// every real role and is never authorized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Researcher,
    Clinician,
    Analyst,
    #[default]
    Viewer,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// All assignable roles, highest rank first.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Researcher,
        Role::Clinician,
        Role::Analyst,
        Role::Viewer,
    ];

    /// Position in the hierarchy. `Unknown` is 0.
    pub fn rank(self) -> u8 {
        match self {
            Role::Admin => 5,
            Role::Researcher => 4,
            Role::Clinician => 3,
            Role::Analyst => 2,
            Role::Viewer => 1,
            Role::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Researcher => "researcher",
            Role::Clinician => "clinician",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
            Role::Unknown => "unknown",
        }
    }

    /// Lenient parse used when decoding stored rows and token claims.
    pub fn from_name(name: &str) -> Role {
        name.parse().unwrap_or(Role::Unknown)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "researcher" => Ok(Role::Researcher),
            "clinician" => Ok(Role::Clinician),
            "analyst" => Ok(Role::Analyst),
            "viewer" => Ok(Role::Viewer),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_strictly_ordered() {
        for pair in Role::ALL.windows(2) {
            assert!(pair[0].rank() > pair[1].rank());
        }
        assert_eq!(Role::Unknown.rank(), 0);
    }

    #[test]
    fn names_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn unrecognised_name_is_unknown() {
        assert_eq!(Role::from_name("superuser"), Role::Unknown);
        assert_eq!(Role::from_name("Admin"), Role::Unknown);
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_and_falls_back() {
        let json = serde_json::to_string(&Role::Clinician).unwrap();
        assert_eq!(json, "\"clinician\"");
        let role: Role = serde_json::from_str("\"root\"").unwrap();
        assert_eq!(role, Role::Unknown);
    }
}
