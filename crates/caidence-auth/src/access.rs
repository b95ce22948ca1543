//! Role-based access checks.

use caidence_core::error::{CaidenceError, CaidenceResult};
use caidence_core::models::role::Role;
use caidence_core::models::user::User;

/// Whether `held` meets or exceeds `required` in the role hierarchy.
/// Unknown roles satisfy nothing and are satisfied by nothing.
pub fn role_satisfies(held: Role, required: Role) -> bool {
    let (held, required) = (held.rank(), required.rank());
    held > 0 && required > 0 && held >= required
}

pub fn authorize(user: &User, required: Role) -> bool {
    user.is_active && role_satisfies(user.role, required)
}

/// [`authorize`] for call sites that want a `Result`.
pub fn require(user: &User, required: Role) -> CaidenceResult<()> {
    if authorize(user, required) {
        return Ok(());
    }
    Err(CaidenceError::AuthorizationDenied {
        reason: format!("'{}' does not satisfy required role '{required}'", user.role),
    })
}

#[cfg(test)]
mod tests {
    use caidence_core::models::preferences::Preferences;
    use chrono::Utc;
    use proptest::prelude::*;

    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            full_name: "Alice".into(),
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
            preferences: Preferences::new(),
        }
    }

    fn any_role() -> impl Strategy<Value = Role> {
        let mut roles = Role::ALL.to_vec();
        roles.push(Role::Unknown);
        prop::sample::select(roles)
    }

    #[test]
    fn viewer_cannot_reach_analyst() {
        assert!(authorize(&user(Role::Viewer), Role::Viewer));
        assert!(!authorize(&user(Role::Viewer), Role::Analyst));
    }

    #[test]
    fn admin_reaches_everything_known() {
        let admin = user(Role::Admin);
        for role in Role::ALL {
            assert!(authorize(&admin, role), "admin denied {role}");
        }
        assert!(!authorize(&admin, Role::Unknown));
    }

    #[test]
    fn unknown_role_is_always_denied() {
        assert!(!authorize(&user(Role::Unknown), Role::Viewer));
        assert!(!authorize(&user(Role::Unknown), Role::Unknown));
    }

    #[test]
    fn inactive_user_is_denied() {
        let mut admin = user(Role::Admin);
        admin.is_active = false;
        assert!(!authorize(&admin, Role::Viewer));
    }

    #[test]
    fn require_reports_denial() {
        let err = require(&user(Role::Analyst), Role::Clinician).unwrap_err();
        assert!(matches!(err, CaidenceError::AuthorizationDenied { .. }));
        require(&user(Role::Researcher), Role::Clinician).unwrap();
    }

    proptest! {
        #[test]
        fn granting_is_monotone_in_held_role(a in any_role(), b in any_role(), required in any_role()) {
            // If the lower-ranked known role is granted, the higher one is too.
            let (low, high) = if a.rank() <= b.rank() { (a, b) } else { (b, a) };
            if role_satisfies(low, required) {
                prop_assert!(role_satisfies(high, required));
            }
        }

        #[test]
        fn granting_matches_rank_order(held in any_role(), required in any_role()) {
            let expected = held != Role::Unknown
                && required != Role::Unknown
                && held.rank() >= required.rank();
            prop_assert_eq!(role_satisfies(held, required), expected);
        }
    }
}
