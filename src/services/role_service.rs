//! Role-based authorization gate
//!
//! Permissions are dotted-layer names separated by `:`. A role grants a set
//! of names; a granted name implies any longer name sharing its layer
//! prefix, so granting `submissions:write` covers `submissions:write:self`.

use crate::constants::permissions::*;
use crate::models::Role;

/// Authorization gate evaluating role grants
pub struct RoleService;

impl RoleService {
    /// Permissions granted to a role
    pub fn grants(role: Role) -> &'static [&'static str] {
        match role {
            Role::Admin => &[
                ACCOUNTS_READ_ALL,
                ACCOUNTS_WRITE_ALL,
                PROBLEMS_READ_ALL,
                PROBLEMS_WRITE_ALL,
                TEST_CASES_READ_ALL,
                TEST_CASES_WRITE_ALL,
                SUBMISSIONS_READ_ALL,
                SUBMISSIONS_WRITE_ALL,
            ],
            Role::ProblemSetter => &[
                ACCOUNTS_READ_ALL,
                ACCOUNTS_WRITE_SELF,
                PROBLEMS_READ_ALL,
                PROBLEMS_WRITE_SELF,
                TEST_CASES_READ_ALL,
                TEST_CASES_WRITE_SELF,
                SUBMISSIONS_READ_ALL,
                SUBMISSIONS_WRITE_SELF,
            ],
            Role::Contester => &[
                ACCOUNTS_READ_SELF,
                ACCOUNTS_WRITE_SELF,
                PROBLEMS_READ_ALL,
                SUBMISSIONS_READ_SELF,
                SUBMISSIONS_WRITE_SELF,
            ],
            Role::Worker => &[
                PROBLEMS_READ_ALL,
                TEST_CASES_READ_ALL,
                SUBMISSIONS_READ_ALL,
                SUBMISSIONS_WRITE_ALL,
            ],
            Role::NotSet => &[],
        }
    }

    /// Whether a granted permission implies a required one: the granted
    /// layers must be a prefix of the required layers.
    fn implies(granted: &str, required: &str) -> bool {
        let mut granted_layers = granted.split(':');
        let mut required_layers = required.split(':');

        loop {
            match (granted_layers.next(), required_layers.next()) {
                (None, _) => return true,
                (Some(_), None) => return false,
                (Some(g), Some(r)) if g != r => return false,
                _ => {}
            }
        }
    }

    /// Whether the role carries any of the required permissions
    pub fn check(role: Role, required: &[&str]) -> bool {
        required.iter().any(|required_permission| {
            Self::grants(role)
                .iter()
                .any(|granted| Self::implies(granted, required_permission))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_implication() {
        assert!(RoleService::implies("submissions:write", "submissions:write:self"));
        assert!(RoleService::implies("submissions:write", "submissions:write"));
        assert!(RoleService::implies("submissions", "submissions:read:self"));

        assert!(!RoleService::implies("submissions:write:self", "submissions:write"));
        assert!(!RoleService::implies("submissions:read", "submissions:write"));
        assert!(!RoleService::implies("accounts:read", "submissions:read"));
    }

    #[test]
    fn test_contester_grants() {
        assert!(RoleService::check(Role::Contester, &[SUBMISSIONS_WRITE_SELF]));
        assert!(RoleService::check(Role::Contester, &[SUBMISSIONS_READ_SELF]));

        assert!(!RoleService::check(Role::Contester, &[SUBMISSIONS_WRITE_ALL]));
        assert!(!RoleService::check(Role::Contester, &[SUBMISSIONS_READ_ALL]));
        assert!(!RoleService::check(Role::Contester, &[TEST_CASES_READ_ALL]));
    }

    #[test]
    fn test_problem_setter_grants() {
        assert!(RoleService::check(Role::ProblemSetter, &[SUBMISSIONS_READ_ALL]));
        assert!(RoleService::check(Role::ProblemSetter, &[SUBMISSIONS_WRITE_SELF]));

        assert!(!RoleService::check(Role::ProblemSetter, &[SUBMISSIONS_WRITE_ALL]));
    }

    #[test]
    fn test_worker_grants() {
        assert!(RoleService::check(
            Role::Worker,
            &[SUBMISSIONS_READ_ALL, SUBMISSIONS_WRITE_ALL]
        ));
        assert!(RoleService::check(Role::Worker, &[SUBMISSIONS_READ_ALL]));
        assert!(RoleService::check(Role::Worker, &[SUBMISSIONS_WRITE_ALL]));
        // The broad write grant covers the self-scoped name
        assert!(RoleService::check(Role::Worker, &[SUBMISSIONS_WRITE_SELF]));

        assert!(!RoleService::check(Role::Worker, &[ACCOUNTS_READ_ALL]));
    }

    #[test]
    fn test_admin_covers_all_submission_permissions() {
        for permission in [
            SUBMISSIONS_READ_SELF,
            SUBMISSIONS_WRITE_SELF,
            SUBMISSIONS_READ_ALL,
            SUBMISSIONS_WRITE_ALL,
        ] {
            assert!(RoleService::check(Role::Admin, &[permission]));
        }
    }

    #[test]
    fn test_check_is_any_not_all() {
        // One carried permission out of the required set is enough
        assert!(RoleService::check(
            Role::Contester,
            &[SUBMISSIONS_WRITE_ALL, SUBMISSIONS_WRITE_SELF]
        ));
    }

    #[test]
    fn test_not_set_role_has_no_grants() {
        assert!(!RoleService::check(Role::NotSet, &[SUBMISSIONS_READ_SELF]));
        assert!(!RoleService::check(Role::NotSet, &[]));
    }
}
