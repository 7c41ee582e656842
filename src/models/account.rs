//! Account model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub role: i16,
}

impl Account {
    /// Typed view of the stored role value
    pub fn role(&self) -> Role {
        Role::from_i16(self.role).unwrap_or(Role::NotSet)
    }
}

/// Account role, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    NotSet,
    Admin,
    ProblemSetter,
    Contester,
    Worker,
}

impl Role {
    /// Stable wire value stored in the database
    pub fn as_i16(&self) -> i16 {
        match self {
            Self::NotSet => 0,
            Self::Admin => 1,
            Self::ProblemSetter => 2,
            Self::Contester => 3,
            Self::Worker => 4,
        }
    }

    /// Parse a stored wire value
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::NotSet),
            1 => Some(Self::Admin),
            2 => Some(Self::ProblemSetter),
            3 => Some(Self::Contester),
            4 => Some(Self::Worker),
            _ => None,
        }
    }

    /// Role name embedded in bearer tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSet => "not_set",
            Self::Admin => "admin",
            Self::ProblemSetter => "problem_setter",
            Self::Contester => "contester",
            Self::Worker => "worker",
        }
    }

    /// Parse a role name from a token claim
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_set" => Some(Self::NotSet),
            "admin" => Some(Self::Admin),
            "problem_setter" => Some(Self::ProblemSetter),
            "contester" => Some(Self::Contester),
            "worker" => Some(Self::Worker),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_values() {
        for role in [
            Role::NotSet,
            Role::Admin,
            Role::ProblemSetter,
            Role::Contester,
            Role::Worker,
        ] {
            assert_eq!(Role::from_i16(role.as_i16()), Some(role));
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_i16(99), None);
    }
}
