//! Coarse role model mapped from the external identity provider.

use serde::{Deserialize, Serialize};

/// Application role, ordered from least to most privileged.
///
/// The derived ordering backs the hierarchy check: a role satisfies any
/// requirement at or below its own level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Viewer,
    Agent,
    Supervisor,
    Admin,
}

impl Role {
    /// Collapse the external system's role list to a single coarse role.
    ///
    /// Priority order: admin > supervisor > agent, first match wins.
    /// Secondary roles are dropped; a user carrying both "admin" and
    /// "agent" is stored as Admin only.
    pub fn from_external(roles: &[String]) -> Self {
        if roles.iter().any(|r| r == "admin") {
            Self::Admin
        } else if roles.iter().any(|r| r == "supervisor") {
            Self::Supervisor
        } else if roles.iter().any(|r| r == "agent") {
            Self::Agent
        } else {
            Self::Viewer
        }
    }

    /// Hierarchy check: true iff this role's ordinal >= the required one.
    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }

    /// Ordinal level used by the hierarchy (VIEWER:0 .. ADMIN:3).
    pub fn level(&self) -> u8 {
        match self {
            Self::Viewer => 0,
            Self::Agent => 1,
            Self::Supervisor => 2,
            Self::Admin => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "VIEWER",
            Self::Agent => "AGENT",
            Self::Supervisor => "SUPERVISOR",
            Self::Admin => "ADMIN",
        }
    }

    /// Parse a stored role string; anything unrecognized maps to Viewer,
    /// matching the hierarchy's treatment of unknown roles as level 0.
    pub fn parse(s: &str) -> Self {
        match s {
            "ADMIN" => Self::Admin,
            "SUPERVISOR" => Self::Supervisor,
            "AGENT" => Self::Agent,
            _ => Self::Viewer,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_role_mapping_priority() {
        // admin takes priority regardless of array order
        assert_eq!(Role::from_external(&roles(&["agent", "admin"])), Role::Admin);
        assert_eq!(Role::from_external(&roles(&["admin", "agent"])), Role::Admin);
        assert_eq!(
            Role::from_external(&roles(&["supervisor", "agent"])),
            Role::Supervisor
        );
        assert_eq!(Role::from_external(&roles(&["agent"])), Role::Agent);
    }

    #[test]
    fn test_role_mapping_empty_is_viewer() {
        assert_eq!(Role::from_external(&[]), Role::Viewer);
        assert_eq!(Role::from_external(&roles(&["auditor"])), Role::Viewer);
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::Agent));
        assert!(!Role::Agent.satisfies(Role::Admin));
        assert!(Role::Viewer.satisfies(Role::Viewer));
        assert!(Role::Supervisor.satisfies(Role::Agent));
        assert!(!Role::Viewer.satisfies(Role::Agent));
    }

    #[test]
    fn test_role_levels() {
        assert_eq!(Role::Viewer.level(), 0);
        assert_eq!(Role::Agent.level(), 1);
        assert_eq!(Role::Supervisor.level(), 2);
        assert_eq!(Role::Admin.level(), 3);
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in [Role::Viewer, Role::Agent, Role::Supervisor, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), role);
        }
        assert_eq!(Role::parse("SOMETHING_ELSE"), Role::Viewer);
    }

    #[test]
    fn test_role_serde_uppercase() {
        let json = serde_json::to_string(&Role::Supervisor).unwrap();
        assert_eq!(json, "\"SUPERVISOR\"");
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
