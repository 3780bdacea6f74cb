use core::str::FromStr;

use serde::{Deserialize, Serialize};

use staybook_core::CoreError;

/// Closed set of roles a profile can carry.
///
/// Exactly one per profile. The wire form is the lowercase name used by the
/// profile store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Agent,
    Viewer,
    Api,
    Lodger,
}

/// Coarse grouping used to pick a portal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleFamily {
    Superadmin,
    Manager,
    Lodger,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Superadmin,
        Role::Admin,
        Role::Agent,
        Role::Viewer,
        Role::Api,
        Role::Lodger,
    ];

    /// Staff of a property-management tenant.
    pub const MANAGER_FAMILY: [Role; 4] = [Role::Admin, Role::Agent, Role::Viewer, Role::Api];

    pub fn family(self) -> RoleFamily {
        match self {
            Role::Superadmin => RoleFamily::Superadmin,
            Role::Admin | Role::Agent | Role::Viewer | Role::Api => RoleFamily::Manager,
            Role::Lodger => RoleFamily::Lodger,
        }
    }

    pub fn is_manager(self) -> bool {
        self.family() == RoleFamily::Manager
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Viewer => "viewer",
            Role::Api => "api",
            Role::Lodger => "lodger",
        }
    }
}

impl RoleFamily {
    /// Whether any role of this family appears in `roles`.
    pub fn is_represented_in(self, roles: &[Role]) -> bool {
        roles.iter().any(|r| r.family() == self)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CoreError::UnknownRole(needle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_partition_all_roles() {
        let managers: Vec<Role> = Role::ALL.into_iter().filter(|r| r.is_manager()).collect();
        assert_eq!(managers, Role::MANAGER_FAMILY);
        assert_eq!(Role::Superadmin.family(), RoleFamily::Superadmin);
        assert_eq!(Role::Lodger.family(), RoleFamily::Lodger);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("LODGER".parse::<Role>().unwrap(), Role::Lodger);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            "owner".parse::<Role>(),
            Err(CoreError::UnknownRole("owner".to_string()))
        );
    }

    #[test]
    fn family_membership() {
        let allow = [Role::Admin, Role::Agent];
        assert!(RoleFamily::Manager.is_represented_in(&allow));
        assert!(!RoleFamily::Lodger.is_represented_in(&allow));
    }
}
