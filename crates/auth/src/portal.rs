//! Portals: the separate front-end surfaces, each with its own login and
//! role allow-list.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use staybook_core::CoreError;

use crate::{Role, RoleFamily};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    /// Public marketing site; sign-up and plan selection start here.
    Commercial,
    Manager,
    Lodger,
    Superadmin,
}

impl Portal {
    pub const ALL: [Portal; 4] = [
        Portal::Commercial,
        Portal::Manager,
        Portal::Lodger,
        Portal::Superadmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Portal::Commercial => "commercial",
            Portal::Manager => "manager",
            Portal::Lodger => "lodger",
            Portal::Superadmin => "superadmin",
        }
    }

    /// Route prefix owned by the portal. The commercial portal owns `/`.
    pub fn prefix(self) -> &'static str {
        match self {
            Portal::Commercial => "",
            Portal::Manager => "/manager",
            Portal::Lodger => "/lodger",
            Portal::Superadmin => "/superadmin",
        }
    }

    pub fn login_path(self) -> &'static str {
        match self {
            Portal::Commercial => "/login",
            Portal::Manager => "/manager/login",
            Portal::Lodger => "/lodger/login",
            Portal::Superadmin => "/superadmin/login",
        }
    }

    pub fn home_path(self) -> &'static str {
        match self {
            Portal::Commercial => "/",
            Portal::Manager => "/manager/dashboard",
            Portal::Lodger => "/lodger/dashboard",
            Portal::Superadmin => "/superadmin/dashboard",
        }
    }

    /// Roles that may finish a login on this portal.
    ///
    /// The commercial portal signs up and signs in property managers, so it
    /// shares the manager allow-list.
    pub fn allowed_roles(self) -> &'static [Role] {
        match self {
            Portal::Commercial | Portal::Manager => &Role::MANAGER_FAMILY,
            Portal::Lodger => &[Role::Lodger],
            Portal::Superadmin => &[Role::Superadmin],
        }
    }

    pub fn for_family(family: RoleFamily) -> Self {
        match family {
            RoleFamily::Superadmin => Portal::Superadmin,
            RoleFamily::Manager => Portal::Manager,
            RoleFamily::Lodger => Portal::Lodger,
        }
    }

    /// Home portal for a role.
    pub fn home_of(role: Role) -> Self {
        Self::for_family(role.family())
    }

    /// Portal implied by a guard allow-list, from role-family membership.
    ///
    /// Manager staff take precedence over lodgers on mixed lists; a list made
    /// only of superadmins implies the superadmin portal. An empty list has
    /// no owner and falls back to the commercial portal.
    pub fn for_allow_list(roles: &[Role]) -> Self {
        if RoleFamily::Manager.is_represented_in(roles) {
            Portal::Manager
        } else if RoleFamily::Lodger.is_represented_in(roles) {
            Portal::Lodger
        } else if RoleFamily::Superadmin.is_represented_in(roles) {
            Portal::Superadmin
        } else {
            Portal::Commercial
        }
    }

    /// Portal owning a route path (query string and fragment ignored).
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        [Portal::Manager, Portal::Lodger, Portal::Superadmin]
            .into_iter()
            .find(|p| {
                path.strip_prefix(p.prefix())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .unwrap_or(Portal::Commercial)
    }
}

impl core::fmt::Display for Portal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Portal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Portal::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CoreError::UnknownPortal(needle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_prefix_respects_segment_boundaries() {
        assert_eq!(Portal::from_path("/manager"), Portal::Manager);
        assert_eq!(Portal::from_path("/manager/accommodations/12?tab=2"), Portal::Manager);
        assert_eq!(Portal::from_path("/lodger/consumo"), Portal::Lodger);
        assert_eq!(Portal::from_path("/superadmin/tenants"), Portal::Superadmin);
        assert_eq!(Portal::from_path("/managers-guide"), Portal::Commercial);
        assert_eq!(Portal::from_path("/plans"), Portal::Commercial);
    }

    #[test]
    fn allow_list_implies_portal_by_family() {
        assert_eq!(Portal::for_allow_list(&[Role::Admin, Role::Agent]), Portal::Manager);
        assert_eq!(Portal::for_allow_list(&[Role::Lodger]), Portal::Lodger);
        assert_eq!(Portal::for_allow_list(&[Role::Superadmin]), Portal::Superadmin);
        assert_eq!(Portal::for_allow_list(&[Role::Lodger, Role::Viewer]), Portal::Manager);
        assert_eq!(Portal::for_allow_list(&[]), Portal::Commercial);
    }

    #[test]
    fn every_role_has_a_home_that_admits_it() {
        for role in Role::ALL {
            let home = Portal::home_of(role);
            assert!(home.allowed_roles().contains(&role), "{role} not allowed on {home}");
        }
    }

    #[test]
    fn login_paths_live_under_their_prefix() {
        for portal in Portal::ALL {
            assert_eq!(Portal::from_path(portal.login_path()), portal);
        }
    }
}
