use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Profile carries no role, or one this build does not recognise.
    #[error("profile has no recognised role")]
    NoRole,

    #[error("role '{0}' is not allowed here")]
    RoleNotAllowed(Role),
}

/// Check a profile role against an allow-list.
///
/// - No IO
/// - No panics
/// - Absent role never passes, whatever the list contains
pub fn authorize_role(role: Option<Role>, allowed: &[Role]) -> Result<Role, AccessError> {
    let role = role.ok_or(AccessError::NoRole)?;
    if allowed.contains(&role) {
        Ok(role)
    } else {
        Err(AccessError::RoleNotAllowed(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_role_passes() {
        assert_eq!(authorize_role(Some(Role::Agent), &Role::MANAGER_FAMILY), Ok(Role::Agent));
    }

    #[test]
    fn lodger_on_manager_list_is_rejected() {
        assert_eq!(
            authorize_role(Some(Role::Lodger), &[Role::Admin, Role::Agent]),
            Err(AccessError::RoleNotAllowed(Role::Lodger))
        );
    }

    #[test]
    fn absent_role_never_passes() {
        assert_eq!(authorize_role(None, &Role::ALL), Err(AccessError::NoRole));
    }
}
