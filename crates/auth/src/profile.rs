//! Tenant profile: role and tenant linkage for a signed-in user.

use serde::{Deserialize, Serialize};

use staybook_core::{TenantId, UserId};

use crate::{Role, TenantState};

/// Where the tenant is in the sign-up → payment → active pipeline.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    /// Account exists but no plan has been chosen.
    PendingPlan,
    PaymentPending,
    Active,
    Suspended,
    /// Anything the store sends that this build does not know.
    #[serde(other)]
    Unknown,
}

/// Administrative status of the account, independent of onboarding.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
}

/// Immutable snapshot of one profile fetch.
///
/// Never mutated in place: a refetch produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProfileRecord")]
pub struct Profile {
    pub user_id: UserId,
    /// `None` when the store row has no role or one this build does not know.
    pub role: Option<Role>,
    pub tenant_id: Option<TenantId>,
    pub onboarding_status: OnboardingStatus,
    pub account_status: AccountStatus,
    pub full_name: String,
    pub email: String,
}

impl Profile {
    /// Always derived from this snapshot; never cache the result across
    /// profile replacements.
    pub fn tenant_state(&self) -> TenantState {
        TenantState::classify(self.tenant_id, self.onboarding_status, self.account_status)
    }
}

/// Row shape returned by the profile store.
///
/// Lenient on purpose: missing names, a missing status or an unknown role
/// string all still produce a usable `Profile`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    #[serde(alias = "id")]
    pub user_id: UserId,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub onboarding_status: Option<OnboardingStatus>,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        let role = record.role.as_deref().and_then(|raw| match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(user_id = %record.user_id, error = %e, "ignoring profile role");
                None
            }
        });

        Self {
            user_id: record.user_id,
            role,
            tenant_id: record.tenant_id,
            onboarding_status: record.onboarding_status.unwrap_or(OnboardingStatus::Unknown),
            account_status: record.account_status,
            full_name: record.full_name.unwrap_or_default(),
            email: record.email.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_store_row() {
        let tenant = TenantId::random();
        let user = UserId::random();
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": user,
            "role": "lodger",
            "tenant_id": tenant,
            "onboarding_status": "active",
            "full_name": "Lucía Pérez",
            "email": "lucia@example.com"
        }))
        .unwrap();

        assert_eq!(profile.user_id, user);
        assert_eq!(profile.role, Some(Role::Lodger));
        assert_eq!(profile.tenant_id, Some(tenant));
        assert_eq!(profile.account_status, AccountStatus::Active);
        assert_eq!(profile.tenant_state(), TenantState::Active);
    }

    #[test]
    fn unknown_role_and_status_degrade_instead_of_failing() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "user_id": UserId::random(),
            "role": "owner",
            "onboarding_status": "trialing"
        }))
        .unwrap();

        assert_eq!(profile.role, None);
        assert_eq!(profile.onboarding_status, OnboardingStatus::Unknown);
        assert_eq!(profile.tenant_state(), TenantState::NoTenant);
        assert!(profile.full_name.is_empty());
    }

    #[test]
    fn serialized_profile_reads_back() {
        let profile = Profile {
            user_id: UserId::random(),
            role: Some(Role::Admin),
            tenant_id: Some(TenantId::random()),
            onboarding_status: OnboardingStatus::PaymentPending,
            account_status: AccountStatus::Active,
            full_name: "Jordi".to_string(),
            email: "jordi@example.com".to_string(),
        };
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
