use serde::{Deserialize, Serialize};

use staybook_core::TenantId;

use crate::{AccountStatus, OnboardingStatus};

/// Workspace readiness derived from a profile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TenantState {
    NoTenant,
    PaymentPending,
    Active,
    Suspended,
}

impl TenantState {
    /// First match wins: no tenant, then suspension (either flag), then
    /// anything short of an active onboarding.
    pub fn classify(
        tenant_id: Option<TenantId>,
        onboarding: OnboardingStatus,
        account: AccountStatus,
    ) -> Self {
        if tenant_id.is_none() {
            return TenantState::NoTenant;
        }
        if account == AccountStatus::Suspended || onboarding == OnboardingStatus::Suspended {
            return TenantState::Suspended;
        }
        match onboarding {
            OnboardingStatus::Active => TenantState::Active,
            OnboardingStatus::PendingPlan
            | OnboardingStatus::PaymentPending
            | OnboardingStatus::Unknown => TenantState::PaymentPending,
            OnboardingStatus::Suspended => TenantState::Suspended,
        }
    }
}
