//! Seed fixtures for the in-memory backends.
//!
//! ```json
//! { "accounts": [
//!     { "email": "ana@example.com", "password": "demo",
//!       "profile": { "role": "admin", "tenant_id": "…", "onboarding_status": "active" } }
//! ] }
//! ```
//!
//! Profiles go through the same lenient decoding as store rows, so an
//! unknown role in a fixture behaves exactly like one from the real store.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use staybook_auth::{AccountStatus, OnboardingStatus, Profile, ProfileRecord};
use staybook_core::{TenantId, UserId};
use staybook_session::memory::{InMemoryIdentity, InMemoryProfiles};

use crate::error::PortalError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedAccount {
    pub email: String,
    pub password: String,
    /// Fixed id, so fixtures can reference the same user across runs.
    #[serde(default)]
    pub id: Option<UserId>,
    /// No profile row at all when absent.
    #[serde(default)]
    pub profile: Option<SeedProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedProfile {
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
}

impl SeedFile {
    pub fn load(path: &Path) -> Result<Self, PortalError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PortalError::SeedRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, PortalError> {
        let seed: SeedFile = serde_json::from_str(raw)?;
        let mut seen = HashSet::new();
        for account in &seed.accounts {
            if !seen.insert(account.email.trim().to_ascii_lowercase()) {
                return Err(PortalError::DuplicateAccount(account.email.clone()));
            }
        }
        Ok(seed)
    }

    /// One account per portal plus the onboarding edge cases.
    pub fn demo() -> Self {
        let tenant = TenantId::random();
        let account = |email: &str, role: Option<&str>, tenant_id: Option<TenantId>, status| SeedAccount {
            email: email.to_string(),
            password: "demo".to_string(),
            id: None,
            profile: Some(SeedProfile {
                role: role.map(str::to_string),
                tenant_id,
                onboarding_status: Some(status),
                account_status: AccountStatus::Active,
                full_name: None,
            }),
        };

        Self {
            accounts: vec![
                account("root@staybook.test", Some("superadmin"), None, OnboardingStatus::Active),
                account("admin@staybook.test", Some("admin"), Some(tenant), OnboardingStatus::Active),
                account("agent@staybook.test", Some("agent"), Some(tenant), OnboardingStatus::Active),
                account("lodger@staybook.test", Some("lodger"), Some(tenant), OnboardingStatus::Active),
                account("new@staybook.test", Some("admin"), None, OnboardingStatus::PendingPlan),
                account(
                    "unpaid@staybook.test",
                    Some("admin"),
                    Some(TenantId::random()),
                    OnboardingStatus::PaymentPending,
                ),
                SeedAccount {
                    email: "orphan@staybook.test".to_string(),
                    password: "demo".to_string(),
                    id: None,
                    profile: None,
                },
            ],
        }
    }

    /// Register every account (and its profile) with the in-memory backends.
    pub fn apply(&self, identity: &InMemoryIdentity, profiles: &InMemoryProfiles) {
        for seed in &self.accounts {
            let user_id = seed.id.unwrap_or_else(UserId::random);
            let user = identity.add_account_with_id(user_id, &seed.email, &seed.password);

            if let Some(profile) = &seed.profile {
                profiles.insert(Profile::from(ProfileRecord {
                    user_id: user.user_id,
                    role: profile.role.clone(),
                    tenant_id: profile.tenant_id,
                    onboarding_status: profile.onboarding_status,
                    account_status: profile.account_status,
                    full_name: profile.full_name.clone(),
                    email: Some(user.email.clone()),
                }));
            }
        }
        tracing::info!(accounts = self.accounts.len(), "seeded in-memory backends");
    }
}
