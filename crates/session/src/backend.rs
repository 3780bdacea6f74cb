//! Contracts for the two hosted services this crate consumes.
//!
//! Errors are categorical on purpose: callers map them to state and
//! user-facing text, they never branch on backend-specific detail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use staybook_auth::{AuthEvent, AuthUser, Profile};
use staybook_core::UserId;

use crate::navigation::BillingCycle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email address not confirmed")]
    EmailNotConfirmed,

    #[error("user already registered")]
    UserExists,

    #[error("rate limited")]
    RateLimited,

    #[error("identity backend unreachable: {0}")]
    Transport(String),

    #[error("identity backend rejected the request ({code})")]
    Rejected { code: String },
}

impl IdentityError {
    pub fn is_transport(&self) -> bool {
        matches!(self, IdentityError::Transport(_))
    }
}

/// Extra sign-up data stored with the new identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpMetadata {
    pub full_name: String,
    /// Plan picked on the commercial site before signing up, if any.
    pub plan: Option<String>,
    pub billing: Option<BillingCycle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthUser),
    /// Account created; the user must confirm their email before signing in.
    PendingConfirmation,
}

/// Hosted identity service (sign-in, session persistence, password reset).
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, IdentityError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Session restored from the backend's persisted token, if any.
    async fn get_session(&self) -> Result<Option<AuthUser>, IdentityError>;

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Subscribe to sign-in / sign-out / refresh notifications.
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileStoreError {
    #[error("profile store unreachable: {0}")]
    Transport(String),
}

/// Hosted table holding role, tenant linkage and onboarding status.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when no profile row exists for the user.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, ProfileStoreError>;
}
