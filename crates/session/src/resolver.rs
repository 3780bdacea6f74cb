//! Destination resolver: the pure state machine behind every entry point.
//!
//! ```text
//! AwaitingSession ──settled, anonymous──▶ SignedOut
//!        │
//!   settled, authenticated
//!        ▼
//! AwaitingProfile ──profile arrives──▶ Resolved
//!        │
//!     timed out
//!        ▼
//! ProfileUnavailable
//! ```
//!
//! The resolver never navigates. It returns a [`Resolution`] that the caller
//! (a login screen or a guard) turns into a navigation or a rendered state,
//! so the same function serves post-login screens, refreshes and guards.

use std::sync::Arc;

use serde::Serialize;

use staybook_auth::{AccessError, Portal, Profile, Role, RoleFamily, Session, TenantState, authorize_role};

use crate::navigation::{self, DEFAULT_CONTRACT_PATH, NavigationQuery, PLANS_PATH};
use crate::profile_loader::ProfileState;

/// Everything one resolution attempt looks at. Rebuilt on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    pub session: Session,
    pub profile: Option<Arc<Profile>>,
    pub profile_timed_out: bool,
    pub query: NavigationQuery,
    /// Roles the current portal accepts.
    pub allowed_roles: Vec<Role>,
}

impl ResolutionContext {
    /// Combine the two store snapshots.
    ///
    /// Profile state that belongs to a different user than the session (the
    /// loader has not caught up with a sign-in yet) is treated as not loaded.
    pub fn from_sources(
        session: Session,
        profile: &ProfileState,
        query: NavigationQuery,
        allowed_roles: Vec<Role>,
    ) -> Self {
        let current = session.user_id().is_some() && profile.user_id == session.user_id();
        Self {
            profile: if current { profile.profile.clone() } else { None },
            profile_timed_out: current && profile.timed_out,
            session,
            query,
            allowed_roles,
        }
    }

    pub fn for_portal(
        portal: Portal,
        session: Session,
        profile: &ProfileState,
        query: NavigationQuery,
    ) -> Self {
        Self::from_sources(session, profile, query, portal.allowed_roles().to_vec())
    }

    pub fn state(&self) -> ResolverState {
        if self.session.loading {
            ResolverState::AwaitingSession
        } else if !self.session.is_authenticated() {
            ResolverState::SignedOut
        } else if self.profile.is_some() {
            ResolverState::Resolved
        } else if self.profile_timed_out {
            ResolverState::ProfileUnavailable
        } else {
            ResolverState::AwaitingProfile
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverState {
    AwaitingSession,
    /// Session settled with nobody signed in; the login form is shown.
    SignedOut,
    AwaitingProfile,
    ProfileUnavailable,
    Resolved,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitingOn {
    Session,
    Profile,
}

/// UI states that are shown instead of navigating.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Terminal {
    /// Signed in on a portal that does not serve this role; link to `portal`.
    WrongPortal { portal: Portal },
    /// The profile carries no usable role. No portal can serve the account,
    /// so this renders in place with only a sign-out action.
    NoRole,
    NoTenant,
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "target", rename_all = "snake_case")]
pub enum Destination {
    NavigateTo(String),
    RenderTerminal(Terminal),
}

impl Destination {
    pub fn navigate(path: impl Into<String>) -> Self {
        Destination::NavigateTo(path.into())
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Destination::NavigateTo(path) => Some(path),
            Destination::RenderTerminal(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Resolution {
    SignedOut,
    /// No destination yet; keep showing a spinner.
    Waiting(WaitingOn),
    Ready(Destination),
}

impl Resolution {
    pub fn is_waiting(&self) -> bool {
        matches!(self, Resolution::Waiting(_))
    }

    /// What to show: waiting renders the loading terminal, signed out has
    /// nothing to show beyond the login form itself.
    pub fn destination(&self) -> Option<Destination> {
        match self {
            Resolution::SignedOut => None,
            Resolution::Waiting(_) => Some(Destination::RenderTerminal(Terminal::Loading)),
            Resolution::Ready(destination) => Some(destination.clone()),
        }
    }
}

/// Route configuration the rules need. Cheap to clone, no interior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    contract_path: String,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRACT_PATH)
    }
}

impl Resolver {
    pub fn new(contract_path: impl Into<String>) -> Self {
        Self {
            contract_path: contract_path.into(),
        }
    }

    /// Total and pure: the same context always yields the same resolution.
    pub fn resolve(&self, ctx: &ResolutionContext) -> Resolution {
        if ctx.session.loading {
            return Resolution::Waiting(WaitingOn::Session);
        }
        if !ctx.session.is_authenticated() {
            return Resolution::SignedOut;
        }

        let destination = match (ctx.profile.as_deref(), ctx.profile_timed_out) {
            (None, false) => return Resolution::Waiting(WaitingOn::Profile),
            // Degrade to the lowest-privilege destination instead of
            // spinning forever.
            (None, true) => self
                .navigation_intent(&ctx.query)
                .unwrap_or_else(|| Destination::navigate(PLANS_PATH)),
            (Some(profile), _) => self.for_profile(profile, ctx),
        };

        Resolution::Ready(destination)
    }

    /// Rules 1 and 2: explicit intent carried in the URL.
    fn navigation_intent(&self, query: &NavigationQuery) -> Option<Destination> {
        if let Some(return_url) = &query.return_url {
            return Some(Destination::NavigateTo(navigation::decode_return_url(return_url)));
        }
        query.plan.as_deref().map(|plan| {
            Destination::NavigateTo(navigation::contract_path(
                &self.contract_path,
                plan,
                query.billing.unwrap_or_default(),
            ))
        })
    }

    fn for_profile(&self, profile: &Profile, ctx: &ResolutionContext) -> Destination {
        if let Some(intent) = self.navigation_intent(&ctx.query) {
            return intent;
        }

        if profile.role == Some(Role::Superadmin) {
            return Destination::navigate(Portal::Superadmin.home_path());
        }

        let role = match authorize_role(profile.role, &ctx.allowed_roles) {
            Ok(role) => role,
            Err(AccessError::RoleNotAllowed(role)) => {
                return Destination::RenderTerminal(Terminal::WrongPortal {
                    portal: Portal::home_of(role),
                });
            }
            Err(AccessError::NoRole) => return Destination::RenderTerminal(Terminal::NoRole),
        };

        if profile.tenant_state() == TenantState::NoTenant {
            return Destination::navigate(PLANS_PATH);
        }

        match role.family() {
            RoleFamily::Manager => Destination::navigate(Portal::Manager.home_path()),
            RoleFamily::Lodger => Destination::navigate(Portal::Lodger.home_path()),
            RoleFamily::Superadmin => Destination::navigate(Portal::Superadmin.home_path()),
        }
    }
}

/// Resolve with the default routes.
pub fn resolve(ctx: &ResolutionContext) -> Resolution {
    Resolver::default().resolve(ctx)
}
