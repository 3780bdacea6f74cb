//! Route guards for direct URL access.
//!
//! Guards are synchronous checks over the current snapshots. They never
//! fetch: the [`SessionStore`](crate::SessionStore) and the
//! [`ProfileLoader`](crate::ProfileLoader) own all IO, and a guard is
//! re-run whenever either publishes.

use std::sync::Arc;

use serde::Serialize;

use staybook_auth::{AccessError, Portal, Role, Session, TenantState, authorize_role};

use crate::navigation;
use crate::profile_loader::ProfileState;
use crate::resolver::Terminal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum GuardOutcome {
    Loading,
    Redirect(String),
    /// The profile could not be read; show a hard error instead of guessing.
    ProfileUnavailable,
    Terminal(Terminal),
    Render,
}

impl GuardOutcome {
    pub fn is_render(&self) -> bool {
        matches!(self, GuardOutcome::Render)
    }

    /// Still waiting on a snapshot; the guard will be asked again.
    pub fn is_pending(&self) -> bool {
        matches!(self, GuardOutcome::Loading)
    }
}

/// Snapshots a guard decides on.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub session: &'a Session,
    pub profile: &'a ProfileState,
    /// Attempted path including its query string.
    pub location: &'a str,
}

impl<'a> GuardInput<'a> {
    pub fn new(session: &'a Session, profile: &'a ProfileState, location: &'a str) -> Self {
        Self {
            session,
            profile,
            location,
        }
    }

    /// Profile state, but only if it belongs to the signed-in user.
    fn current_profile(&self) -> Option<&'a ProfileState> {
        Some(self.profile).filter(|p| p.belongs_to(self.session.user_id()))
    }
}

pub trait RouteGuard: Send + Sync {
    fn check(&self, input: &GuardInput<'_>) -> GuardOutcome;
}

/// Requires a signed-in session; anonymous visitors go to the login of the
/// portal they were trying to reach.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthGuard;

impl RouteGuard for AuthGuard {
    fn check(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if input.session.loading {
            return GuardOutcome::Loading;
        }
        if !input.session.is_authenticated() {
            let portal = Portal::from_path(input.location);
            return GuardOutcome::Redirect(navigation::login_redirect(portal, input.location));
        }
        GuardOutcome::Render
    }
}

/// Requires a profile whose role is in the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    allowed: Vec<Role>,
    portal: Portal,
    require_tenant: bool,
}

impl RoleGuard {
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        let allowed = allowed.into();
        Self {
            portal: Portal::for_allow_list(&allowed),
            allowed,
            require_tenant: false,
        }
    }

    pub fn for_portal(portal: Portal) -> Self {
        Self::new(portal.allowed_roles())
    }

    /// Also render the no-tenant state for allowed profiles without a tenant.
    pub fn requiring_tenant(mut self) -> Self {
        self.require_tenant = true;
        self
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }
}

impl RouteGuard for RoleGuard {
    fn check(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if input.session.loading {
            return GuardOutcome::Loading;
        }
        if !input.session.is_authenticated() {
            return GuardOutcome::Redirect(self.portal.login_path().to_string());
        }

        let Some(state) = input.current_profile() else {
            return GuardOutcome::Loading;
        };
        if let Some(failure) = &state.failure {
            tracing::debug!(error = %failure, "role guard blocked by profile failure");
            return GuardOutcome::ProfileUnavailable;
        }
        // A timeout alone is not enough to let anyone through.
        let Some(profile) = state.profile.as_deref() else {
            return GuardOutcome::Loading;
        };

        match authorize_role(profile.role, &self.allowed) {
            Ok(_) => {}
            Err(AccessError::NoRole) => {
                return GuardOutcome::Redirect(self.portal.login_path().to_string());
            }
            Err(AccessError::RoleNotAllowed(role)) => {
                tracing::debug!(role = role.as_str(), location = input.location, "role not allowed here");
                return GuardOutcome::Redirect(Portal::home_of(role).login_path().to_string());
            }
        }

        if self.require_tenant && profile.tenant_state() == TenantState::NoTenant {
            return GuardOutcome::Terminal(Terminal::NoTenant);
        }
        GuardOutcome::Render
    }
}

/// Guards applied in order; the first non-render outcome wins.
#[derive(Clone, Default)]
pub struct GuardStack {
    guards: Vec<Arc<dyn RouteGuard>>,
}

impl core::fmt::Debug for GuardStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GuardStack").field("guards", &self.guards.len()).finish()
    }
}

impl GuardStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: impl RouteGuard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Auth check followed by the portal's role check.
    pub fn for_portal(portal: Portal) -> Self {
        Self::new().with(AuthGuard).with(RoleGuard::for_portal(portal))
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl RouteGuard for GuardStack {
    fn check(&self, input: &GuardInput<'_>) -> GuardOutcome {
        self.guards
            .iter()
            .map(|guard| guard.check(input))
            .find(|outcome| !outcome.is_render())
            .unwrap_or(GuardOutcome::Render)
    }
}
