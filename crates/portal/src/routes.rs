//! Guarded route table for the four portals.

use serde::Serialize;

use staybook_auth::{Portal, Session};
use staybook_session::navigation::PLANS_PATH;
use staybook_session::{AuthGuard, GuardInput, GuardOutcome, GuardStack, ProfileState, RoleGuard, RouteGuard};

/// One entry in the table.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    /// Also matches everything below `path`.
    pub nested: bool,
    pub guards: GuardStack,
}

impl Route {
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            nested: false,
            guards: GuardStack::new(),
        }
    }

    pub fn guarded(path: impl Into<String>, guards: GuardStack) -> Self {
        Self {
            path: path.into(),
            nested: false,
            guards,
        }
    }

    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    fn matches(&self, path: &str) -> bool {
        if path == self.path {
            return true;
        }
        self.nested
            && path
                .strip_prefix(self.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "visit", content = "outcome", rename_all = "snake_case")]
pub enum Visit {
    NotFound,
    Page(GuardOutcome),
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// The public site, the contracting flow and the three private portals.
    pub fn standard(contract_path: &str) -> Self {
        let mut table = Self::new()
            .with(Route::public(Portal::Commercial.home_path()))
            .with(Route::public(PLANS_PATH))
            .with(Route::public(Portal::Commercial.login_path()))
            .with(Route::public("/signup"))
            .with(Route::guarded(contract_path, GuardStack::new().with(AuthGuard)))
            .with(Route::guarded("/account", GuardStack::new().with(AuthGuard)));

        for portal in [Portal::Manager, Portal::Lodger, Portal::Superadmin] {
            let mut role = RoleGuard::for_portal(portal);
            // Manager workspace screens need a tenant to show anything.
            if portal == Portal::Manager {
                role = role.requiring_tenant();
            }
            table = table
                .with(Route::public(portal.login_path()))
                .with(Route::guarded(portal.prefix(), GuardStack::new().with(AuthGuard).with(role)).nested());
        }
        table
    }

    /// Most specific route for `location`; the query string is ignored.
    pub fn lookup(&self, location: &str) -> Option<&Route> {
        let path = location.split(['?', '#']).next().unwrap_or_default();
        self.routes
            .iter()
            .filter(|route| route.matches(path))
            .max_by_key(|route| route.path.len())
    }

    /// Check `location` against the current snapshots.
    pub fn check(&self, session: &Session, profile: &ProfileState, location: &str) -> Visit {
        match self.lookup(location) {
            None => Visit::NotFound,
            Some(route) => Visit::Page(route.guards.check(&GuardInput::new(session, profile, location))),
        }
    }
}
