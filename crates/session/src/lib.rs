//! `staybook-session`: post-authentication session resolution.
//!
//! Decides, for a visitor, which portal they belong in while the identity
//! session and the tenant profile load independently:
//!
//! - [`SessionStore`]: single owner of the identity session snapshot
//! - [`ProfileLoader`]: one profile fetch per user, bounded by a timeout
//! - [`Resolver`]: pure destination state machine shared by every entry point
//! - [`guards`]: authentication / role gates for direct URL access
//! - [`LoginForm`]: portal-agnostic credential and password-reset controller
//!
//! The identity backend and the profile store are consumed through the
//! traits in [`backend`]; [`memory`] has in-process versions for tests and
//! local runs.

pub mod backend;
pub mod config;
pub mod guards;
pub mod login;
pub mod memory;
pub mod navigation;
pub mod profile_loader;
pub mod resolution;
pub mod resolver;
pub mod store;

pub use backend::{
    IdentityBackend, IdentityError, ProfileStore, ProfileStoreError, SignUpMetadata, SignUpOutcome,
};
pub use config::{ConfigError, SessionConfig};
pub use guards::{AuthGuard, GuardInput, GuardOutcome, GuardStack, RoleGuard, RouteGuard};
pub use login::{LoginError, LoginForm, LoginFormState, ResetRequestState};
pub use navigation::{BillingCycle, NavigationQuery};
pub use profile_loader::{ProfileFailure, ProfileLoader, ProfileState};
pub use resolution::{settle_guards, resolve_when_ready};
pub use resolver::{Destination, Resolution, ResolutionContext, Resolver, ResolverState, Terminal, WaitingOn};
pub use store::{Lifecycle, SessionStore};
