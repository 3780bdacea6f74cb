//! `staybook-auth`: who a visitor is and where they are allowed to be.
//!
//! Pure types and predicates: roles and their families, portals, the
//! session snapshot, the tenant profile and the tenant-state classifier.
//! No IO and no async; the stores that own these values live in
//! `staybook-session`.

pub mod access;
pub mod portal;
pub mod profile;
pub mod roles;
pub mod session;
pub mod tenant_state;

pub use access::{AccessError, authorize_role};
pub use portal::Portal;
pub use profile::{AccountStatus, OnboardingStatus, Profile, ProfileRecord};
pub use roles::{Role, RoleFamily};
pub use session::{AuthEvent, AuthUser, Session};
pub use tenant_state::TenantState;
