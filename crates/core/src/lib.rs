//! `staybook-core`: identifiers and errors shared by every Staybook crate.
//!
//! Nothing here performs IO.

pub mod error;
pub mod id;

pub use error::CoreError;
pub use id::{TenantId, UserId};
