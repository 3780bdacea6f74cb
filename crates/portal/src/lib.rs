//! `staybook-portal`
//!
//! **Responsibility:** Process shell around `staybook-session`.
//!
//! This crate provides:
//! - Wiring of the session store, profile loader and auth listener ([`PortalApp`])
//! - Portal-branded login screens ([`LoginScreen`])
//! - The guarded route table for the four portals ([`RouteTable`])
//! - Seed fixtures for the in-memory backends used by the CLI
//!
//! It owns no resolution rules of its own; every decision comes from the
//! session crate.

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
pub mod screen;
pub mod seed;

pub use app::PortalApp;
pub use config::PortalConfig;
pub use error::PortalError;
pub use routes::{Route, RouteTable, Visit};
pub use screen::LoginScreen;
pub use seed::{SeedAccount, SeedFile, SeedProfile};
