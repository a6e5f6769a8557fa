//! Storegate server
//!
//! Storefront HTTP service: tenant routing in front of store pages and the
//! checkout workflow, with health and metrics endpoints alongside.

pub mod app;
pub mod bootstrap;
pub mod checkout;
pub mod config;
pub mod pages;

pub use app::{AppState, ServerReadiness, build_app, storefront_router};
pub use bootstrap::{Backends, build_backends, seed_stores};
pub use config::{ConfigError, DirectorySource, ServerConfig};
