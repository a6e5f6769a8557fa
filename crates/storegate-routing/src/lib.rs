//! Storegate Tenant Routing
//!
//! This crate provides the tenant resolution layer:
//! - Hostname parsing into tenant label and root domain
//! - Reserved-subdomain and preview-host handling
//! - Store lookup and internal path rewriting

pub mod config;
pub mod router;
pub mod subdomain;

// Re-export commonly used types
pub use config::TenantRoutingConfig;
pub use router::{RESERVED_SUBDOMAIN_REASON, RouteDecision, RouteRequest, TenantRouter};
pub use subdomain::{SubdomainInfo, parse as parse_subdomain};
