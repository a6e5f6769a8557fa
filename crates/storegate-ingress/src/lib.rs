//! Storegate Ingress
//!
//! This crate provides the HTTP edge of the storefront:
//! - Tenant routing middleware (rewrite, reject, not-found, error redirect)
//! - Request context and security header middleware
//! - Ingress error type rendered as JSON

pub mod middleware;
pub mod tenant;
pub mod types;

pub use middleware::{REQUEST_ID_HEADER, request_context_middleware, security_headers_middleware};
pub use tenant::{
    RESERVED_SUBDOMAIN_MESSAGE, TenantRoutingState, route_request_from, tenant_routing_middleware,
    with_tenant_routing,
};
pub use types::{
    IngressError, IngressResult, RequestId, RequestMetadata, ResolvedStore, UnknownSubdomain,
};
