//! Tenant routing
//!
//! Decides, per request, whether a hostname addresses the main site or a
//! store, and where a store request should be rewritten to:
//! - Main domain (and `www.`) pass through untouched
//! - Reserved labels are rejected before any lookup
//! - Preview deployments bypass tenant resolution
//! - Known stores rewrite to `/store/{subdomain}{path}`
//! - Unknown stores render the not-found page
//! - Any failure redirects to the error page on the main domain

use std::net::IpAddr;
use std::sync::Arc;
use storegate_core::{Error, Result, Store, StoreDirectory};
use tracing::{debug, error, info};

use crate::config::TenantRoutingConfig;
use crate::subdomain::{self, SubdomainInfo};

/// Reason attached to reserved-subdomain rejections
pub const RESERVED_SUBDOMAIN_REASON: &str = "reserved subdomain";

/// The parts of an inbound request the router looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    hostname: Option<String>,
    path: String,
    query: Option<String>,
}

impl RouteRequest {
    /// Create a route request
    ///
    /// An empty path is normalised to `/`.
    pub fn new(hostname: Option<String>, path: impl Into<String>, query: Option<String>) -> Self {
        let path = path.into();
        let path = if path.is_empty() {
            "/".to_string()
        } else if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        Self {
            hostname: hostname.filter(|h| !h.trim().is_empty()),
            path,
            query,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}

/// Outcome of routing a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Serve the main site unmodified
    Passthrough,
    /// Refuse the request (HTTP 403)
    Rejected { reason: String },
    /// Serve tenant content from an internal path
    RewrittenTo { path: String, store: Store },
    /// No store is bound to the subdomain
    NotFound { subdomain: String },
    /// Routing failed; send the client to the error page
    ErrorRedirect { target: String },
}

impl RouteDecision {
    /// Short label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            RouteDecision::Passthrough => "passthrough",
            RouteDecision::Rejected { .. } => "rejected",
            RouteDecision::RewrittenTo { .. } => "rewritten",
            RouteDecision::NotFound { .. } => "not_found",
            RouteDecision::ErrorRedirect { .. } => "error_redirect",
        }
    }
}

/// Resolves subdomains to stores and decides how each request is served
///
/// Holds no mutable state; one directory lookup per request, never retried.
#[derive(Clone)]
pub struct TenantRouter {
    directory: Arc<dyn StoreDirectory>,
    config: TenantRoutingConfig,
}

impl TenantRouter {
    pub fn new(directory: Arc<dyn StoreDirectory>, config: TenantRoutingConfig) -> Self {
        Self { directory, config }
    }

    pub fn config(&self) -> &TenantRoutingConfig {
        &self.config
    }

    /// Route a request
    ///
    /// Never fails: errors become `RouteDecision::ErrorRedirect`.
    pub async fn route(&self, request: &RouteRequest) -> RouteDecision {
        match self.try_route(request).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(
                    hostname = request.hostname().unwrap_or("<none>"),
                    path = request.path(),
                    "Tenant routing failed: {}",
                    e
                );
                RouteDecision::ErrorRedirect {
                    target: self.error_target(request),
                }
            }
        }
    }

    async fn try_route(&self, request: &RouteRequest) -> Result<RouteDecision> {
        let hostname = request.hostname().ok_or(Error::MissingHostname)?;
        if is_ip_literal(hostname) {
            debug!(hostname, "IP address host, skipping tenant resolution");
            return Ok(RouteDecision::Passthrough);
        }
        let info = subdomain::parse(hostname);

        let Some(subdomain) = info.subdomain.as_deref() else {
            return Ok(RouteDecision::Passthrough);
        };

        if self.is_main_host(hostname, &info) {
            return Ok(RouteDecision::Passthrough);
        }

        if self.config.is_reserved(subdomain) {
            info!(
                security = true,
                hostname,
                subdomain,
                "Rejected request for reserved subdomain"
            );
            return Ok(RouteDecision::Rejected {
                reason: RESERVED_SUBDOMAIN_REASON.to_string(),
            });
        }

        if !info.is_localhost && self.config.is_preview_host(hostname) {
            debug!(hostname, "Preview deployment host, skipping tenant resolution");
            return Ok(RouteDecision::Passthrough);
        }

        match self.directory.find_store_by_domain(subdomain).await? {
            Some(store) if !self.config.hide_inactive_stores || store.status.is_active() => {
                let path = self.rewrite_path(subdomain, request);
                debug!(store_id = %store.id, subdomain, rewrite = %path, "Resolved store");
                Ok(RouteDecision::RewrittenTo { path, store })
            }
            Some(store) => {
                debug!(
                    store_id = %store.id,
                    status = %store.status,
                    "Store is not active, treating as not found"
                );
                Ok(RouteDecision::NotFound {
                    subdomain: subdomain.to_string(),
                })
            }
            None => {
                debug!(subdomain, "No store bound to subdomain");
                Ok(RouteDecision::NotFound {
                    subdomain: subdomain.to_string(),
                })
            }
        }
    }

    /// `hostname` is the main domain itself or its `www.` alias
    fn is_main_host(&self, hostname: &str, info: &SubdomainInfo) -> bool {
        let main_domain = self.main_domain(hostname, info);
        hostname.eq_ignore_ascii_case(&main_domain)
            || hostname.eq_ignore_ascii_case(&format!("www.{}", main_domain))
    }

    /// Configured main domain, else the one implied by the hostname
    ///
    /// For localhost hosts the parsed main domain is the full host, so the
    /// leading tenant label is dropped instead.
    fn main_domain(&self, hostname: &str, info: &SubdomainInfo) -> String {
        if let Some(main_domain) = &self.config.main_domain {
            return main_domain.clone();
        }

        if info.is_localhost {
            match (&info.subdomain, hostname.split_once('.')) {
                (Some(_), Some((_, rest))) => rest.to_string(),
                _ => hostname.to_string(),
            }
        } else {
            info.main_domain.clone()
        }
    }

    fn rewrite_path(&self, subdomain: &str, request: &RouteRequest) -> String {
        let mut path = format!(
            "{}/{}{}",
            self.config.store_path_prefix,
            subdomain,
            request.path()
        );
        if let Some(query) = request.query() {
            path.push('?');
            path.push_str(query);
        }
        path
    }

    /// Absolute URL of the error page on the main domain
    fn error_target(&self, request: &RouteRequest) -> String {
        let main_domain = match (&self.config.main_domain, request.hostname()) {
            (Some(main_domain), _) => Some(main_domain.clone()),
            (None, Some(hostname)) => {
                let info = subdomain::parse(hostname);
                Some(self.main_domain(hostname, &info))
            }
            (None, None) => None,
        };

        match main_domain {
            Some(main_domain) => {
                let scheme = if main_domain.contains("localhost") {
                    "http"
                } else {
                    "https"
                };
                format!("{}://{}{}", scheme, main_domain, self.config.error_path)
            }
            None => self.config.error_path.clone(),
        }
    }
}

/// `hostname` is an IPv4 or bracketed IPv6 address, with or without a port
fn is_ip_literal(hostname: &str) -> bool {
    let host = match hostname.strip_prefix('[') {
        Some(rest) => rest.split_once(']').map_or(rest, |(addr, _)| addr),
        None => hostname
            .rsplit_once(':')
            .map_or(hostname, |(addr, _)| addr),
    };
    host.parse::<IpAddr>().is_ok()
}
