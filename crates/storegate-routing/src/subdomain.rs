//! Hostname to subdomain parsing
//!
//! Splits a request hostname into the tenant label and the registrable root
//! domain. The root is always taken to be the last two labels; multi-part
//! public suffixes such as `.co.uk` are not recognised.

use serde::{Deserialize, Serialize};

/// Result of parsing a request hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainInfo {
    /// Tenant label, or `None` when the host addresses the main site
    pub subdomain: Option<String>,
    /// Host contains `localhost`
    pub is_localhost: bool,
    /// Last two labels for regular hosts, the full host for localhost
    pub main_domain: String,
}

/// Parse a hostname such as `acme.example.com` or `acme.localhost:3000`.
///
/// Total and side-effect free.
///
/// ```
/// use storegate_routing::subdomain::parse;
///
/// let info = parse("www.acme.example.com");
/// assert_eq!(info.subdomain.as_deref(), Some("acme"));
/// assert_eq!(info.main_domain, "example.com");
/// ```
pub fn parse(hostname: &str) -> SubdomainInfo {
    let is_localhost = hostname.contains("localhost");
    let parts: Vec<&str> = hostname.split('.').collect();

    if is_localhost {
        // The port stays attached to the last label
        let subdomain = (parts.len() > 1).then(|| parts[0].to_string());
        return SubdomainInfo {
            subdomain,
            is_localhost: true,
            main_domain: hostname.to_string(),
        };
    }

    let root_start = parts.len().saturating_sub(2);
    let main_domain = parts[root_start..].join(".");
    let remaining = &parts[..root_start];

    let mut subdomain = remaining.first().copied();
    if subdomain == Some("www") {
        subdomain = remaining.get(1).copied();
    }

    SubdomainInfo {
        subdomain: subdomain.map(str::to_string),
        is_localhost: false,
        main_domain,
    }
}
