//! Tenant routing configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use storegate_core::{Error, Result};

/// Settings recognised by the tenant router
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRoutingConfig {
    /// Registrable root domain the platform is served from (e.g. `example.com`)
    ///
    /// When unset, the root is derived from each request's hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_domain: Option<String>,

    /// Labels that never resolve to a store
    #[serde(default = "default_reserved_subdomains")]
    pub reserved_subdomains: BTreeSet<String>,

    /// Host suffix of ephemeral preview deployments; tenant resolution is skipped there
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_host_suffix: Option<String>,

    /// Prefix of tenant pages; `/store` yields `/store/{subdomain}{path}`
    #[serde(default = "default_store_path_prefix")]
    pub store_path_prefix: String,

    /// Internal path rendered when no store matches
    #[serde(default = "default_not_found_path")]
    pub not_found_path: String,

    /// Error page on the main domain that routing failures redirect to
    #[serde(default = "default_error_path")]
    pub error_path: String,

    /// Treat pending/suspended stores as absent
    #[serde(default)]
    pub hide_inactive_stores: bool,

    /// Prefer `X-Forwarded-Host` over `Host` (only behind a trusted proxy)
    #[serde(default)]
    pub trust_forwarded_host: bool,
}

impl Default for TenantRoutingConfig {
    fn default() -> Self {
        Self {
            main_domain: None,
            reserved_subdomains: default_reserved_subdomains(),
            preview_host_suffix: None,
            store_path_prefix: default_store_path_prefix(),
            not_found_path: default_not_found_path(),
            error_path: default_error_path(),
            hide_inactive_stores: false,
            trust_forwarded_host: false,
        }
    }
}

impl TenantRoutingConfig {
    pub fn with_main_domain(mut self, main_domain: impl Into<String>) -> Self {
        self.main_domain = Some(main_domain.into());
        self
    }

    pub fn with_preview_host_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.preview_host_suffix = Some(suffix.into());
        self
    }

    pub fn with_reserved_subdomains<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_subdomains = labels
            .into_iter()
            .map(|l| l.into().to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_hide_inactive_stores(mut self, hide: bool) -> Self {
        self.hide_inactive_stores = hide;
        self
    }

    /// Check whether a label is reserved (case-insensitive)
    pub fn is_reserved(&self, label: &str) -> bool {
        self.reserved_subdomains
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(label))
    }

    /// Check whether a host belongs to the preview deployment domain
    pub fn is_preview_host(&self, hostname: &str) -> bool {
        match self.preview_host_suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => hostname
                .to_ascii_lowercase()
                .ends_with(&suffix.to_ascii_lowercase()),
            _ => false,
        }
    }

    /// Validate paths and domains
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("store_path_prefix", &self.store_path_prefix),
            ("not_found_path", &self.not_found_path),
            ("error_path", &self.error_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!("'{}' must start with '/'", name)));
            }
        }

        if self.store_path_prefix.ends_with('/') {
            return Err(Error::Config(
                "'store_path_prefix' must not end with '/'".to_string(),
            ));
        }

        if let Some(main_domain) = &self.main_domain
            && (main_domain.is_empty() || main_domain.contains('/'))
        {
            return Err(Error::Config(format!(
                "'main_domain' is not a hostname: '{}'",
                main_domain
            )));
        }

        Ok(())
    }
}

fn default_reserved_subdomains() -> BTreeSet<String> {
    ["www", "admin", "api", "dashboard"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_store_path_prefix() -> String {
    "/store".to_string()
}

fn default_not_found_path() -> String {
    "/store-not-found".to_string()
}

fn default_error_path() -> String {
    "/error".to_string()
}
