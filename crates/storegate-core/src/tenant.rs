//! Store (tenant) types for multi-tenant routing

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Unique identifier for a store.
///
/// Stores live in an external document collection, so identifiers are
/// opaque strings. Freshly created stores get a random UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    /// Create a new random store ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a store ID, rejecting empty or whitespace-only values
    pub fn from_string(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidStore("Store ID cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StoreId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

/// Lifecycle status of a store.
///
/// Owned by store management; the router only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    #[default]
    Active,
    Pending,
    Suspended,
}

impl StoreStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StoreStatus::Active)
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreStatus::Active => "active",
            StoreStatus::Pending => "pending",
            StoreStatus::Suspended => "suspended",
        };
        f.write_str(s)
    }
}

/// A store bound to a subdomain label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,

    /// Subdomain label this store answers on (e.g. `acme`)
    pub domain: String,

    #[serde(default)]
    pub status: StoreStatus,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Store {
    pub fn new(id: StoreId, domain: impl Into<String>) -> Self {
        Self {
            id,
            domain: domain.into(),
            status: StoreStatus::Active,
            name: None,
        }
    }

    pub fn with_status(mut self, status: StoreStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
