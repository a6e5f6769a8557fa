//! Error types for Storegate Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request has no hostname")]
    MissingHostname,

    #[error("Internal error: {0}")]
    Internal(String),

    // Tenant errors
    #[error("Invalid store: {0}")]
    InvalidStore(String),

    #[error("Store directory error: {0}")]
    Directory(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration not found")]
    ConfigNotFound,

    // Document/file store errors
    #[error("{kind} not found: {container_id}/{resource_id}")]
    ResourceNotFound {
        kind: crate::ResourceKind,
        container_id: String,
        resource_id: String,
    },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error reports a resource that does not (or no longer) exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ResourceNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceKind;

    #[test]
    fn test_resource_not_found_display() {
        let err = Error::ResourceNotFound {
            kind: ResourceKind::Document,
            container_id: "orders".to_string(),
            resource_id: "ord1".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "document not found: orders/ord1");
    }

    #[test]
    fn test_backend_error_is_not_not_found() {
        let err = Error::Backend("connection reset".to_string());
        assert!(!err.is_not_found());
    }
}
