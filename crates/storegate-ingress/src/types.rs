//! Shared ingress types and utilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storegate_core::Store;
use thiserror::Error;

/// Request ID for log correlation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Adopt an ID supplied by an upstream proxy
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store a request was rewritten to, available to handlers as an extension
#[derive(Debug, Clone)]
pub struct ResolvedStore(pub Store);

/// Subdomain that matched no store, available to the not-found handler
#[derive(Debug, Clone)]
pub struct UnknownSubdomain(pub String);

/// Ingress error types
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A multi-step workflow failed and was rolled back
    #[error("Workflow failed: {0}")]
    WorkflowFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<storegate_core::Error> for IngressError {
    fn from(err: storegate_core::Error) -> Self {
        use storegate_core::Error;

        match err {
            Error::InvalidRequest(msg) => IngressError::InvalidRequest(msg),
            Error::Serialization(e) => IngressError::Serialization(e),
            e if e.is_not_found() => IngressError::NotFound(e.to_string()),
            e => IngressError::Internal(e.to_string()),
        }
    }
}

impl axum::response::IntoResponse for IngressError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, kind, message) = match self {
            IngressError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error", msg)
            }
            IngressError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found_error", msg),
            IngressError::WorkflowFailed(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "workflow_error", msg)
            }
            IngressError::Serialization(err) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                format!("Serialization error: {}", err),
            ),
            // Details stay in the logs
            IngressError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": {
                "message": message,
                "type": kind,
                "code": status.as_u16(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;

/// Request metadata collected during ingress
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: RequestId,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::generate(),
            client_ip: None,
            user_agent: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    pub fn with_client_ip(mut self, ip: String) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn with_user_agent(mut self, ua: String) -> Self {
        self.user_agent = Some(ua);
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new()
    }
}
