//! Tenant routing middleware
//!
//! Runs the `TenantRouter` on every request and turns its decision into HTTP:
//! - `Passthrough`: request continues unchanged
//! - `RewrittenTo`: URI is replaced by the internal store path (the browser URL
//!   is unchanged) and the store is attached as a [`ResolvedStore`] extension
//! - `NotFound`: URI is replaced by the not-found page
//! - `Rejected`: 403 with a JSON message
//! - `ErrorRedirect`: 307 to the error page on the main domain
//!
//! The URI rewrite must happen before the application router matches, so the
//! middleware wraps the whole application (see [`with_tenant_routing`]).

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use std::time::Instant;
use storegate_observability::Metrics;
use storegate_routing::{RouteDecision, RouteRequest, TenantRouter};
use tracing::{debug, warn};

use crate::types::{IngressError, ResolvedStore, UnknownSubdomain};

/// Body returned for reserved subdomains
pub const RESERVED_SUBDOMAIN_MESSAGE: &str = "This subdomain is reserved";

/// State for [`tenant_routing_middleware`]
#[derive(Clone)]
pub struct TenantRoutingState {
    pub router: TenantRouter,
    pub metrics: Option<Arc<Metrics>>,
}

impl TenantRoutingState {
    pub fn new(router: TenantRouter) -> Self {
        Self {
            router,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

/// Wrap an application router so tenant routing runs before route matching
pub fn with_tenant_routing(app: Router, state: TenantRoutingState) -> Router {
    Router::new()
        .fallback_service(app)
        .layer(middleware::from_fn_with_state(state, tenant_routing_middleware))
}

/// Build the router's view of a request
///
/// The hostname comes from `Host`, the URI authority for HTTP/2, or the
/// first `X-Forwarded-Host` value when the proxy is trusted.
pub fn route_request_from(req: &Request, trust_forwarded_host: bool) -> RouteRequest {
    let headers = req.headers();

    let forwarded = trust_forwarded_host
        .then(|| headers.get("x-forwarded-host"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let hostname = forwarded
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .or_else(|| req.uri().authority().map(|a| a.to_string()));

    RouteRequest::new(
        hostname,
        req.uri().path(),
        req.uri().query().map(str::to_string),
    )
}

/// Middleware applying the tenant routing decision
pub async fn tenant_routing_middleware(
    State(state): State<TenantRoutingState>,
    mut req: Request,
    next: Next,
) -> Response {
    let route_request = route_request_from(&req, state.router.config().trust_forwarded_host);

    let start = Instant::now();
    let decision = state.router.route(&route_request).await;
    if let Some(metrics) = &state.metrics {
        metrics.record_route_decision(decision.label(), start.elapsed().as_secs_f64());
    }

    match decision {
        RouteDecision::Passthrough => next.run(req).await,
        RouteDecision::RewrittenTo { path, store } => {
            if let Err(e) = rewrite_uri(&mut req, &path) {
                return e.into_response();
            }
            req.extensions_mut().insert(ResolvedStore(store));
            next.run(req).await
        }
        RouteDecision::NotFound { subdomain } => {
            let not_found_path = state.router.config().not_found_path.clone();
            if let Err(e) = rewrite_uri(&mut req, &not_found_path) {
                return e.into_response();
            }
            req.extensions_mut().insert(UnknownSubdomain(subdomain));
            next.run(req).await
        }
        RouteDecision::Rejected { reason } => {
            debug!(reason = %reason, "Refusing request");
            (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "message": RESERVED_SUBDOMAIN_MESSAGE })),
            )
                .into_response()
        }
        RouteDecision::ErrorRedirect { target } => Redirect::temporary(&target).into_response(),
    }
}

/// Replace the request's path and query, keeping scheme and authority
fn rewrite_uri(req: &mut Request, path_and_query: &str) -> Result<(), IngressError> {
    let mut parts = req.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().map_err(|e| {
        warn!(rewrite = path_and_query, "Rewritten path is not a valid URI: {}", e);
        IngressError::Internal(format!("invalid rewrite target {}: {}", path_and_query, e))
    })?);

    *req.uri_mut() = Uri::from_parts(parts)
        .map_err(|e| IngressError::Internal(format!("invalid rewritten URI: {}", e)))?;
    Ok(())
}
