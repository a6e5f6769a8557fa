//! Core application state with dependency-injected stores
//!
//! `AppState` holds the store directory and the document/file stores as
//! trait objects, so the same handlers run against the on-disk registry and
//! in-memory stores in development and against other backends elsewhere.

use axum::{
    Router, middleware,
    routing::{any, get, post},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use storegate_core::{DocumentStore, FileStore, StoreDirectory};
use storegate_ingress::{
    TenantRoutingState, request_context_middleware, security_headers_middleware,
    with_tenant_routing,
};
use storegate_observability::{
    ComponentStatus, HealthState, Metrics, ReadinessChecker, health_router,
};
use storegate_routing::{TenantRouter, TenantRoutingConfig};
use tower_http::trace::TraceLayer;

use crate::{checkout, pages};

/// Application state with dependency-injected stores
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<dyn StoreDirectory>,
    pub documents: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileStore>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        directory: Arc<dyn StoreDirectory>,
        documents: Arc<dyn DocumentStore>,
        files: Arc<dyn FileStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            directory,
            documents,
            files,
            metrics,
        }
    }
}

/// Readiness of the serving process
///
/// Not ready until the listener is bound, and again once shutdown starts.
pub struct ServerReadiness {
    serving: AtomicBool,
    directory_source: String,
}

impl ServerReadiness {
    pub fn new(directory_source: impl Into<String>) -> Self {
        Self {
            serving: AtomicBool::new(false),
            directory_source: directory_source.into(),
        }
    }

    pub fn set_serving(&self, serving: bool) {
        self.serving.store(serving, Ordering::SeqCst);
    }
}

impl ReadinessChecker for ServerReadiness {
    fn is_ready(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    fn component_statuses(&self) -> Vec<ComponentStatus> {
        let status = if self.is_ready() { "ok" } else { "unavailable" };
        vec![ComponentStatus {
            name: "listener".to_string(),
            status: status.to_string(),
            detail: Some(format!("stores from {}", self.directory_source)),
        }]
    }
}

/// Storefront routes, before tenant routing is applied
pub fn storefront_router(state: AppState, tenancy: &TenantRoutingConfig) -> Router {
    let prefix = &tenancy.store_path_prefix;

    Router::new()
        .route("/", get(pages::landing))
        .route(&tenancy.not_found_path, any(pages::store_not_found))
        .route(&tenancy.error_path, get(pages::error_page))
        .route(&format!("{}/{{subdomain}}", prefix), get(pages::store_page))
        .route(&format!("{}/{{subdomain}}/", prefix), get(pages::store_page))
        .route(
            &format!("{}/{{subdomain}}/checkout", prefix),
            post(checkout::checkout).get(pages::store_page),
        )
        .route(&format!("{}/{{subdomain}}/{{*path}}", prefix), get(pages::store_page))
        .with_state(state)
}

/// The complete service: storefront and health endpoints behind tenant routing
///
/// Health endpoints answer only on passthrough hosts (the main domain, its `www.`
/// alias, preview hosts and bare IP addresses). On a store host the same
/// paths belong to the store.
pub fn build_app(
    state: AppState,
    tenancy: TenantRoutingConfig,
    readiness: Option<Arc<dyn ReadinessChecker>>,
) -> Router {
    let metrics = state.metrics.clone();
    let router = TenantRouter::new(state.directory.clone(), tenancy.clone());
    let routing_state = TenantRoutingState::new(router).with_metrics(metrics.clone());

    let health_state = match readiness {
        Some(checker) => HealthState::with_readiness_checker(metrics, checker),
        None => HealthState::new(metrics),
    };

    let site = storefront_router(state, &tenancy).merge(health_router(health_state));

    with_tenant_routing(site, routing_state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_context_middleware))
        .layer(TraceLayer::new_for_http())
}
