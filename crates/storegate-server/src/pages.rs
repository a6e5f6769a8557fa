//! Storefront pages
//!
//! Tenant pages live under the internal `/store/{subdomain}` tree that tenant
//! routing rewrites to; the browser never sees those paths.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::collections::HashMap;
use storegate_core::Store;
use storegate_ingress::{IngressError, IngressResult, ResolvedStore, UnknownSubdomain};

use crate::app::AppState;

pub async fn landing() -> impl IntoResponse {
    Json(json!({
        "service": "storegate",
        "message": "Welcome to the marketplace",
    }))
}

pub async fn store_not_found(unknown: Option<Extension<UnknownSubdomain>>) -> impl IntoResponse {
    let subdomain = unknown.map(|Extension(UnknownSubdomain(s))| s);
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "store_not_found",
            "message": "No store is registered at this address",
            "subdomain": subdomain,
        })),
    )
}

pub async fn error_page() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "Something went wrong while loading this store. Please try again.",
        })),
    )
}

pub async fn store_page(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    resolved: Option<Extension<ResolvedStore>>,
) -> IngressResult<impl IntoResponse> {
    let subdomain = params
        .get("subdomain")
        .ok_or_else(|| IngressError::InvalidRequest("missing subdomain".to_string()))?;
    let store = resolve_store(&state, subdomain, resolved).await?;

    let path = match params.get("path") {
        Some(rest) => format!("/{}", rest),
        None => "/".to_string(),
    };

    Ok(Json(json!({
        "store": store,
        "path": path,
    })))
}

/// The store a tenant page belongs to
///
/// Normally attached by tenant routing; internal paths requested directly are
/// looked up again.
pub async fn resolve_store(
    state: &AppState,
    subdomain: &str,
    resolved: Option<Extension<ResolvedStore>>,
) -> IngressResult<Store> {
    if let Some(Extension(ResolvedStore(store))) = resolved
        && store.domain == subdomain
    {
        return Ok(store);
    }

    state
        .directory
        .find_store_by_domain(subdomain)
        .await?
        .ok_or_else(|| IngressError::NotFound(format!("store '{}'", subdomain)))
}
