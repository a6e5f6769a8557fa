//! Shared harness for the end-to-end tests
//!
//! Builds the full storefront service over in-memory stores and sends
//! requests through it with `tower::ServiceExt::oneshot`.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::Value;
use std::sync::Arc;
use storegate_core::{DocumentStore, Store, StoreDirectory};
use storegate_observability::Metrics;
use storegate_routing::TenantRoutingConfig;
use storegate_server::{AppState, build_app, seed_stores};
use storegate_storage::{DocumentStoreDirectory, InMemoryDocumentStore, InMemoryFileStore};
use tower::ServiceExt;

/// Response as seen by a client
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestApp {
    pub router: Router,
    pub documents: Arc<InMemoryDocumentStore>,
    pub files: Arc<InMemoryFileStore>,
    pub metrics: Arc<Metrics>,
}

impl TestApp {
    /// Service whose `stores` collection holds `stores`
    pub async fn with_stores(stores: &[Store], tenancy: TenantRoutingConfig) -> Self {
        let documents = Arc::new(InMemoryDocumentStore::new());
        seed_stores(documents.as_ref(), stores)
            .await
            .expect("seed stores");
        let directory = Arc::new(DocumentStoreDirectory::new(documents.clone()));
        Self::build(directory, documents.clone(), documents, tenancy)
    }

    /// Service over an arbitrary directory and document store
    pub fn build(
        directory: Arc<dyn StoreDirectory>,
        documents: Arc<dyn DocumentStore>,
        backing: Arc<InMemoryDocumentStore>,
        tenancy: TenantRoutingConfig,
    ) -> Self {
        let files = Arc::new(InMemoryFileStore::new());
        let metrics = Arc::new(Metrics::new().expect("metrics"));
        let state = AppState::new(directory, documents, files.clone(), metrics.clone());

        Self {
            router: build_app(state, tenancy, None),
            documents: backing,
            files,
            metrics,
        }
    }

    pub async fn get(&self, host: &str, uri: &str) -> TestResponse {
        self.send(Method::GET, host, uri, None).await
    }

    pub async fn post_json(&self, host: &str, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, host, uri, Some(body)).await
    }

    pub async fn send(
        &self,
        method: Method,
        host: &str,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, host);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
