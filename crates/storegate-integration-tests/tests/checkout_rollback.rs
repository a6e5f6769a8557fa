//! Checkout workflow tests
//!
//! A checkout creates several documents and files. When a later step fails,
//! everything written before it must be removed again and the client must
//! see the step's own error.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storegate_core::{DocumentStore, Error, Result, Store, StoreId};
use storegate_integration_tests::TestApp;
use storegate_routing::TenantRoutingConfig;
use storegate_server::checkout::{
    ADDRESSES_COLLECTION, ATTACHMENTS_BUCKET, ORDER_ITEMS_COLLECTION, ORDERS_COLLECTION,
};
use storegate_storage::{DocumentStoreDirectory, InMemoryDocumentStore, STORES_COLLECTION};

const HOST: &str = "acme.localhost:3000";

fn acme() -> Store {
    Store::new(StoreId::from_string("store-1").unwrap(), "acme")
}

fn order(quantities: &[u32]) -> Value {
    let lines: Vec<Value> = quantities
        .iter()
        .enumerate()
        .map(|(i, quantity)| {
            json!({
                "product_id": format!("p{}", i + 1),
                "quantity": quantity,
                "unit_price_cents": 1000,
            })
        })
        .collect();

    json!({
        "address": {"line1": "1 Main St", "city": "Springfield", "zip": "12345"},
        "lines": lines,
        "attachments": [{"name": "gift-note.txt", "content": "Enjoy!"}],
    })
}

/// Documents outside the `stores` collection
fn workflow_documents(documents: &InMemoryDocumentStore) -> usize {
    [ADDRESSES_COLLECTION, ORDERS_COLLECTION, ORDER_ITEMS_COLLECTION]
        .iter()
        .map(|collection| documents.document_count(collection))
        .sum()
}

#[tokio::test]
async fn test_checkout_persists_every_step() {
    let app = TestApp::with_stores(&[acme()], TenantRoutingConfig::default()).await;

    let response = app.post_json(HOST, "/checkout", order(&[2, 1])).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["item_ids"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["attachment_ids"].as_array().unwrap().len(), 1);

    assert_eq!(app.documents.document_count(ADDRESSES_COLLECTION), 1);
    assert_eq!(app.documents.document_count(ORDERS_COLLECTION), 1);
    assert_eq!(app.documents.document_count(ORDER_ITEMS_COLLECTION), 2);
    assert_eq!(app.files.file_count(ATTACHMENTS_BUCKET), 1);

    let order_id = response.body["order_id"].as_str().unwrap();
    let stored = app
        .documents
        .get_document(ORDERS_COLLECTION, order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["store_id"], "store-1");
    assert_eq!(stored["total_cents"], 3000);

    let text = app.metrics.encode().unwrap();
    assert!(!text.contains("storegate_rollbacks_total{"));
}

#[tokio::test]
async fn test_failing_line_rolls_back_earlier_writes() {
    let app = TestApp::with_stores(&[acme()], TenantRoutingConfig::default()).await;

    // address, order, item 1, item 2 succeed; item 3 fails
    let response = app.post_json(HOST, "/checkout", order(&[1, 1, 0])).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.body["error"]["message"],
        "line 3: quantity must be at least 1"
    );

    assert_eq!(workflow_documents(&app.documents), 0);
    assert_eq!(app.files.file_count(ATTACHMENTS_BUCKET), 0);
    // The store record itself is untouched
    assert_eq!(app.documents.document_count(STORES_COLLECTION), 1);

    assert_eq!(
        app.metrics
            .rollbacks_total
            .with_label_values(&["checkout"])
            .get(),
        1.0
    );
    assert_eq!(
        app.metrics
            .rollback_deletes_total
            .with_label_values(&["deleted"])
            .get(),
        4.0
    );
}

/// Document store that records writes and deletes, optionally slowing deletes
struct RecordingStore {
    inner: Arc<InMemoryDocumentStore>,
    delete_delay: Option<Duration>,
    created: Mutex<Vec<(String, String)>>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    fn new(inner: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            inner,
            delete_delay: None,
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    /// Workflow creates, ignoring store seeding
    fn created(&self) -> Vec<(String, String)> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .filter(|(collection, _)| collection != STORES_COLLECTION)
            .cloned()
            .collect()
    }

    fn deleted(&self) -> Vec<(String, String)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: Option<&str>,
        data: Value,
    ) -> Result<String> {
        let id = self
            .inner
            .create_document(collection_id, document_id, data)
            .await?;
        self.created
            .lock()
            .unwrap()
            .push((collection_id.to_string(), id.clone()));
        Ok(id)
    }

    async fn get_document(&self, collection_id: &str, document_id: &str) -> Result<Option<Value>> {
        self.inner.get_document(collection_id, document_id).await
    }

    async fn find_documents(
        &self,
        collection_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>> {
        self.inner.find_documents(collection_id, field, value).await
    }

    async fn delete_document(&self, collection_id: &str, document_id: &str) -> Result<()> {
        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.delete_document(collection_id, document_id).await?;
        self.deleted
            .lock()
            .unwrap()
            .push((collection_id.to_string(), document_id.to_string()));
        Ok(())
    }
}

async fn recording_app(documents: Arc<RecordingStore>) -> TestApp {
    let backing = documents.inner.clone();
    storegate_server::seed_stores(backing.as_ref(), &[acme()])
        .await
        .unwrap();
    TestApp::build(
        Arc::new(DocumentStoreDirectory::new(backing.clone())),
        documents,
        backing,
        TenantRoutingConfig::default(),
    )
}

#[tokio::test]
async fn test_rollback_deletes_newest_first() {
    let documents = Arc::new(RecordingStore::new(Arc::new(InMemoryDocumentStore::new())));
    let app = recording_app(documents.clone()).await;

    let response = app.post_json(HOST, "/checkout", order(&[1, 1, 0])).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let created = documents.created();
    let collections: Vec<&str> = created.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(
        collections,
        [
            ADDRESSES_COLLECTION,
            ORDERS_COLLECTION,
            ORDER_ITEMS_COLLECTION,
            ORDER_ITEMS_COLLECTION
        ]
    );

    // item 2, item 1, order, address
    let mut expected = created;
    expected.reverse();
    assert_eq!(documents.deleted(), expected);
}

#[tokio::test]
async fn test_dropped_request_still_rolls_back() {
    let documents = Arc::new(
        RecordingStore::new(Arc::new(InMemoryDocumentStore::new()))
            .with_delete_delay(Duration::from_millis(100)),
    );
    let app = recording_app(documents.clone()).await;

    // The client gives up while the rollback is still deleting
    let finished = tokio::time::timeout(
        Duration::from_millis(150),
        app.post_json(HOST, "/checkout", order(&[1, 0])),
    )
    .await;
    assert!(finished.is_err());

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(workflow_documents(&app.documents), 0);
    assert_eq!(documents.deleted().len(), 3);
    assert_eq!(
        app.metrics
            .rollback_deletes_total
            .with_label_values(&["deleted"])
            .get(),
        3.0
    );
}

#[tokio::test]
async fn test_backend_failure_mid_workflow_rolls_back() {
    let app = TestApp::with_stores(&[acme()], TenantRoutingConfig::default()).await;
    app.documents.fail_creates_in(ORDER_ITEMS_COLLECTION);

    let response = app.post_json(HOST, "/checkout", order(&[1])).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(workflow_documents(&app.documents), 0);
    assert_eq!(
        app.metrics
            .rollback_deletes_total
            .with_label_values(&["deleted"])
            .get(),
        2.0
    );
}

#[tokio::test]
async fn test_validation_failure_before_any_write_skips_rollback() {
    let app = TestApp::with_stores(&[acme()], TenantRoutingConfig::default()).await;

    let response = app
        .post_json(HOST, "/checkout", json!({"address": "nowhere", "lines": []}))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["message"], "address must be an object");
    assert_eq!(
        app.metrics
            .rollbacks_total
            .with_label_values(&["checkout"])
            .get(),
        0.0
    );
}

/// Document store whose deletes fail for one collection
struct StuckDeletes {
    inner: Arc<InMemoryDocumentStore>,
    stuck_collection: &'static str,
}

#[async_trait]
impl DocumentStore for StuckDeletes {
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: Option<&str>,
        data: Value,
    ) -> Result<String> {
        self.inner
            .create_document(collection_id, document_id, data)
            .await
    }

    async fn get_document(&self, collection_id: &str, document_id: &str) -> Result<Option<Value>> {
        self.inner.get_document(collection_id, document_id).await
    }

    async fn find_documents(
        &self,
        collection_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>> {
        self.inner.find_documents(collection_id, field, value).await
    }

    async fn delete_document(&self, collection_id: &str, document_id: &str) -> Result<()> {
        if collection_id == self.stuck_collection {
            return Err(Error::Backend("delete timed out".to_string()));
        }
        self.inner.delete_document(collection_id, document_id).await
    }
}

#[tokio::test]
async fn test_rollback_continues_past_failed_delete() {
    let backing = Arc::new(InMemoryDocumentStore::new());
    storegate_server::seed_stores(backing.as_ref(), &[acme()])
        .await
        .unwrap();
    let documents = Arc::new(StuckDeletes {
        inner: backing.clone(),
        stuck_collection: ORDERS_COLLECTION,
    });
    let app = TestApp::build(
        Arc::new(DocumentStoreDirectory::new(backing.clone())),
        documents,
        backing,
        TenantRoutingConfig::default(),
    );

    let response = app.post_json(HOST, "/checkout", order(&[1, 0])).await;

    // Original error, not the rollback's
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.body["error"]["message"],
        "line 2: quantity must be at least 1"
    );

    // Order is left behind; the item and the address are gone
    assert_eq!(app.documents.document_count(ORDERS_COLLECTION), 1);
    assert_eq!(app.documents.document_count(ORDER_ITEMS_COLLECTION), 0);
    assert_eq!(app.documents.document_count(ADDRESSES_COLLECTION), 0);

    let deletes = &app.metrics.rollback_deletes_total;
    assert_eq!(deletes.with_label_values(&["deleted"]).get(), 2.0);
    assert_eq!(deletes.with_label_values(&["failed"]).get(), 1.0);
}

#[tokio::test]
async fn test_checkout_for_unknown_store() {
    let app = TestApp::with_stores(&[acme()], TenantRoutingConfig::default()).await;

    let response = app
        .post_json("nobody.localhost:3000", "/checkout", order(&[1]))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["subdomain"], "nobody");
    assert_eq!(workflow_documents(&app.documents), 0);
}
