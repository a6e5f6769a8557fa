//! Store directory over the document store
//!
//! Store records are ordinary documents in the `stores` collection, keyed by
//! document ID and carrying the subdomain in their `domain` field.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use storegate_core::{DocumentStore, Error, Result, Store, StoreDirectory, StoreId, StoreStatus};
use tracing::warn;

/// Default collection holding store records
pub const STORES_COLLECTION: &str = "stores";

#[derive(Debug, Deserialize)]
struct StoreDocument {
    domain: String,
    #[serde(default)]
    status: StoreStatus,
    #[serde(default)]
    name: Option<String>,
}

/// `StoreDirectory` answering lookups with a field query
pub struct DocumentStoreDirectory {
    documents: Arc<dyn DocumentStore>,
    collection_id: String,
}

impl DocumentStoreDirectory {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(documents, STORES_COLLECTION)
    }

    pub fn with_collection(documents: Arc<dyn DocumentStore>, collection_id: impl Into<String>) -> Self {
        Self {
            documents,
            collection_id: collection_id.into(),
        }
    }

    fn to_store(document_id: &str, data: serde_json::Value) -> Result<Store> {
        let doc: StoreDocument = serde_json::from_value(data).map_err(|e| {
            Error::Directory(format!("malformed store document {}: {}", document_id, e))
        })?;
        let store = Store::new(StoreId::from_string(document_id)?, doc.domain).with_status(doc.status);
        Ok(match doc.name {
            Some(name) => store.with_name(name),
            None => store,
        })
    }
}

#[async_trait]
impl StoreDirectory for DocumentStoreDirectory {
    async fn find_store_by_domain(&self, subdomain: &str) -> Result<Option<Store>> {
        let mut matches = self
            .documents
            .find_documents(&self.collection_id, "domain", &serde_json::json!(subdomain))
            .await?;

        if matches.len() > 1 {
            warn!(
                subdomain = subdomain,
                count = matches.len(),
                "Several stores claim the same subdomain, using the first"
            );
        }

        if matches.is_empty() {
            return Ok(None);
        }
        let (id, data) = matches.swap_remove(0);
        Self::to_store(&id, data).map(Some)
    }
}
