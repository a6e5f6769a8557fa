//! In-memory document and file stores
//!
//! Used by the development server and by tests. Collections and buckets are
//! created on first write.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde_json::Value;
use storegate_core::{DocumentStore, Error, FileStore, ResourceKind, Result, StoredFile};

type Key = (String, String);

fn key(container_id: &str, resource_id: &str) -> Key {
    (container_id.to_string(), resource_id.to_string())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Document store backed by a `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<Key, Value>,
    failing_collections: DashSet<String>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every create in `collection_id` fail with a backend error
    ///
    /// Lets callers exercise their rollback paths against a real store.
    pub fn fail_creates_in(&self, collection_id: &str) {
        self.failing_collections.insert(collection_id.to_string());
    }

    pub fn document_count(&self, collection_id: &str) -> usize {
        self.documents
            .iter()
            .filter(|entry| entry.key().0 == collection_id)
            .count()
    }

    pub fn total_documents(&self) -> usize {
        self.documents.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: Option<&str>,
        data: Value,
    ) -> Result<String> {
        if self.failing_collections.contains(collection_id) {
            return Err(Error::Backend(format!(
                "collection {} is not accepting writes",
                collection_id
            )));
        }

        let id = document_id.map(str::to_string).unwrap_or_else(new_id);
        match self.documents.entry(key(collection_id, &id)) {
            Entry::Occupied(_) => Err(Error::InvalidRequest(format!(
                "document already exists: {}/{}",
                collection_id, id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(data);
                Ok(id)
            }
        }
    }

    async fn get_document(&self, collection_id: &str, document_id: &str) -> Result<Option<Value>> {
        Ok(self
            .documents
            .get(&key(collection_id, document_id))
            .map(|entry| entry.value().clone()))
    }

    async fn find_documents(
        &self,
        collection_id: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>> {
        let mut found: Vec<(String, Value)> = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == collection_id)
            .filter(|entry| entry.value().get(field) == Some(value))
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found)
    }

    async fn delete_document(&self, collection_id: &str, document_id: &str) -> Result<()> {
        match self.documents.remove(&key(collection_id, document_id)) {
            Some(_) => Ok(()),
            None => Err(Error::ResourceNotFound {
                kind: ResourceKind::Document,
                container_id: collection_id.to_string(),
                resource_id: document_id.to_string(),
            }),
        }
    }
}

/// File store backed by a `DashMap`
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    files: DashMap<Key, StoredFile>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self, bucket_id: &str) -> usize {
        self.files
            .iter()
            .filter(|entry| entry.key().0 == bucket_id)
            .count()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn create_file(
        &self,
        bucket_id: &str,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String> {
        let id = new_id();
        self.files.insert(
            key(bucket_id, &id),
            StoredFile {
                id: id.clone(),
                name: name.to_string(),
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(id)
    }

    async fn get_file(&self, bucket_id: &str, file_id: &str) -> Result<Option<StoredFile>> {
        Ok(self
            .files
            .get(&key(bucket_id, file_id))
            .map(|entry| entry.value().clone()))
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<()> {
        match self.files.remove(&key(bucket_id, file_id)) {
            Some(_) => Ok(()),
            None => Err(Error::ResourceNotFound {
                kind: ResourceKind::File,
                container_id: bucket_id.to_string(),
                resource_id: file_id.to_string(),
            }),
        }
    }
}
