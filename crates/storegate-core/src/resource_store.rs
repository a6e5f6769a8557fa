//! Document and file store traits
//!
//! Multi-step workflows (checkout, product creation) write through these
//! traits. The hosted backend offers no cross-collection transactions, so
//! every create returns the identifier the compensating rollback needs to
//! undo it later.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;

/// Kind of resource a workflow created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A document in a collection
    Document,
    /// A file in a storage bucket
    File,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Document => "document",
            ResourceKind::File => "file",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file held in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Collection-scoped document CRUD
///
/// # Errors
/// Implementations report a missing document as `Error::ResourceNotFound`
/// and transport/backend failures as `Error::Backend`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document and return its ID
    ///
    /// When `document_id` is `None` the store generates one.
    async fn create_document(
        &self,
        collection_id: &str,
        document_id: Option<&str>,
        data: serde_json::Value,
    ) -> Result<String>;

    /// Fetch a document, `Ok(None)` when absent
    async fn get_document(
        &self,
        collection_id: &str,
        document_id: &str,
    ) -> Result<Option<serde_json::Value>>;

    /// Return `(id, document)` pairs whose top-level `field` equals `value`
    async fn find_documents(
        &self,
        collection_id: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<(String, serde_json::Value)>>;

    /// Delete a document
    ///
    /// # Errors
    /// - `Error::ResourceNotFound` if the document is already gone
    async fn delete_document(&self, collection_id: &str, document_id: &str) -> Result<()>;
}

/// Bucket-scoped file storage
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store a file and return its ID
    async fn create_file(
        &self,
        bucket_id: &str,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String>;

    /// Fetch a file, `Ok(None)` when absent
    async fn get_file(&self, bucket_id: &str, file_id: &str) -> Result<Option<StoredFile>>;

    /// Delete a file
    ///
    /// # Errors
    /// - `Error::ResourceNotFound` if the file is already gone
    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<()>;
}
