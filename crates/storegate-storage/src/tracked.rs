//! Tracked writes for multi-step workflows
//!
//! Wraps the document and file stores so that each successful create is
//! recorded in the workflow's ledger before the next step runs, and nothing
//! is recorded for a create that failed.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use storegate_core::{DocumentStore, FileStore};
//! # use storegate_storage::TrackedWrites;
//! # async fn example(docs: Arc<dyn DocumentStore>, files: Arc<dyn FileStore>) -> storegate_core::Result<String> {
//! let mut writes = TrackedWrites::new(docs, files);
//! let result = async {
//!     let address = writes.create_document("addresses", serde_json::json!({"city": "Oslo"})).await?;
//!     writes.create_document("orders", serde_json::json!({"address_id": address})).await
//! }
//! .await;
//!
//! match result {
//!     Ok(order_id) => {
//!         writes.commit();
//!         Ok(order_id)
//!     }
//!     Err(e) => Err(writes.abort(e).await),
//! }
//! # }
//! ```

use bytes::Bytes;
use std::sync::Arc;
use storegate_core::{DocumentStore, FileStore, Result};

use crate::ledger::WriteLedger;
use crate::rollback::{CompensatingRollback, RollbackReport};

/// Document/file writes of one workflow invocation
pub struct TrackedWrites {
    documents: Arc<dyn DocumentStore>,
    files: Arc<dyn FileStore>,
    ledger: WriteLedger,
}

impl TrackedWrites {
    pub fn new(documents: Arc<dyn DocumentStore>, files: Arc<dyn FileStore>) -> Self {
        Self {
            documents,
            files,
            ledger: WriteLedger::new(),
        }
    }

    /// Create a document with a generated ID and track it
    pub async fn create_document(
        &mut self,
        collection_id: &str,
        data: serde_json::Value,
    ) -> Result<String> {
        let id = self
            .documents
            .create_document(collection_id, None, data)
            .await?;
        self.ledger.track_document(collection_id, id.clone());
        Ok(id)
    }

    /// Upload a file and track it
    pub async fn upload_file(
        &mut self,
        bucket_id: &str,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String> {
        let id = self
            .files
            .create_file(bucket_id, name, content_type, data)
            .await?;
        self.ledger.track_file(bucket_id, id.clone());
        Ok(id)
    }

    pub fn ledger(&self) -> &WriteLedger {
        &self.ledger
    }

    /// The workflow succeeded; forget the ledger
    pub fn commit(self) {}

    /// The workflow failed: unwind every tracked write, then hand back `error`
    ///
    /// Rollback problems are logged, never substituted for `error`.
    pub async fn abort<E>(self, error: E) -> E {
        self.abort_with_report(error).await.0
    }

    /// Like [`abort`](Self::abort), also returning what the rollback did
    pub async fn abort_with_report<E>(self, error: E) -> (E, RollbackReport) {
        let rollback = CompensatingRollback::new(self.documents, self.files);
        let report = rollback.rollback(self.ledger).await;
        (error, report)
    }
}
