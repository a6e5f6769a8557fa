//! Compensating rollback
//!
//! Best-effort reversal of a failed workflow's writes. Entries are deleted
//! newest first, one at a time, so dependents (order items) go before what
//! they reference (the order). Delete failures are logged and skipped; a
//! partially rolled back workflow is an accepted outcome, not retried here.

use std::sync::Arc;
use storegate_core::{DocumentStore, FileStore, ResourceKind, Result};
use tracing::{debug, info, warn};

use crate::ledger::{LedgerEntry, WriteLedger};

/// What a rollback sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    /// Entries a delete was issued for
    pub attempted: usize,
    /// Entries deleted by this sweep
    pub deleted: usize,
    /// Entries that were already gone
    pub already_gone: usize,
    /// Entries left behind because their delete failed
    pub failed: Vec<LedgerEntry>,
}

impl RollbackReport {
    /// True when nothing was left behind
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes everything a `WriteLedger` recorded
#[derive(Clone)]
pub struct CompensatingRollback {
    documents: Arc<dyn DocumentStore>,
    files: Arc<dyn FileStore>,
}

impl CompensatingRollback {
    pub fn new(documents: Arc<dyn DocumentStore>, files: Arc<dyn FileStore>) -> Self {
        Self { documents, files }
    }

    /// Unwind a ledger
    ///
    /// Never fails and always attempts every entry. The ledger is consumed;
    /// the caller still owns (and should return) the error that triggered
    /// the rollback.
    pub async fn rollback(&self, ledger: WriteLedger) -> RollbackReport {
        let mut report = RollbackReport::default();

        if ledger.is_empty() {
            return report;
        }

        info!(entries = ledger.len(), "Rolling back workflow writes");

        for entry in ledger.into_unwind_order() {
            report.attempted += 1;

            match self.delete(&entry).await {
                Ok(()) => {
                    debug!(
                        kind = %entry.kind,
                        container = %entry.container_id,
                        id = %entry.resource_id,
                        "Rolled back"
                    );
                    report.deleted += 1;
                }
                Err(e) if e.is_not_found() => {
                    debug!(
                        kind = %entry.kind,
                        container = %entry.container_id,
                        id = %entry.resource_id,
                        "Already deleted, nothing to roll back"
                    );
                    report.already_gone += 1;
                }
                Err(e) => {
                    warn!(
                        kind = %entry.kind,
                        container = %entry.container_id,
                        id = %entry.resource_id,
                        "Rollback delete failed, leaving resource behind: {}",
                        e
                    );
                    report.failed.push(entry);
                }
            }
        }

        if !report.is_complete() {
            warn!(
                left_behind = report.failed.len(),
                attempted = report.attempted,
                "Rollback finished with orphaned resources"
            );
        }

        report
    }

    async fn delete(&self, entry: &LedgerEntry) -> Result<()> {
        match entry.kind {
            ResourceKind::Document => {
                self.documents
                    .delete_document(&entry.container_id, &entry.resource_id)
                    .await
            }
            ResourceKind::File => {
                self.files
                    .delete_file(&entry.container_id, &entry.resource_id)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use storegate_core::{Error, StoredFile};

    /// Records delete calls; fails for configured IDs
    #[derive(Default)]
    struct RecordingStore {
        deletes: Mutex<Vec<String>>,
        failing: HashSet<String>,
        missing: HashSet<String>,
    }

    impl RecordingStore {
        fn failing(ids: &[&str]) -> Self {
            Self {
                failing: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn missing(ids: &[&str]) -> Self {
            Self {
                missing: ids.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn deletes(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }

        fn record(&self, kind: ResourceKind, container: &str, id: &str) -> Result<()> {
            self.deletes.lock().unwrap().push(id.to_string());
            if self.failing.contains(id) {
                return Err(Error::Backend(format!("timeout deleting {}", id)));
            }
            if self.missing.contains(id) {
                return Err(Error::ResourceNotFound {
                    kind,
                    container_id: container.to_string(),
                    resource_id: id.to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn create_document(
            &self,
            _collection_id: &str,
            _document_id: Option<&str>,
            _data: serde_json::Value,
        ) -> Result<String> {
            unreachable!("rollback never creates")
        }

        async fn get_document(
            &self,
            _collection_id: &str,
            _document_id: &str,
        ) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }

        async fn find_documents(
            &self,
            _collection_id: &str,
            _field: &str,
            _value: &serde_json::Value,
        ) -> Result<Vec<(String, serde_json::Value)>> {
            Ok(Vec::new())
        }

        async fn delete_document(&self, collection_id: &str, document_id: &str) -> Result<()> {
            self.record(ResourceKind::Document, collection_id, document_id)
        }
    }

    #[async_trait]
    impl FileStore for RecordingStore {
        async fn create_file(
            &self,
            _bucket_id: &str,
            _name: &str,
            _content_type: &str,
            _data: Bytes,
        ) -> Result<String> {
            unreachable!("rollback never creates")
        }

        async fn get_file(&self, _bucket_id: &str, _file_id: &str) -> Result<Option<StoredFile>> {
            Ok(None)
        }

        async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<()> {
            self.record(ResourceKind::File, bucket_id, file_id)
        }
    }

    fn ledger_of(ids: &[&str]) -> WriteLedger {
        let mut ledger = WriteLedger::new();
        for id in ids {
            ledger.track_document("things", *id);
        }
        ledger
    }

    #[tokio::test]
    async fn test_deletes_in_reverse_order() {
        let store = Arc::new(RecordingStore::default());
        let rollback = CompensatingRollback::new(store.clone(), store.clone());

        let report = rollback.rollback(ledger_of(&["A", "B", "C"])).await;

        assert_eq!(store.deletes(), vec!["C", "B", "A"]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.deleted, 3);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_sweep() {
        let store = Arc::new(RecordingStore::failing(&["B"]));
        let rollback = CompensatingRollback::new(store.clone(), store.clone());

        let report = rollback.rollback(ledger_of(&["A", "B", "C"])).await;

        assert_eq!(store.deletes(), vec!["C", "B", "A"]);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].resource_id, "B");
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_already_deleted_is_tolerated() {
        let store = Arc::new(RecordingStore::missing(&["A"]));
        let rollback = CompensatingRollback::new(store.clone(), store.clone());

        let report = rollback.rollback(ledger_of(&["A", "B"])).await;

        assert_eq!(report.deleted, 1);
        assert_eq!(report.already_gone, 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_dispatches_by_kind() {
        let documents = Arc::new(RecordingStore::default());
        let files = Arc::new(RecordingStore::default());
        let rollback = CompensatingRollback::new(documents.clone(), files.clone());

        let mut ledger = WriteLedger::new();
        ledger.track_document("orders", "ord1");
        ledger.track_file("order-images", "img1");
        ledger.track_document("order_items", "item1");

        rollback.rollback(ledger).await;

        assert_eq!(documents.deletes(), vec!["item1", "ord1"]);
        assert_eq!(files.deletes(), vec!["img1"]);
    }

    #[tokio::test]
    async fn test_empty_ledger_is_noop() {
        let store = Arc::new(RecordingStore::default());
        let rollback = CompensatingRollback::new(store.clone(), store.clone());

        let report = rollback.rollback(WriteLedger::new()).await;
        assert_eq!(report, RollbackReport::default());
        assert!(store.deletes().is_empty());
    }
}
