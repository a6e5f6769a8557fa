//! Write ledger for multi-step workflows
//!
//! Records every document and file a workflow invocation has created, in
//! creation order, so a failed workflow can be unwound. A ledger belongs to
//! exactly one invocation and is dropped when that invocation ends.

use serde::{Deserialize, Serialize};
use storegate_core::ResourceKind;

/// One successfully created resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: ResourceKind,
    /// Collection ID for documents, bucket ID for files
    pub container_id: String,
    pub resource_id: String,
}

impl LedgerEntry {
    pub fn new(
        kind: ResourceKind,
        container_id: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            container_id: container_id.into(),
            resource_id: resource_id.into(),
        }
    }
}

/// Append-only record of created resources
#[derive(Debug, Default)]
pub struct WriteLedger {
    entries: Vec<LedgerEntry>,
}

impl WriteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resource; call only after its create call succeeded
    pub fn track(
        &mut self,
        kind: ResourceKind,
        container_id: impl Into<String>,
        resource_id: impl Into<String>,
    ) {
        self.entries
            .push(LedgerEntry::new(kind, container_id, resource_id));
    }

    pub fn track_document(
        &mut self,
        collection_id: impl Into<String>,
        document_id: impl Into<String>,
    ) {
        self.track(ResourceKind::Document, collection_id, document_id);
    }

    pub fn track_file(&mut self, bucket_id: impl Into<String>, file_id: impl Into<String>) {
        self.track(ResourceKind::File, bucket_id, file_id);
    }

    /// Entries in creation order
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the ledger, yielding entries newest first
    pub(crate) fn into_unwind_order(self) -> impl Iterator<Item = LedgerEntry> {
        self.entries.into_iter().rev()
    }
}
