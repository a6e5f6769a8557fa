//! Storegate Storage
//!
//! This crate provides the write side of multi-step workflows:
//! - Write ledger and compensating rollback
//! - Tracked writes helper for workflow code
//! - In-memory document/file stores
//! - Local-disk file buckets
//! - Store directory backed by the document store

pub mod atomic_writer;
pub mod bucket;
pub mod directory;
pub mod ledger;
pub mod memory;
pub mod rollback;
pub mod tracked;

pub use bucket::LocalFileBucket;
pub use directory::{DocumentStoreDirectory, STORES_COLLECTION};
pub use ledger::{LedgerEntry, WriteLedger};
pub use memory::{InMemoryDocumentStore, InMemoryFileStore};
pub use rollback::{CompensatingRollback, RollbackReport};
pub use tracked::TrackedWrites;
