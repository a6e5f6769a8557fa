//! Storegate Core Types and Traits
//!
//! This crate provides the fundamental types and traits shared by the
//! tenant router and the compensating write tracker:
//! - Store records and the `StoreDirectory` lookup trait
//! - Document and file store abstractions used by multi-step workflows
//! - Core error types

pub mod error;
pub mod resource_store;
pub mod store_directory;
pub mod tenant;

pub use error::{Error, Result};
pub use resource_store::{DocumentStore, FileStore, ResourceKind, StoredFile};
pub use store_directory::StoreDirectory;
pub use tenant::{Store, StoreId, StoreStatus};
