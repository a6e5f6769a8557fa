//! Store directory trait
//!
//! The `StoreDirectory` trait is the router's only view of store records.
//! Implementations range from a YAML registry on disk to a query against the
//! `stores` document collection.

use async_trait::async_trait;

use crate::{Result, tenant::Store};

/// Lookup of stores by the subdomain label they are bound to
///
/// Implementations:
/// - `FileStoreDirectory`: YAML/TOML registry with hot reload
/// - `DocumentStoreDirectory`: query over a document collection
///
/// # Example
/// ```no_run
/// # use storegate_core::StoreDirectory;
/// # async fn example(directory: &dyn StoreDirectory) -> storegate_core::Result<()> {
/// match directory.find_store_by_domain("acme").await? {
///     Some(store) => println!("serving {}", store.id),
///     None => println!("no such store"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    /// Find the store bound to `subdomain`
    ///
    /// # Returns
    /// `Ok(None)` when no store is bound to the label. Absence is never an error.
    ///
    /// # Errors
    /// - `Error::Directory` / `Error::Backend` for genuine backend failures only
    async fn find_store_by_domain(&self, subdomain: &str) -> Result<Option<Store>>;

    /// List every known store
    ///
    /// Used by readiness reporting and tooling; defaults to empty.
    async fn list_stores(&self) -> Result<Vec<Store>> {
        Ok(Vec::new())
    }
}
