//! File-based store directory for single-node Storegate deployments
//!
//! This crate implements the `StoreDirectory` trait over a YAML or TOML
//! registry on disk. It suits local development and small deployments where
//! the list of stores changes rarely and is edited by hand.
//!
//! # Features
//! - YAML and TOML registry formats
//! - Reload that keeps the previous snapshot on a bad edit
//! - Real-time file watching with `notify`
//!
//! # Example
//! ```no_run
//! # use storegate_config_file::FileStoreDirectory;
//! # use storegate_core::StoreDirectory;
//! # async fn example() -> storegate_core::Result<()> {
//! let directory = FileStoreDirectory::load("~/.storegate/stores.yaml")?;
//! let store = directory.find_store_by_domain("acme").await?;
//! # Ok(())
//! # }
//! ```

mod file_store;

pub use file_store::{FileStoreDirectory, ReloadStream, StoreEntry, StoreRegistry};
