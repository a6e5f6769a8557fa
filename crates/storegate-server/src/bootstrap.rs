//! Backend wiring for the server
//!
//! Turns a validated `ServerConfig` into the store directory and the
//! document/file stores handed to `AppState`.

use serde_json::json;
use std::sync::Arc;
use storegate_config_file::FileStoreDirectory;
use storegate_core::{DocumentStore, Error, FileStore, Store, StoreDirectory};
use storegate_storage::{
    DocumentStoreDirectory, InMemoryDocumentStore, InMemoryFileStore, LocalFileBucket,
    STORES_COLLECTION,
};
use tracing::{info, warn};

use crate::config::{DirectorySource, ServerConfig};

/// Backends selected by configuration
pub struct Backends {
    pub directory: Arc<dyn StoreDirectory>,
    pub documents: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileStore>,
    /// Set when stores come from a registry file, so it can be watched
    pub registry: Option<Arc<FileStoreDirectory>>,
}

impl Backends {
    pub fn directory_source(&self) -> &'static str {
        if self.registry.is_some() {
            "file"
        } else {
            "documents"
        }
    }
}

pub async fn build_backends(config: &ServerConfig) -> anyhow::Result<Backends> {
    let documents: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());

    let files: Arc<dyn FileStore> = match config.bucket_dir_path() {
        Some(root) => {
            std::fs::create_dir_all(&root)?;
            info!("Storing uploaded files under {}", root.display());
            Arc::new(LocalFileBucket::new(root))
        }
        None => {
            info!("Storing uploaded files in memory");
            Arc::new(InMemoryFileStore::new())
        }
    };

    match config.directory.source {
        DirectorySource::File => {
            let path = config
                .stores_file_path()
                .ok_or_else(|| anyhow::anyhow!("directory.stores_file is not set"))?;
            let registry = Arc::new(FileStoreDirectory::load(&path).map_err(|e| match e {
                Error::ConfigNotFound => {
                    anyhow::anyhow!("store registry not found at {}", path.display())
                }
                other => other.into(),
            })?);
            info!(
                "Loaded {} store(s) from {}",
                registry.len(),
                registry.path().display()
            );

            Ok(Backends {
                directory: registry.clone(),
                documents,
                files,
                registry: Some(registry),
            })
        }
        DirectorySource::Documents => {
            if let Some(path) = config.stores_file_path() {
                match FileStoreDirectory::load(&path) {
                    Ok(registry) => {
                        let stores = registry.list_stores().await?;
                        let seeded = seed_stores(documents.as_ref(), &stores).await?;
                        info!("Seeded {} store document(s) from {}", seeded, path.display());
                    }
                    Err(Error::ConfigNotFound) => {
                        info!("No store registry at {}, starting empty", path.display());
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            Ok(Backends {
                directory: Arc::new(DocumentStoreDirectory::new(documents.clone())),
                documents,
                files,
                registry: None,
            })
        }
    }
}

/// Write store records into the `stores` collection, keyed by store ID
///
/// Records whose ID already exists are skipped.
pub async fn seed_stores(documents: &dyn DocumentStore, stores: &[Store]) -> anyhow::Result<usize> {
    let mut seeded = 0;
    for store in stores {
        let data = json!({
            "domain": store.domain,
            "status": store.status,
            "name": store.name,
        });
        match documents
            .create_document(STORES_COLLECTION, Some(store.id.as_str()), data)
            .await
        {
            Ok(_) => seeded += 1,
            Err(Error::InvalidRequest(msg)) => warn!("Skipping store {}: {}", store.id, msg),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(seeded)
}
