//! File-based StoreDirectory implementation

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use storegate_core::{Error, Result, Store, StoreDirectory, StoreId, StoreStatus};

/// On-disk registry format
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreRegistry {
    #[serde(default)]
    pub stores: Vec<StoreEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntry {
    pub id: String,
    pub domain: String,
    #[serde(default)]
    pub status: StoreStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Stream of reload results; each item is the version now being served
pub type ReloadStream = BoxStream<'static, Result<u64>>;

/// Store directory loaded from a YAML or TOML file
///
/// Lookups read an in-memory snapshot. `reload` swaps the snapshot only when
/// the file parses cleanly, so a bad edit never empties the directory.
#[derive(Debug)]
pub struct FileStoreDirectory {
    path: PathBuf,
    stores: RwLock<HashMap<String, Store>>,
    version: AtomicU64,
}

impl FileStoreDirectory {
    /// Load a store registry
    ///
    /// # Errors
    /// - `Error::ConfigNotFound` if the file doesn't exist
    /// - `Error::Config` if the file isn't a valid registry
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_path(path.as_ref())?;

        if !path.exists() {
            return Err(Error::ConfigNotFound);
        }

        let stores = read_registry(&path)?;
        info!(path = ?path, stores = stores.len(), "Loaded store directory");

        Ok(Self {
            path,
            stores: RwLock::new(stores),
            version: AtomicU64::new(1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful loads so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.stores.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-read the file and swap in the new snapshot
    ///
    /// On error the previous snapshot stays in place.
    pub fn reload(&self) -> Result<u64> {
        let stores = read_registry(&self.path)?;
        let count = stores.len();

        let mut guard = self
            .stores
            .write()
            .map_err(|_| Error::Internal("store directory lock poisoned".to_string()))?;
        *guard = stores;
        drop(guard);

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        info!(stores = count, version, "Reloaded store directory");
        Ok(version)
    }

    /// Watch the registry file and reload on every change
    ///
    /// The watcher stops once the returned stream is dropped.
    pub fn watch(self: &Arc<Self>) -> Result<ReloadStream> {
        let (tx, rx) = mpsc::channel(16);
        let directory = Arc::clone(self);

        // Editors often replace the file instead of writing to it, so watch
        // the parent directory and filter on the file name.
        let watch_dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Err(e) = notify_tx.send(res) {
                    debug!("Store directory watch channel closed: {}", e);
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| Error::Internal(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Internal(format!("Failed to watch {:?}: {}", watch_dir, e)))?;

        info!("Watching store directory for changes: {:?}", directory.path);

        tokio::task::spawn_blocking(move || {
            // Owned here so it lives as long as the loop
            let _watcher = watcher;

            while let Ok(event_result) = notify_rx.recv() {
                let item = match event_result {
                    Ok(event) => {
                        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                            continue;
                        }
                        let ours = event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                        if !ours {
                            continue;
                        }
                        directory.reload().inspect_err(|e| {
                            error!("Store directory reload failed, keeping previous: {}", e);
                        })
                    }
                    Err(e) => {
                        warn!("File watch error: {}", e);
                        Err(Error::Internal(format!("File watch error: {}", e)))
                    }
                };

                if tx.blocking_send(item).is_err() {
                    debug!("Reload stream closed, stopping watcher");
                    break;
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl StoreDirectory for FileStoreDirectory {
    async fn find_store_by_domain(&self, subdomain: &str) -> Result<Option<Store>> {
        let stores = self
            .stores
            .read()
            .map_err(|_| Error::Directory("store directory lock poisoned".to_string()))?;
        Ok(stores.get(subdomain).cloned())
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let stores = self
            .stores
            .read()
            .map_err(|_| Error::Directory("store directory lock poisoned".to_string()))?;
        let mut all: Vec<Store> = stores.values().cloned().collect();
        all.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(all)
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw)
        .map_err(|e| Error::Config(format!("Could not expand path {}: {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Read and parse the registry, keyed by domain
fn read_registry(path: &Path) -> Result<HashMap<String, Store>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        error!("Failed to read store directory file: {}", e);
        Error::Io(e)
    })?;

    // Determine format based on file extension
    let registry: StoreRegistry = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
        toml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?
    } else if contents.trim().is_empty() {
        StoreRegistry::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| Error::Config(format!("Invalid YAML: {}", e)))?
    };

    let mut stores = HashMap::with_capacity(registry.stores.len());
    for entry in registry.stores {
        let domain = entry.domain.trim().to_string();
        if domain.is_empty() || domain.contains('.') {
            return Err(Error::Config(format!(
                "store {} has invalid domain {:?}",
                entry.id, entry.domain
            )));
        }

        let mut store = Store::new(StoreId::from_string(&entry.id)?, domain.clone())
            .with_status(entry.status);
        if let Some(name) = entry.name {
            store = store.with_name(name);
        }

        if stores.insert(domain.clone(), store).is_some() {
            return Err(Error::Config(format!(
                "domain {:?} is bound to more than one store",
                domain
            )));
        }
    }

    Ok(stores)
}
