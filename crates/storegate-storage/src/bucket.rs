//! Local-disk file buckets
//!
//! Layout under the root directory:
//! ```text
//! {root}/{bucket_id}/{file_id}            object bytes
//! {root}/{bucket_id}/{file_id}.meta.json  name and content type
//! ```
//! The metadata sidecar is written last and removed first, so an object is
//! only ever visible with its metadata.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use storegate_core::{Error, FileStore, ResourceKind, Result, StoredFile};
use tracing::debug;

use crate::atomic_writer::AtomicWriter;

const META_SUFFIX: &str = ".meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct FileMeta {
    name: String,
    content_type: String,
}

/// `FileStore` writing each bucket to a directory
#[derive(Debug, Clone)]
pub struct LocalFileBucket {
    root: PathBuf,
}

impl LocalFileBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_paths(&self, bucket_id: &str, file_id: &str) -> Result<(PathBuf, PathBuf)> {
        validate_segment("bucket", bucket_id)?;
        validate_segment("file", file_id)?;
        let dir = self.root.join(bucket_id);
        Ok((
            dir.join(file_id),
            dir.join(format!("{}{}", file_id, META_SUFFIX)),
        ))
    }
}

/// IDs become path segments; anything that could escape the root is refused
fn validate_segment(what: &str, id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidRequest(format!("invalid {} id: {:?}", what, id)))
    }
}

fn not_found(bucket_id: &str, file_id: &str) -> Error {
    Error::ResourceNotFound {
        kind: ResourceKind::File,
        container_id: bucket_id.to_string(),
        resource_id: file_id.to_string(),
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}

#[async_trait]
impl FileStore for LocalFileBucket {
    async fn create_file(
        &self,
        bucket_id: &str,
        name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String> {
        let file_id = uuid::Uuid::new_v4().simple().to_string();
        let (data_path, meta_path) = self.object_paths(bucket_id, &file_id)?;
        let meta = serde_json::to_vec(&FileMeta {
            name: name.to_string(),
            content_type: content_type.to_string(),
        })?;

        blocking(move || {
            AtomicWriter::write_all(&data_path, &data)?;
            if let Err(e) = AtomicWriter::write_all(&meta_path, &meta) {
                let _ = std::fs::remove_file(&data_path);
                return Err(e);
            }
            Ok(())
        })
        .await?;

        debug!(bucket = bucket_id, file_id = %file_id, "Stored file");
        Ok(file_id)
    }

    async fn get_file(&self, bucket_id: &str, file_id: &str) -> Result<Option<StoredFile>> {
        let (data_path, meta_path) = self.object_paths(bucket_id, file_id)?;
        let id = file_id.to_string();

        blocking(move || {
            let meta = match std::fs::read(&meta_path) {
                Ok(raw) => serde_json::from_slice::<FileMeta>(&raw)?,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let data = std::fs::read(&data_path)?;
            Ok(Some(StoredFile {
                id,
                name: meta.name,
                content_type: meta.content_type,
                data: Bytes::from(data),
            }))
        })
        .await
    }

    async fn delete_file(&self, bucket_id: &str, file_id: &str) -> Result<()> {
        let (data_path, meta_path) = self.object_paths(bucket_id, file_id)?;
        let (bucket, id) = (bucket_id.to_string(), file_id.to_string());

        blocking(move || {
            match std::fs::remove_file(&meta_path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(&bucket, &id)),
                Err(e) => return Err(e.into()),
            }
            match std::fs::remove_file(&data_path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        })
        .await
    }
}
