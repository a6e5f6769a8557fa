//! Temp-file-then-rename writes for bucket objects
//!
//! An object is visible under its final name only once all of its bytes are
//! on disk. A write that is abandoned (error or early drop) leaves nothing
//! behind, so a failed upload never needs compensating.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use storegate_core::Result;

pub struct AtomicWriter {
    staging_path: PathBuf,
    final_path: PathBuf,
    file: File,
}

impl AtomicWriter {
    /// Stage a write for `path`, creating the parent directory if needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Unique per writer so two uploads never share a staging file
        let mut staging = final_path.as_os_str().to_owned();
        staging.push(format!(".{}.partial", uuid::Uuid::new_v4().simple()));
        let staging_path = PathBuf::from(staging);

        let file = File::create(&staging_path)?;

        Ok(Self {
            staging_path,
            final_path,
            file,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    /// Flush to disk and move into place
    pub fn commit(self) -> Result<()> {
        self.file.sync_all()?;
        fs::rename(&self.staging_path, &self.final_path)?;
        Ok(())
    }

    /// Write `data` to `path` in one step
    pub fn write_all(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
        let mut writer = Self::create(path)?;
        writer.write(data)?;
        writer.commit()
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // After a successful commit the staging file no longer exists
        let _ = fs::remove_file(&self.staging_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_makes_object_visible() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bucket/object.bin");

        let mut writer = AtomicWriter::create(&path).unwrap();
        writer.write(b"part one, ").unwrap();
        writer.write(b"part two").unwrap();
        assert!(!path.exists());
        writer.commit().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"part one, part two");
    }

    #[test]
    fn test_abandoned_write_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("object.bin");

        {
            let mut writer = AtomicWriter::create(&path).unwrap();
            writer.write(b"never committed").unwrap();
        }

        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_all_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("object.bin");
        fs::write(&path, b"old").unwrap();

        AtomicWriter::write_all(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
