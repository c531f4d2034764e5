//! Storage collaborator trait
//!
//! The sweep, merge, and distribute engines never touch the filesystem
//! directly; they go through [`Storage`], so a remote object store can be
//! substituted without changing the engines.

use std::path::{Path, PathBuf};

use crate::Result;

/// Backend the engines read and write through.
///
/// Paths are interpreted by the backend; for [`LocalStorage`] they are plain
/// filesystem paths. `list` is the "find" primitive: a remote backend may
/// answer it with a provider-specific listing query rather than a directory
/// walk.
pub trait Storage: Send + Sync {
    /// Read the full contents of one object.
    fn read_raw(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write one object, creating parents as needed.
    fn write_raw(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Every object named exactly `file_name` under `prefix`, recursively,
    /// in sorted order. An absent prefix yields an empty listing.
    fn list(&self, prefix: &Path, file_name: &str) -> Result<Vec<PathBuf>>;

    /// Remove one object if it exists.
    fn remove(&self, path: &Path) -> Result<()>;

    /// True if writes land somewhere a local staging file must be copied to.
    fn is_remote(&self) -> bool {
        false
    }
}

/// Local-filesystem backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
    fn read_raw(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn write_raw(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::write(path, bytes)?)
    }

    fn list(&self, prefix: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        if prefix.exists() {
            walk(prefix, file_name, &mut found)?;
        }
        found.sort();
        Ok(found)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn walk(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, file_name, found)?;
        } else if path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            found.push(path);
        }
    }
    Ok(())
}
