//! Filesystem-backed cache store
//!
//! Blobs live at `<root>/<namespace>/<digest[..2]>/<digest>.json`, where the
//! digest is the SHA-256 of the cache key.

use super::atomic::atomic_write;
use super::CacheStore;
use crate::errors::{cache_error, io_error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// SHA-256 hex digest of a cache key
pub fn cache_digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a namespace; namespaces are relative `/`-separated paths
    pub fn namespace_dir(&self, namespace: &str) -> Result<PathBuf> {
        let relative = Path::new(namespace);
        let valid = !namespace.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(cache_error(
                "cache_namespace",
                format!("invalid cache namespace '{}'", namespace),
            ));
        }
        Ok(self.root.join(relative))
    }

    /// Path of the blob for a key
    pub fn blob_path(&self, namespace: &str, key: &str) -> Result<PathBuf> {
        let digest = cache_digest(key);
        let shard = &digest[..2];
        Ok(self
            .namespace_dir(namespace)?
            .join(shard)
            .join(format!("{}.json", digest)))
    }
}

impl CacheStore for FsCache {
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.blob_path(namespace, key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read_cache", e)),
        }
    }

    fn write(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.blob_path(namespace, key)?;
        atomic_write(&path, bytes)?;
        tracing::debug!(namespace, path = %path.display(), "wrote cache blob");
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<bool> {
        let path = self.blob_path(namespace, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove_cache", e)),
        }
    }
}
