//! Result cache blob storage
//!
//! Provides:
//! - The `CacheStore` contract used by the engine's result cache
//! - A filesystem implementation with atomic writes, sharded by digest

mod atomic;
mod fs_cache;

pub use fs_cache::{cache_digest, FsCache};

use crate::errors::Result;

/// Namespaced key-value blob storage
///
/// Keys are arbitrary strings; implementations decide how to address them.
/// Writes must never expose a partially written blob to readers.
pub trait CacheStore: Send + Sync {
    /// Read a blob; `None` when the key has never been written
    fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a blob, replacing any previous value
    fn write(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove a blob; returns whether it existed
    fn remove(&self, namespace: &str, key: &str) -> Result<bool>;
}
