//! cmdr store - execution records and result cache persistence
//!
//! Provides:
//! - SQLite connection management with embedded, checksummed migrations
//! - The execution record store (`CommandRepo`) and entity links
//! - A filesystem blob store for cached results

pub mod cache;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use cache::{CacheStore, FsCache};
pub use db::Database;
pub use errors::Result;
pub use repo::{CommandRepo, LinkRepo};
