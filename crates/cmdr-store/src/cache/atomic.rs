//! Atomic blob writes
//!
//! Content goes to a uniquely named sibling temp file that is then renamed
//! over the target, so concurrent writers to one key never interleave and
//! readers see either the old or the new blob.

use crate::errors::{io_error, Result};
use std::fs;
use std::path::{Path, PathBuf};

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
    target.with_file_name(name)
}

pub fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_cache_dir", e))?;
    }

    let temp = temp_path_for(target);
    fs::write(&temp, content).map_err(|e| io_error("write_cache_temp", e))?;

    if let Err(e) = fs::rename(&temp, target) {
        fs::remove_file(&temp).ok();
        return Err(io_error("rename_cache_temp", e));
    }

    Ok(())
}
