use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Sibling temp path used while writing `target` (`name.ext` -> `name.ext.tmp`)
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write `bytes` to a temp file next to `target`, then rename it into place.
///
/// A crash mid-write leaves at most a stale `.tmp` file; `target` is either
/// the old content or the new content, never a truncated mix. The thumbnail
/// cache relies on this since existence is its only validity check.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_path_for(target);
    if temp.exists() {
        let _ = fs::remove_file(&temp);
    }
    fs::write(&temp, bytes).map_err(|e| Error::io(&temp, e))?;
    fs::rename(&temp, target).map_err(|e| {
        let _ = fs::remove_file(&temp);
        Error::io(target, e)
    })
}
