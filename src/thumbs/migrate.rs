/// Legacy thumbnail migration
///
/// Early runs wrote thumbnails under the raw display name (`Mindfolk Founder #8.jpg`),
/// and the `#` breaks the URL. These helpers move such files to their
/// sanitized name. A rename never overwrites: if the sanitized file already
/// exists the legacy file is left alone and the conflict is reported.

use serde::Serialize;
use std::fs;
use std::path::Path;

use super::sanitize::sanitize;
use super::{thumbnail_file_name, ThumbnailSize};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::{Error, Result};

/// What happened to one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// No legacy file, or the name never needed sanitizing
    Nothing,
    Renamed,
}

/// Legacy file name for `display_name`, when it differs from the sanitized one.
///
/// Names containing path separators could never have been written as a single
/// file, so they have no legacy form.
pub fn legacy_file_name(display_name: &str) -> Option<String> {
    let sanitized = sanitize(display_name);
    if sanitized.is_empty() || display_name == sanitized || display_name.contains(['/', '\\']) {
        return None;
    }
    Some(thumbnail_file_name(display_name))
}

/// Rename `<dir>/<raw>.jpg` to `<dir>/<sanitized>.jpg` if needed.
///
/// Returns `RenameConflict` when the target is occupied or the rename fails;
/// callers log it and carry on.
pub fn migrate_variant(dir: &Path, display_name: &str) -> Result<Migration> {
    let Some(legacy) = legacy_file_name(display_name) else {
        return Ok(Migration::Nothing);
    };
    let from = dir.join(legacy);
    if !from.is_file() {
        return Ok(Migration::Nothing);
    }

    let to = dir.join(thumbnail_file_name(&sanitize(display_name)));
    if to.exists() {
        return Err(Error::RenameConflict {
            from,
            to,
            reason: "target already exists".to_string(),
        });
    }

    fs::rename(&from, &to).map_err(|e| Error::RenameConflict {
        from: from.clone(),
        to: to.clone(),
        reason: e.to_string(),
    })?;
    log::debug!("Renamed {} -> {}", from.display(), to.display());
    Ok(Migration::Renamed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub processed: usize,
    pub renamed: usize,
    pub conflicts: usize,
    /// Records whose URL fields now point at sanitized files
    pub updated: usize,
}

/// Rename every legacy thumbnail in the catalog and repoint the records.
///
/// A record is updated only when all three sanitized variants exist
/// afterwards, so `thumbnailURLs` never references a missing file.
pub fn migrate_catalog(catalog: &mut Catalog, config: &Config) -> MigrationReport {
    let mut report = MigrationReport::default();
    let dirs: Vec<_> = ThumbnailSize::ALL
        .iter()
        .map(|&size| config.thumbnail_dir(size))
        .collect();

    for record in catalog.records_mut() {
        let name = record.name().to_string();
        if legacy_file_name(&name).is_none() {
            continue;
        }
        report.processed += 1;

        for dir in &dirs {
            match migrate_variant(dir, &name) {
                Ok(Migration::Renamed) => report.renamed += 1,
                Ok(Migration::Nothing) => {}
                Err(e) => {
                    report.conflicts += 1;
                    log::warn!("{}", e);
                }
            }
        }

        let sanitized = sanitize(&name);
        let file = thumbnail_file_name(&sanitized);
        if dirs.iter().all(|dir| dir.join(&file).is_file()) {
            record.set_thumbnails(&sanitized);
            report.updated += 1;
        }
    }

    report
}
