/// Catalog persistence
///
/// The catalog is read once at startup and written once at the end of a run.
/// Saving serializes to `<path>.tmp` and renames it over the target, so an
/// interrupted run never leaves a half-written catalog behind.

use std::fs;
use std::path::Path;

use super::{Catalog, Record};
use crate::error::{Error, Result};
use crate::utils::write_atomic;

impl Catalog {
    /// Load the catalog document from disk.
    ///
    /// Missing or malformed catalogs are fatal: nothing has been processed
    /// yet, so there is nothing to lose by stopping.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json_str(&text, path)?;
        log::info!("Loaded {} records from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse a catalog from text; `path` is only used for error reporting
    pub fn from_json_str(text: &str, path: &Path) -> Result<Self> {
        let records: Vec<Record> =
            serde_json::from_str(text).map_err(|source| Error::CatalogParse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(records))
    }

    /// Pretty-printed JSON (2-space indent, non-ASCII kept verbatim)
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    /// Commit the catalog to `path` atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json_string().map_err(|e| Error::CatalogWrite {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::CatalogWrite {
                path: path.to_path_buf(),
                source,
            })?;
        }

        write_atomic(path, text.as_bytes()).map_err(|e| match e {
            Error::Io { source, .. } => Error::CatalogWrite {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        log::info!("Saved {} records to {}", self.len(), path.display());
        Ok(())
    }
}
