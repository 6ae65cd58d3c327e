/// Error types for gallery-thumbs
///
/// Startup errors (config, catalog, image root) are fatal and surface to the
/// operator. Everything else is per-record: the synchronizer catches it at the
/// record boundary, tallies it and moves on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} is not a JSON array of records: {source}")]
    CatalogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write catalog {path}: {source}")]
    CatalogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no image root configured (pass --image-root or set image_root in the config file)")]
    NoImageRoot,

    #[error("image root not found: {0}")]
    ImageRootMissing(PathBuf),

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Decode or encode failure on a located asset
    #[error("failed to render {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("could not rename {from} -> {to}: {reason}")]
    RenameConflict {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
