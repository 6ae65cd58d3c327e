/// Run configuration
///
/// Values come from three layers, later ones winning:
/// - built-in defaults (the gallery's usual layout)
/// - an optional TOML file (`--config`, or the user config dir)
/// - command-line flags (applied in main.rs)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::thumbs::ThumbnailSize;

/// Default catalog location, relative to the site root
const DEFAULT_CATALOG: &str = "data/mindfolk-nfts.json";

/// JPEG quality used for every thumbnail unless overridden
pub const DEFAULT_QUALITY: u8 = 85;

/// Fill colour for letterbox padding and transparent pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    White,
    /// Dark-theme variant
    Black,
}

impl Background {
    pub fn rgb(self) -> image::Rgb<u8> {
        match self {
            Background::White => image::Rgb([255, 255, 255]),
            Background::Black => image::Rgb([0, 0, 0]),
        }
    }
}

/// Settings for the remote fetch variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Connect and read timeout for each download
    pub timeout_secs: u64,
    /// Edge length of the square thumbnail written by `fetch`
    pub size: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            size: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Catalog document to read
    pub catalog: PathBuf,
    /// Where to write the catalog (defaults to `catalog`, i.e. in place)
    pub output: Option<PathBuf>,
    /// Site root; thumbnails land under `<site_root>/img/thumbnails/<label>/`
    pub site_root: PathBuf,
    /// Directory holding the source artwork
    pub image_root: Option<PathBuf>,
    /// Known subfolders of the image root, searched after the root itself
    pub subdirs: Vec<String>,
    pub quality: u8,
    pub background: Background,
    /// Worker threads for the locate/render phase (1 = run inline)
    pub jobs: usize,
    /// Inline warnings printed per error class before going quiet
    pub warn_limit: usize,
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from(DEFAULT_CATALOG),
            output: None,
            site_root: PathBuf::from("."),
            image_root: None,
            subdirs: vec!["Elders".to_string(), "Mushrooms".to_string()],
            quality: DEFAULT_QUALITY,
            background: Background::default(),
            jobs: 1,
            warn_limit: 10,
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Load the config file, if any.
    ///
    /// An explicit path must exist. Without one, the user config dir
    /// (`~/.config/gallery-thumbs/config.toml` on Linux) is used when present,
    /// and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Self::default()),
            },
        };

        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let config = Self::from_toml(&text).map_err(|source| Error::Config {
            path: path.clone(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("gallery-thumbs");
        path.push("config.toml");
        Some(path)
    }

    /// Path the catalog is committed to at the end of a run
    pub fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.catalog)
    }

    /// On-disk directory for one thumbnail variant
    pub fn thumbnail_dir(&self, size: ThumbnailSize) -> PathBuf {
        self.site_root.join(size.dir_segment())
    }

    /// On-disk directory for the fetch variant's flat thumbnails
    pub fn fetch_dir(&self) -> PathBuf {
        self.site_root.join(crate::thumbs::thumbnail_root_segment())
    }
}
