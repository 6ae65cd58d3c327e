/// Thumbnail pipeline module
///
/// This module handles:
/// - Sanitizing display names into safe filenames (sanitize.rs)
/// - Finding the source artwork for a record (locator.rs)
/// - Rendering letterboxed JPEG thumbnails (render.rs)
/// - The catalog-wide synchronization pass (sync.rs)
/// - URL-only repairs, legacy renames and remote fetches (urls.rs, migrate.rs, fetch.rs)

pub mod fetch;
pub mod locator;
pub mod migrate;
pub mod render;
pub mod sanitize;
pub mod sync;
pub mod urls;

use std::path::PathBuf;

/// URL prefix shared by every thumbnail reference in the catalog
pub const THUMBNAIL_URL_ROOT: &str = "img/thumbnails";

/// The three fixed square variants the gallery consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailSize {
    /// 6-column gallery view; also the legacy `thumbnailURL`
    Large,
    /// 12-column view
    Medium,
    /// List view
    Small,
}

impl ThumbnailSize {
    /// Generation and serialization order
    pub const ALL: [ThumbnailSize; 3] = [
        ThumbnailSize::Large,
        ThumbnailSize::Medium,
        ThumbnailSize::Small,
    ];

    pub fn edge(self) -> u32 {
        match self {
            ThumbnailSize::Large => 190,
            ThumbnailSize::Medium => 100,
            ThumbnailSize::Small => 30,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThumbnailSize::Large => "190x190",
            ThumbnailSize::Medium => "100x100",
            ThumbnailSize::Small => "30x30",
        }
    }

    pub fn dimensions(self) -> (u32, u32) {
        (self.edge(), self.edge())
    }

    /// Directory of this variant relative to the site root
    pub fn dir_segment(self) -> PathBuf {
        thumbnail_root_segment().join(self.label())
    }

    /// Catalog URL for a sanitized name; always forward slashes
    pub fn url_for(self, sanitized: &str) -> String {
        format!("{}/{}/{}.jpg", THUMBNAIL_URL_ROOT, self.label(), sanitized)
    }
}

/// `img/thumbnails` as a native relative path
pub fn thumbnail_root_segment() -> PathBuf {
    THUMBNAIL_URL_ROOT.split('/').collect()
}

/// Filename shared by every variant of one record
pub fn thumbnail_file_name(sanitized: &str) -> String {
    format!("{}.jpg", sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_edges_agree() {
        for size in ThumbnailSize::ALL {
            let (w, h) = size.dimensions();
            assert_eq!(size.label(), format!("{}x{}", w, h));
        }
    }

    #[test]
    fn test_url_uses_forward_slashes() {
        assert_eq!(
            ThumbnailSize::Medium.url_for("Falcon_Town_Elder"),
            "img/thumbnails/100x100/Falcon_Town_Elder.jpg"
        );
        assert_eq!(
            ThumbnailSize::Small.dir_segment(),
            PathBuf::from("img").join("thumbnails").join("30x30")
        );
    }
}
