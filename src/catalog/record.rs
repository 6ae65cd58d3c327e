/// A single catalog entry
///
/// Records are kept as the raw JSON object so fields this tool does not know
/// about (and their key order) survive a load/save cycle untouched. The
/// accessors below give typed views over the handful of keys the pipeline
/// reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::thumbs::ThumbnailSize;

pub const NAME_KEY: &str = "Name";
pub const MINT_KEY: &str = "mintAddress";
pub const TYPE_KEY: &str = "Type";
/// Remote image URL used by the fetch variant
pub const URL_KEY: &str = "URL";
/// Legacy single thumbnail (always the 190x190 variant)
pub const THUMBNAIL_URL_KEY: &str = "thumbnailURL";
pub const THUMBNAIL_URLS_KEY: &str = "thumbnailURLs";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    fn str_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or("").trim()
    }

    /// Display name, trimmed; empty when absent
    pub fn name(&self) -> &str {
        self.str_field(NAME_KEY)
    }

    pub fn mint_address(&self) -> &str {
        self.str_field(MINT_KEY)
    }

    pub fn record_type(&self) -> &str {
        self.str_field(TYPE_KEY)
    }

    /// Case-insensitive category check ("elder" matches "Elder")
    pub fn is_type(&self, wanted: &str) -> bool {
        self.record_type().to_lowercase() == wanted.trim().to_lowercase()
    }

    pub fn remote_url(&self) -> &str {
        self.str_field(URL_KEY)
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.0.get(THUMBNAIL_URL_KEY).and_then(Value::as_str)
    }

    /// The `thumbnailURLs` object, if present and actually an object
    pub fn thumbnail_urls(&self) -> Option<&Map<String, Value>> {
        self.0.get(THUMBNAIL_URLS_KEY).and_then(Value::as_object)
    }

    pub fn thumbnail_urls_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.get_mut(THUMBNAIL_URLS_KEY).and_then(Value::as_object_mut)
    }

    pub fn thumbnail_url_for(&self, size: ThumbnailSize) -> Option<&str> {
        self.thumbnail_urls()?.get(size.label()).and_then(Value::as_str)
    }

    /// True when `thumbnailURLs` is a non-empty object
    pub fn has_thumbnail_urls(&self) -> bool {
        self.thumbnail_urls().is_some_and(|urls| !urls.is_empty())
    }

    /// Point every variant at `<size>/<sanitized>.jpg`.
    ///
    /// Writes `thumbnailURLs` in 190/100/30 order and mirrors the 190x190
    /// entry into `thumbnailURL`.
    pub fn set_thumbnails(&mut self, sanitized: &str) {
        let urls: Map<String, Value> = ThumbnailSize::ALL
            .iter()
            .map(|size| (size.label().to_string(), Value::String(size.url_for(sanitized))))
            .collect();
        self.set_thumbnail_urls(urls);
    }

    /// Replace `thumbnailURLs` and re-derive `thumbnailURL` from it
    pub fn set_thumbnail_urls(&mut self, urls: Map<String, Value>) {
        self.0
            .insert(THUMBNAIL_URLS_KEY.to_string(), Value::Object(urls));
        self.sync_legacy_url();
    }

    /// Set only the legacy field (fetch variant)
    pub fn set_thumbnail_url(&mut self, url: impl Into<String>) {
        self.0
            .insert(THUMBNAIL_URL_KEY.to_string(), Value::String(url.into()));
    }

    /// Copy `thumbnailURLs["190x190"]` into `thumbnailURL` when present
    pub fn sync_legacy_url(&mut self) {
        if let Some(large) = self.thumbnail_url_for(ThumbnailSize::Large) {
            let large = large.to_string();
            self.set_thumbnail_url(large);
        }
    }

    /// Whether the legacy field agrees with the 190x190 entry
    pub fn is_consistent(&self) -> bool {
        match self.thumbnail_url_for(ThumbnailSize::Large) {
            Some(large) => self.thumbnail_url() == Some(large),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_accessors_trim_and_default() {
        let r = record(json!({"Name": "  Falcon Town Elder ", "Type": "ELDER", "mintAddress": 7}));
        assert_eq!(r.name(), "Falcon Town Elder");
        assert_eq!(r.mint_address(), "");
        assert!(r.is_type("elder"));
        assert!(!r.is_type("Mushroom Head"));
        assert!(!r.has_thumbnail_urls());
    }

    #[test]
    fn test_set_thumbnails_keeps_invariant() {
        let mut r = record(json!({"Name": "Falcon Town Elder", "thumbnailURLs": {}}));
        r.set_thumbnails("Falcon_Town_Elder");

        assert_eq!(
            r.thumbnail_url(),
            Some("img/thumbnails/190x190/Falcon_Town_Elder.jpg")
        );
        assert_eq!(
            r.thumbnail_url_for(ThumbnailSize::Small),
            Some("img/thumbnails/30x30/Falcon_Town_Elder.jpg")
        );
        assert_eq!(r.thumbnail_urls().unwrap().len(), 3);
        assert!(r.is_consistent());

        let labels: Vec<&String> = r.thumbnail_urls().unwrap().keys().collect();
        assert_eq!(labels, ["190x190", "100x100", "30x30"]);
    }

    #[test]
    fn test_existing_key_order_is_kept() {
        let mut r = record(json!({
            "mintAddress": "abc",
            "thumbnailURL": "old",
            "Name": "X",
            "thumbnailURLs": {"190x190": "old"},
            "Type": "Elder"
        }));
        r.set_thumbnails("X");

        let keys: Vec<&String> = r.0.keys().collect();
        assert_eq!(keys, ["mintAddress", "thumbnailURL", "Name", "thumbnailURLs", "Type"]);
    }

    #[test]
    fn test_non_object_thumbnail_urls_is_ignored() {
        let r = record(json!({"Name": "X", "thumbnailURLs": "nope", "thumbnailURL": "a"}));
        assert!(r.thumbnail_urls().is_none());
        assert!(r.is_consistent());
    }
}
