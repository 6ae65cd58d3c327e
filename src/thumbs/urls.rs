/// Catalog-only URL repairs
///
/// Fills missing `thumbnailURLs` from the sanitized name and rewrites URLs that
/// still reference the raw display name (`.../Mindfolk Founder #8.jpg`). Never
/// touches the thumbnail directories.

use serde::Serialize;
use serde_json::Value;

use super::sanitize::sanitize;
use super::thumbnail_file_name;
use crate::catalog::{Catalog, Record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UrlRepairReport {
    /// Records with no usable `thumbnailURLs` that were filled in
    pub filled: usize,
    /// Records whose `#` URLs were rewritten
    pub rewritten: usize,
}

impl UrlRepairReport {
    pub fn updated(&self) -> usize {
        self.filled + self.rewritten
    }
}

pub fn fix_urls(catalog: &mut Catalog) -> UrlRepairReport {
    let mut report = UrlRepairReport::default();

    for record in catalog.records_mut() {
        let name = record.name().to_string();
        let sanitized = sanitize(&name);
        if sanitized.is_empty() {
            continue;
        }

        if !record.has_thumbnail_urls() {
            record.set_thumbnails(&sanitized);
            report.filled += 1;
            if report.filled <= 5 {
                log::debug!("Filled URLs for '{}'", name);
            }
        } else if rewrite_raw_urls(record, &name, &sanitized) {
            report.rewritten += 1;
        }
    }

    report
}

/// Swap `/<raw>.jpg` for `/<sanitized>.jpg` in every URL containing `#`.
///
/// Returns true if anything changed.
fn rewrite_raw_urls(record: &mut Record, raw: &str, sanitized: &str) -> bool {
    let old = format!("/{}", thumbnail_file_name(raw));
    let new = format!("/{}", thumbnail_file_name(sanitized));
    if old == new {
        return false;
    }

    let fix = |url: &str| -> Option<String> {
        if !url.contains('#') {
            return None;
        }
        let fixed = url.replace(&old, &new);
        (fixed != url).then_some(fixed)
    };

    let mut changed = false;
    if let Some(urls) = record.thumbnail_urls_mut() {
        for value in urls.values_mut() {
            if let Some(fixed) = value.as_str().and_then(fix) {
                *value = Value::String(fixed);
                changed = true;
            }
        }
    }
    if changed {
        record.sync_legacy_url();
    }

    // Legacy field may still carry the raw name if the sized map never did
    if let Some(fixed) = record.thumbnail_url().and_then(fix) {
        record.set_thumbnail_url(fixed);
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbs::ThumbnailSize;
    use serde_json::json;

    fn catalog(values: Vec<Value>) -> Catalog {
        Catalog::new(
            values
                .into_iter()
                .map(|v| serde_json::from_value::<Record>(v).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_fills_missing_urls() {
        let mut c = catalog(vec![
            json!({"Name": "Falcon Town Elder"}),
            json!({"Name": "Ock Water Elder", "thumbnailURLs": {}}),
            json!({"Name": "Spore Head", "thumbnailURLs": "nonsense"}),
            json!({"Name": ""}),
        ]);
        let report = fix_urls(&mut c);

        assert_eq!(report.filled, 3);
        assert_eq!(report.rewritten, 0);
        let falcon = &c.records()[0];
        assert_eq!(
            falcon.thumbnail_url(),
            Some("img/thumbnails/190x190/Falcon_Town_Elder.jpg")
        );
        assert_eq!(
            c.records()[2].thumbnail_url_for(ThumbnailSize::Medium),
            Some("img/thumbnails/100x100/Spore_Head.jpg")
        );
        assert!(c.records()[3].thumbnail_urls().is_none());
    }

    #[test]
    fn test_rewrites_hash_urls() {
        let mut c = catalog(vec![json!({
            "Name": "Mindfolk Founder #8",
            "thumbnailURL": "img/thumbnails/190x190/Mindfolk Founder #8.jpg",
            "thumbnailURLs": {
                "190x190": "img/thumbnails/190x190/Mindfolk Founder #8.jpg",
                "100x100": "img/thumbnails/100x100/Mindfolk Founder #8.jpg",
                "30x30": "img/thumbnails/30x30/Mindfolk Founder #8.jpg"
            }
        })]);
        let report = fix_urls(&mut c);

        assert_eq!(report.rewritten, 1);
        assert_eq!(report.updated(), 1);
        let r = &c.records()[0];
        assert_eq!(
            r.thumbnail_url(),
            Some("img/thumbnails/190x190/Mindfolk_Founder_8.jpg")
        );
        assert_eq!(
            r.thumbnail_url_for(ThumbnailSize::Small),
            Some("img/thumbnails/30x30/Mindfolk_Founder_8.jpg")
        );
        assert!(r.is_consistent());
    }

    #[test]
    fn test_leaves_good_urls_alone() {
        let record = json!({
            "Name": "Falcon Town Elder",
            "thumbnailURL": "https://cdn.example/falcon.png",
            "thumbnailURLs": {"190x190": "https://cdn.example/falcon.png"}
        });
        let mut c = catalog(vec![record.clone()]);
        let report = fix_urls(&mut c);

        assert_eq!(report.updated(), 0);
        assert_eq!(c.records()[0], serde_json::from_value::<Record>(record).unwrap());
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let mut c = catalog(vec![
            json!({"Name": "Mindfolk Founder #8"}),
            json!({
                "Name": "Mindfolk Founder #9",
                "thumbnailURLs": {"190x190": "img/thumbnails/190x190/Mindfolk Founder #9.jpg"}
            }),
        ]);
        fix_urls(&mut c);
        let before = c.clone();
        assert_eq!(fix_urls(&mut c), UrlRepairReport::default());
        assert_eq!(c.records(), before.records());
    }
}
