/// Read-only catalog health checks
///
/// Duplicates are reported, never resolved. Names are compared exactly
/// (after trimming), so near-identical names such as the Bladesong twins are
/// distinct keys.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::Catalog;

/// Records sharing one key, by catalog index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub total: usize,
    pub unnamed: Vec<usize>,
    pub duplicate_mints: Vec<DuplicateGroup>,
    pub duplicate_names: Vec<DuplicateGroup>,
    /// Named records with no populated `thumbnailURLs`
    pub missing_thumbnails: Vec<usize>,
    /// Records with `#` in any thumbnail URL (broken as a URL fragment)
    pub hash_in_url: Vec<usize>,
    /// Records whose `thumbnailURL` disagrees with the 190x190 entry
    pub inconsistent: Vec<usize>,
    /// Record count per lowercased `Type`
    pub types: BTreeMap<String, usize>,
}

impl CatalogReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_mints.is_empty()
            && self.duplicate_names.is_empty()
            && self.hash_in_url.is_empty()
            && self.inconsistent.is_empty()
    }
}

pub fn diagnose(catalog: &Catalog) -> CatalogReport {
    let mut report = CatalogReport {
        total: catalog.len(),
        ..Default::default()
    };

    let mut mints = GroupBuilder::default();
    let mut names = GroupBuilder::default();

    for (i, record) in catalog.records().iter().enumerate() {
        let name = record.name();
        if name.is_empty() {
            report.unnamed.push(i);
        } else {
            names.add(name, i);
            if !record.has_thumbnail_urls() {
                report.missing_thumbnails.push(i);
            }
        }
        mints.add(record.mint_address(), i);

        let legacy_hash = record.thumbnail_url().is_some_and(|u| u.contains('#'));
        let sized_hash = record
            .thumbnail_urls()
            .is_some_and(|urls| urls.values().filter_map(|v| v.as_str()).any(|u| u.contains('#')));
        if legacy_hash || sized_hash {
            report.hash_in_url.push(i);
        }
        if !record.is_consistent() {
            report.inconsistent.push(i);
        }

        let kind = record.record_type().to_lowercase();
        if !kind.is_empty() {
            *report.types.entry(kind).or_default() += 1;
        }
    }

    report.duplicate_mints = mints.duplicates();
    report.duplicate_names = names.duplicates();
    report
}

/// Groups indices by key, remembering first-seen key order
#[derive(Default)]
struct GroupBuilder {
    order: Vec<String>,
    groups: HashMap<String, Vec<usize>>,
}

impl GroupBuilder {
    fn add(&mut self, key: &str, index: usize) {
        if key.is_empty() {
            return;
        }
        let entry = self.groups.entry(key.to_string()).or_insert_with(|| {
            self.order.push(key.to_string());
            Vec::new()
        });
        entry.push(index);
    }

    fn duplicates(mut self) -> Vec<DuplicateGroup> {
        self.order
            .into_iter()
            .filter_map(|key| {
                let indices = self.groups.remove(&key)?;
                (indices.len() > 1).then_some(DuplicateGroup { key, indices })
            })
            .collect()
    }
}
