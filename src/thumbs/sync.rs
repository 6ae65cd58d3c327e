/// Catalog Synchronizer
///
/// One pass over the catalog:
/// 1. Plan: select records, group them by sanitized name
/// 2. Work: locate + render each group (inline, or on a rayon pool)
/// 3. Commit: apply outcomes to records in catalog order, tally, save once
///
/// Records sharing a sanitized name share one set of thumbnail files, so the
/// first record of a group (catalog order) drives the work and later records
/// replay its outcome. This also means no two workers ever write the same path.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use super::locator::{ImageLocator, Located};
use super::migrate::{migrate_variant, Migration};
use super::render::{decode_path, Renderer};
use super::sanitize::sanitize;
use super::{thumbnail_file_name, ThumbnailSize};
use crate::catalog::{Catalog, Record};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::write_atomic;

/// Log a progress line every this many records
const PROGRESS_EVERY: usize = 100;

/// Per-run selection and behaviour switches
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Only records whose `Type` matches, case-insensitively
    pub type_filter: Option<String>,
    /// Only records with exactly these names (empty = all)
    pub names: Vec<String>,
    /// Only the first N catalog records
    pub limit: Option<usize>,
    /// Rename `<raw name>.jpg` thumbnails to their sanitized names first
    pub migrate_legacy: bool,
}

impl SyncOptions {
    fn selects(&self, record: &Record) -> bool {
        if let Some(wanted) = &self.type_filter {
            if !record.is_type(wanted) {
                return false;
            }
        }
        self.names.is_empty() || self.names.iter().any(|n| n.trim() == record.name())
    }
}

/// Aggregate counters for one run; counts are per record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records in the catalog
    pub total: usize,
    /// Records selected by limit/filters
    pub processed: usize,
    /// Records whose artwork was located, including ones that then failed
    pub matched: usize,
    /// Matched records with at least one freshly written variant
    pub generated: usize,
    /// Matched records whose variants all existed already
    pub skipped: usize,
    pub failed: usize,
    pub not_found: usize,
    pub renamed: usize,
    pub rename_conflicts: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total records in catalog: {}", self.total)?;
        writeln!(f, "Records processed:        {}", self.processed)?;
        writeln!(f, "Images matched:           {}", self.matched)?;
        writeln!(f, "Thumbnails generated:     {}", self.generated)?;
        writeln!(f, "Skipped (already exist):  {}", self.skipped)?;
        writeln!(f, "Failed to generate:       {}", self.failed)?;
        writeln!(f, "Images not found:         {}", self.not_found)?;
        if self.renamed > 0 || self.rename_conflicts > 0 {
            writeln!(f, "Legacy files renamed:     {}", self.renamed)?;
            writeln!(f, "Rename conflicts:         {}", self.rename_conflicts)?;
        }
        Ok(())
    }
}

/// Where each selected record stands after planning
#[derive(Debug, Clone, Copy)]
enum Slot {
    Unnamed,
    /// Name sanitizes to nothing, so there is no file to write
    Unsanitizable,
    Group { group: usize, first: bool },
}

/// One unit of locate/render work, shared by every record with this name
#[derive(Debug)]
struct Group {
    display_name: String,
    sanitized: String,
}

#[derive(Debug)]
enum Outcome {
    NotFound,
    Failed {
        size: ThumbnailSize,
        error: Error,
    },
    Ready {
        located: Located,
        generated: usize,
    },
}

#[derive(Debug)]
struct GroupResult {
    outcome: Outcome,
    renamed: usize,
    conflicts: Vec<Error>,
}

/// Limits inline warnings to the first few per class
struct WarnBudget {
    limit: usize,
    seen: HashMap<&'static str, usize>,
}

impl WarnBudget {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: HashMap::new(),
        }
    }

    fn allow(&mut self, class: &'static str) -> bool {
        let count = self.seen.entry(class).or_default();
        *count += 1;
        *count <= self.limit
    }

    fn report_suppressed(&self) {
        let mut classes: Vec<_> = self.seen.iter().collect();
        classes.sort();
        for (class, &count) in classes {
            if count > self.limit {
                log::warn!("{} more '{}' warnings suppressed", count - self.limit, class);
            }
        }
    }
}

/// Locate/render engine bound to one run's settings
pub struct Synchronizer<'a> {
    locator: &'a ImageLocator,
    renderer: Renderer,
    dirs: Vec<(ThumbnailSize, PathBuf)>,
    migrate_legacy: bool,
}

impl<'a> Synchronizer<'a> {
    /// Bind to `locator` and create the thumbnail directories.
    ///
    /// Failing to create a directory is a startup error.
    pub fn new(locator: &'a ImageLocator, config: &Config, migrate_legacy: bool) -> Result<Self> {
        let dirs: Vec<_> = ThumbnailSize::ALL
            .iter()
            .map(|&size| (size, config.thumbnail_dir(size)))
            .collect();
        for (_, dir) in &dirs {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }

        Ok(Self {
            locator,
            renderer: Renderer::new(config.quality, config.background),
            dirs,
            migrate_legacy,
        })
    }

    /// Run the pass over `catalog` in memory; the caller persists it
    pub fn run(
        &self,
        catalog: &mut Catalog,
        options: &SyncOptions,
        jobs: usize,
        warn_limit: usize,
    ) -> SyncReport {
        let mut report = SyncReport {
            total: catalog.len(),
            ..Default::default()
        };

        // Plan
        let take = options.limit.unwrap_or(usize::MAX);
        let mut groups: Vec<Group> = Vec::new();
        let mut by_sanitized: HashMap<String, usize> = HashMap::new();
        let mut slots: Vec<(usize, Slot)> = Vec::new();

        for (index, record) in catalog.records().iter().enumerate().take(take) {
            if !options.selects(record) {
                continue;
            }
            let name = record.name();
            let slot = if name.is_empty() {
                Slot::Unnamed
            } else {
                let sanitized = sanitize(name);
                if sanitized.is_empty() {
                    Slot::Unsanitizable
                } else if let Some(&group) = by_sanitized.get(&sanitized) {
                    Slot::Group { group, first: false }
                } else {
                    let group = groups.len();
                    by_sanitized.insert(sanitized.clone(), group);
                    groups.push(Group {
                        display_name: name.to_string(),
                        sanitized,
                    });
                    Slot::Group { group, first: true }
                }
            };
            slots.push((index, slot));
        }

        log::info!(
            "Processing {} records ({} distinct thumbnail names)",
            slots.len(),
            groups.len()
        );

        // Work
        let results = self.process_groups(&groups, jobs);

        // Commit
        let mut warnings = WarnBudget::new(warn_limit);
        for (index, slot) in slots {
            report.processed += 1;
            if report.processed % PROGRESS_EVERY == 0 {
                log::info!(
                    "Processing {}/{}... (matched: {}, generated: {}, skipped: {}, not found: {}, failed: {})",
                    report.processed,
                    report.total,
                    report.matched,
                    report.generated,
                    report.skipped,
                    report.not_found,
                    report.failed
                );
            }

            let record = &mut catalog.records_mut()[index];
            let (group, first) = match slot {
                Slot::Unnamed => {
                    report.not_found += 1;
                    log::debug!("Record {} has no name", index);
                    continue;
                }
                Slot::Unsanitizable => {
                    report.not_found += 1;
                    if warnings.allow("unusable name") {
                        log::warn!("Name '{}' has no usable filename characters", record.name());
                    }
                    continue;
                }
                Slot::Group { group, first } => (group, first),
            };
            let result = &results[group];

            if first {
                report.renamed += result.renamed;
                report.rename_conflicts += result.conflicts.len();
                for conflict in &result.conflicts {
                    if warnings.allow("rename conflict") {
                        log::warn!("{}", conflict);
                    }
                }
            }

            match &result.outcome {
                Outcome::NotFound => {
                    report.not_found += 1;
                    if warnings.allow("not found") {
                        log::warn!("Not found: '{}'", record.name());
                    }
                }
                Outcome::Failed { size, error } => {
                    // The image was located; only rendering or writing went wrong
                    report.matched += 1;
                    report.failed += 1;
                    if first && warnings.allow("render") {
                        log::warn!(
                            "Failed to generate {} thumbnail for '{}': {}",
                            size.label(),
                            record.name(),
                            error
                        );
                    }
                }
                Outcome::Ready { located, generated } => {
                    report.matched += 1;
                    if first && *generated > 0 {
                        report.generated += 1;
                    } else {
                        report.skipped += 1;
                    }
                    if first {
                        log::debug!(
                            "Found '{}' ({:?} match): {}",
                            record.name(),
                            located.rule,
                            located.path.display()
                        );
                    }
                    record.set_thumbnails(&groups[group].sanitized);
                }
            }
        }

        warnings.report_suppressed();
        report
    }

    fn process_groups(&self, groups: &[Group], jobs: usize) -> Vec<GroupResult> {
        if jobs > 1 && groups.len() > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => {
                    use rayon::prelude::*;
                    log::debug!("Rendering on {} worker threads", jobs);
                    return pool.install(|| groups.par_iter().map(|g| self.process_group(g)).collect());
                }
                Err(e) => log::warn!("Could not start worker pool ({}), running inline", e),
            }
        }
        groups.iter().map(|g| self.process_group(g)).collect()
    }

    /// Locate the artwork and make sure all three variants exist on disk
    fn process_group(&self, group: &Group) -> GroupResult {
        let mut result = GroupResult {
            outcome: Outcome::NotFound,
            renamed: 0,
            conflicts: Vec::new(),
        };

        let Some(located) = self.locator.locate(&group.display_name) else {
            return result;
        };

        let file_name = thumbnail_file_name(&group.sanitized);
        let mut decoded = None;
        let mut generated = 0;

        for (size, dir) in &self.dirs {
            if self.migrate_legacy {
                match migrate_variant(dir, &group.display_name) {
                    Ok(Migration::Renamed) => result.renamed += 1,
                    Ok(Migration::Nothing) => {}
                    Err(e) => result.conflicts.push(e),
                }
            }

            let target = dir.join(&file_name);
            if target.exists() {
                continue;
            }

            // Decode once, only when some variant is actually missing
            let img = match decoded.take() {
                Some(img) => img,
                None => match decode_path(&located.path) {
                    Ok(img) => img,
                    Err(error) => {
                        result.outcome = Outcome::Failed { size: *size, error };
                        return result;
                    }
                },
            };

            let written = self
                .renderer
                .render_image(&img, size.dimensions(), &located.path)
                .and_then(|bytes| write_atomic(&target, &bytes));
            decoded = Some(img);

            if let Err(error) = written {
                result.outcome = Outcome::Failed { size: *size, error };
                return result;
            }
            generated += 1;
        }

        result.outcome = Outcome::Ready { located, generated };
        result
    }
}

/// Full run: load catalog, index images, synchronize, save once.
///
/// Startup problems (catalog, image root, thumbnail dirs) are returned as
/// errors before any record is touched.
pub fn sync_catalog(config: &Config, options: &SyncOptions) -> Result<SyncReport> {
    let image_root = config
        .image_root
        .as_deref()
        .ok_or(Error::NoImageRoot)?;

    let mut catalog = Catalog::load(&config.catalog)?;
    if catalog.is_empty() {
        log::warn!("Catalog {} has no records", config.catalog.display());
    }
    let locator = ImageLocator::new(image_root, &config.subdirs)?;
    let synchronizer = Synchronizer::new(&locator, config, options.migrate_legacy)?;

    let report = synchronizer.run(&mut catalog, options, config.jobs, config.warn_limit);
    catalog.save(config.output_path())?;
    Ok(report)
}
