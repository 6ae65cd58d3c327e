/// Image Locator
///
/// Finds the artwork file for a record's display name. The image root and its
/// known subfolders are listed once (sorted by file name, so results never
/// depend on filesystem iteration order) and then queried per record.
///
/// Matching rules, in priority order:
/// 1. Numbered convention: "Mindfolk Founder #8" -> `Mindfolk_Founder_0008.png`
/// 2. Exact match on normalized stems, across root then subfolders
/// 3. First substring match (either direction), same order
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Still-image extensions, in preference order for the numbered convention
pub const STILL_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Animated formats; decodable (first frame) but never picked by name matching
pub const ANIMATED_EXTENSIONS: [&str; 1] = ["gif"];

/// Which rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Convention,
    Exact,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub rule: MatchRule,
}

#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    file_name_lower: String,
    normalized_stem: String,
    still: bool,
}

/// Indexed view of the image root
#[derive(Debug, Clone)]
pub struct ImageLocator {
    /// Root listing first, then each existing known subfolder in order
    dirs: Vec<Vec<Candidate>>,
}

impl ImageLocator {
    /// Index `root` and the subfolders that exist under it.
    ///
    /// A missing root is fatal; missing subfolders are skipped.
    pub fn new(root: &Path, subdirs: &[String]) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::ImageRootMissing(root.to_path_buf()));
        }

        let mut dirs = vec![list_dir(root)];
        for sub in subdirs {
            let path = root.join(sub);
            if path.is_dir() {
                dirs.push(list_dir(&path));
            } else {
                log::debug!("Known subfolder not present: {}", path.display());
            }
        }

        let files: usize = dirs.iter().map(Vec::len).sum();
        log::info!(
            "Indexed {} files in {} folder(s) under {}",
            files,
            dirs.len(),
            root.display()
        );

        Ok(Self { dirs })
    }

    /// Find the best image for `display_name`, or None (a recoverable miss)
    pub fn locate(&self, display_name: &str) -> Option<Located> {
        if let Some(path) = self.locate_numbered(display_name) {
            return Some(Located {
                path,
                rule: MatchRule::Convention,
            });
        }

        let target = normalize_name(display_name);
        if target.is_empty() {
            return None;
        }

        let still = || {
            self.dirs
                .iter()
                .flatten()
                .filter(|c| c.still && !c.normalized_stem.is_empty())
        };

        // Exact matches win over substring matches anywhere in the sweep
        if let Some(c) = still().find(|c| c.normalized_stem == target) {
            return Some(Located {
                path: c.path.clone(),
                rule: MatchRule::Exact,
            });
        }

        still()
            .find(|c| c.normalized_stem.contains(&target) || target.contains(&c.normalized_stem))
            .map(|c| Located {
                path: c.path.clone(),
                rule: MatchRule::Substring,
            })
    }

    /// Numbered convention lookup, directly under the root only
    fn locate_numbered(&self, display_name: &str) -> Option<PathBuf> {
        let (label, number) = split_numbered(display_name)?;
        let label = label.split_whitespace().collect::<Vec<_>>().join("_");

        let stems = [
            format!("{}_{:04}", label, number),
            format!("{}_{}", label, number),
        ];
        let root_files = self.dirs.first()?;

        for stem in &stems {
            for ext in STILL_EXTENSIONS {
                let wanted = format!("{}.{}", stem, ext).to_lowercase();
                if let Some(c) = root_files.iter().find(|c| c.file_name_lower == wanted) {
                    return Some(c.path.clone());
                }
            }
        }
        None
    }
}

/// Lowercase, keep only alphanumerics and whitespace, collapse whitespace
pub fn normalize_name(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split "<label> #<digits>" or "<label> <digits>" into label and number
fn split_numbered(name: &str) -> Option<(&str, u64)> {
    let name = name.trim();
    let digits_start = name
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let number: u64 = name[digits_start..].parse().ok()?;
    let prefix = &name[..digits_start];
    let prefix = prefix.strip_suffix('#').unwrap_or(prefix);

    // The label must be separated from the number by whitespace
    if !prefix.ends_with(char::is_whitespace) {
        return None;
    }
    let label = prefix.trim_end();
    if label.is_empty() {
        return None;
    }
    Some((label, number))
}

fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|e| e.to_ascii_lowercase())
}

/// Sorted, non-recursive listing of image files in `dir`
fn list_dir(dir: &Path) -> Vec<Candidate> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            let ext = extension_lower(&path)?;
            let still = STILL_EXTENSIONS.contains(&ext.as_str());
            if !still && !ANIMATED_EXTENSIONS.contains(&ext.as_str()) {
                return None;
            }
            let file_name_lower = path.file_name()?.to_string_lossy().to_lowercase();
            let stem = path.file_stem()?.to_string_lossy();
            Some(Candidate {
                normalized_stem: normalize_name(&stem),
                file_name_lower,
                still,
                path,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"not really an image").unwrap();
        path
    }

    /// One-shot lookup without keeping the index around
    fn locate(root: &Path, subdirs: &[String], display_name: &str) -> Result<Option<PathBuf>> {
        let locator = ImageLocator::new(root, subdirs)?;
        Ok(locator.locate(display_name).map(|l| l.path))
    }

    fn subdirs() -> Vec<String> {
        vec!["Elders".to_string(), "Mushrooms".to_string()]
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Falcon   Town-Elder! "), "falcon townelder");
        assert_eq!(normalize_name("Mindfolk Founder #8"), "mindfolk founder 8");
        assert_eq!(normalize_name("#?!"), "");
    }

    #[test]
    fn test_split_numbered() {
        assert_eq!(split_numbered("Mindfolk Founder #8"), Some(("Mindfolk Founder", 8)));
        assert_eq!(split_numbered("Mindfolk Founder 0012"), Some(("Mindfolk Founder", 12)));
        assert_eq!(split_numbered("Elder8"), None);
        assert_eq!(split_numbered("#8"), None);
        assert_eq!(split_numbered("Falcon Town Elder"), None);
    }

    #[test]
    fn test_founder_convention_match() {
        let dir = TempDir::new().unwrap();
        let expected = touch(dir.path(), "Mindfolk_Founder_0008.png");
        touch(dir.path(), "Mindfolk Founder 80.png");

        let locator = ImageLocator::new(dir.path(), &subdirs()).unwrap();
        let found = locator.locate("Mindfolk Founder #8").unwrap();

        assert_eq!(found.path, expected);
        assert_eq!(found.rule, MatchRule::Convention);
    }

    #[test]
    fn test_convention_is_case_insensitive_and_accepts_unpadded() {
        let dir = TempDir::new().unwrap();
        let expected = touch(dir.path(), "mindfolk_founder_12345.JPG");

        let locator = ImageLocator::new(dir.path(), &[]).unwrap();
        let found = locator.locate("MINDFOLK FOUNDER 12345").unwrap();
        assert_eq!(found.path, expected);
    }

    #[test]
    fn test_convention_prefers_png() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Mindfolk_Founder_0001.jpg");
        let png = touch(dir.path(), "Mindfolk_Founder_0001.png");

        let found = locate(dir.path(), &[], "Mindfolk Founder #1").unwrap();
        assert_eq!(found, Some(png));
    }

    #[test]
    fn test_exact_beats_earlier_substring() {
        let dir = TempDir::new().unwrap();
        // Root sorts first and holds only a substring hit
        touch(dir.path(), "Falcon Town Elder Alt.png");
        let exact = touch(dir.path(), "Elders/Falcon_Town Elder.png");

        let locator = ImageLocator::new(dir.path(), &subdirs()).unwrap();
        let found = locator.locate("Falcon Town Elder").unwrap();

        // "Falcon_Town Elder" normalizes to "falcontown elder", so no exact hit;
        // the substring rule falls back to the root file
        assert_eq!(found.rule, MatchRule::Substring);
        assert_ne!(found.path, exact);

        let exact = touch(dir.path(), "Mushrooms/falcon town elder.webp");
        let locator = ImageLocator::new(dir.path(), &subdirs()).unwrap();
        let found = locator.locate("Falcon Town Elder").unwrap();
        assert_eq!(found.rule, MatchRule::Exact);
        assert_eq!(found.path, exact);
    }

    #[test]
    fn test_root_searched_before_subfolders() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Elders/Swanson Wood Elder.png");
        let root_hit = touch(dir.path(), "Swanson Wood Elder.jpg");

        let found = locate(dir.path(), &subdirs(), "Swanson Wood Elder").unwrap();
        assert_eq!(found, Some(root_hit));
    }

    #[test]
    fn test_subfolders_searched_in_given_order() {
        let dir = TempDir::new().unwrap();
        let elder = touch(dir.path(), "Elders/Ock Water Elder.png");
        touch(dir.path(), "Mushrooms/Ock Water Elder.png");

        let found = locate(dir.path(), &subdirs(), "Ock Water Elder").unwrap();
        assert_eq!(found, Some(elder));
    }

    #[test]
    fn test_gif_is_not_matched_by_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Foster Mountain Elder.gif");

        let found = locate(dir.path(), &[], "Foster Mountain Elder").unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_substring_order_is_sorted() {
        let dir = TempDir::new().unwrap();
        // Created out of order on purpose
        touch(dir.path(), "b Spore Mushroom Head.png");
        let first = touch(dir.path(), "a Spore Mushroom Head.png");

        let found = locate(dir.path(), &[], "Spore Mushroom Head").unwrap();
        assert_eq!(found, Some(first));
    }

    #[test]
    fn test_missing_name_and_empty_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "Something Else.png");
        touch(dir.path(), "###.png");

        let locator = ImageLocator::new(dir.path(), &[]).unwrap();
        assert_eq!(locator.locate("Nobody Here"), None);
        assert_eq!(locator.locate("#"), None);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = ImageLocator::new(&dir.path().join("gone"), &[]);
        assert!(matches!(result, Err(Error::ImageRootMissing(_))));
    }
}
