use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::debug;
use walkdir::WalkDir;

use crate::error::StorageError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Resolves client file references to files below one root directory.
///
/// A reference is one or more `/`-separated glob components. It matches a
/// file whose root-relative path ends with those components, so both
/// `scan1.pdf` and `batch-7/scan1.pdf` find `<root>/2024/batch-7/scan1.pdf`.
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
}

impl FileLocator {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the first regular file matching `reference`.
    ///
    /// Directory entries are visited in file-name order, so the result is
    /// stable for a given tree.
    pub fn locate(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let patterns = compile_reference(reference)?;

        let metadata = std::fs::metadata(&self.root).map_err(|e| StorageError::RootUnavailable {
            path: self.root.clone(),
            source: e,
        })?;
        if !metadata.is_dir() {
            return Err(StorageError::RootUnavailable {
                path: self.root.clone(),
                source: std::io::Error::other("not a directory"),
            });
        }

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };

            if tail_matches(relative, &patterns) {
                debug!("Resolved '{}' to {}", reference, entry.path().display());
                return Ok(entry.path().to_path_buf());
            }
        }

        Err(StorageError::NotFound {
            reference: reference.to_string(),
            root: self.root.clone(),
        })
    }
}

fn compile_reference(reference: &str) -> Result<Vec<Pattern>, StorageError> {
    let invalid = |reason: &str| StorageError::InvalidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    if reference.trim().is_empty() {
        return Err(invalid("empty reference"));
    }
    if reference.contains('\0') {
        return Err(invalid("contains NUL"));
    }
    if Path::new(reference).is_absolute() || reference.starts_with('/') {
        return Err(invalid("absolute paths are not allowed"));
    }

    reference
        .split('/')
        .map(|component| {
            match component {
                "" => return Err(invalid("empty path component")),
                "." | ".." => return Err(invalid("relative components are not allowed")),
                _ => {}
            }
            Pattern::new(component).map_err(|e| invalid(&e.to_string()))
        })
        .collect()
}

fn tail_matches(relative: &Path, patterns: &[Pattern]) -> bool {
    let components: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    if components.len() < patterns.len() {
        return false;
    }

    let tail = &components[components.len() - patterns.len()..];
    tail.iter()
        .zip(patterns)
        .all(|(component, pattern)| pattern.matches_with(component, MATCH_OPTIONS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"%PDF-1.5").unwrap();
        path
    }

    #[test]
    fn test_locate_nested_file() {
        let temp_dir = TempDir::new().unwrap();
        let expected = touch(temp_dir.path(), "2024/batch-7/scan1.pdf");

        let locator = FileLocator::new(temp_dir.path());
        assert_eq!(locator.locate("scan1.pdf").unwrap(), expected);
    }

    #[test]
    fn test_locate_with_relative_reference() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "batch-6/scan1.pdf");
        let expected = touch(temp_dir.path(), "2024/batch-7/scan1.pdf");

        let locator = FileLocator::new(temp_dir.path());
        assert_eq!(locator.locate("batch-7/scan1.pdf").unwrap(), expected);
    }

    #[test]
    fn test_locate_is_case_sensitive() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "Scan1.pdf");

        let locator = FileLocator::new(temp_dir.path());
        assert!(matches!(
            locator.locate("scan1.pdf"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_locate_glob_reference() {
        let temp_dir = TempDir::new().unwrap();
        let expected = touch(temp_dir.path(), "in/scan-0042.pdf");

        let locator = FileLocator::new(temp_dir.path());
        assert_eq!(locator.locate("scan-*.pdf").unwrap(), expected);
    }

    #[test]
    fn test_locate_ignores_directories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("scan1.pdf")).unwrap();

        let locator = FileLocator::new(temp_dir.path());
        assert!(matches!(
            locator.locate("scan1.pdf"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_locate_first_match_is_stable() {
        let temp_dir = TempDir::new().unwrap();
        let first = touch(temp_dir.path(), "a/dup.pdf");
        touch(temp_dir.path(), "b/dup.pdf");

        let locator = FileLocator::new(temp_dir.path());
        assert_eq!(locator.locate("dup.pdf").unwrap(), first);
        assert_eq!(locator.locate("dup.pdf").unwrap(), first);
    }

    #[test]
    fn test_rejects_traversal_and_absolute_references() {
        let temp_dir = TempDir::new().unwrap();
        let locator = FileLocator::new(temp_dir.path());

        for reference in ["../etc/passwd", "a/../b.pdf", "/etc/passwd", "", "a//b.pdf"] {
            assert!(
                matches!(
                    locator.locate(reference),
                    Err(StorageError::InvalidReference { .. })
                ),
                "reference {:?} should be rejected",
                reference
            );
        }
    }

    #[test]
    fn test_missing_root() {
        let locator = FileLocator::new("/nonexistent/docid/root");
        assert!(matches!(
            locator.locate("scan1.pdf"),
            Err(StorageError::RootUnavailable { .. })
        ));
    }
}
