use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::StorageError;

/// Returns `desired` if nothing exists there, otherwise the first free
/// `"<stem> (n)<.ext>"` sibling for n = 1, 2, ...
///
/// Existence is checked with `symlink_metadata`, so dangling symlinks count as
/// taken. The result is only a candidate; [`FileMover::move_file`] re-checks
/// atomically.
pub fn unique_path(desired: &Path) -> PathBuf {
    if !exists(desired) {
        return desired.to_path_buf();
    }

    let parent = desired.parent().unwrap_or_else(|| Path::new(""));
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = desired
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u64..)
        .map(|counter| parent.join(format!("{} ({}){}", stem, counter, ext)))
        .find(|candidate| !exists(candidate))
        .unwrap_or_else(|| desired.to_path_buf())
}

fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

/// Moves a file to a destination that must not exist yet.
///
/// A destination claimed concurrently is reported as
/// [`StorageError::RenameConflict`] so the caller can pick another name.
pub trait FileMover: Send + Sync {
    fn move_file(&self, src: &Path, dst: &Path) -> Result<(), StorageError>;
}

/// Moves files without ever replacing an existing destination.
#[derive(Debug, Clone, Default)]
pub struct Renamer;

impl Renamer {
    pub fn new() -> Self {
        Self
    }

    fn rename_if_absent(&self, src: &Path, dst: &Path) -> Result<(), StorageError> {
        if exists(dst) {
            return Err(StorageError::RenameConflict {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
            });
        }

        std::fs::rename(src, dst).map_err(|e| StorageError::MoveFile {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: e,
        })
    }
}

impl FileMover for Renamer {
    /// Moves `src` to `dst` in one step.
    ///
    /// Creating a hard link fails atomically when `dst` exists, which turns a
    /// concurrent claim on the same name into [`StorageError::RenameConflict`].
    /// Filesystems without hard links (some SMB and FAT mounts) fall back to an
    /// existence check followed by `rename`. Never copies.
    fn move_file(&self, src: &Path, dst: &Path) -> Result<(), StorageError> {
        match std::fs::hard_link(src, dst) {
            Ok(()) => {
                if let Err(e) = std::fs::remove_file(src) {
                    let _ = std::fs::remove_file(dst);
                    return Err(StorageError::MoveFile {
                        from: src.to_path_buf(),
                        to: dst.to_path_buf(),
                        source: e,
                    });
                }
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::RenameConflict {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::MoveFile {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source: e,
            }),
            Err(e) => {
                debug!("Hard link unavailable ({}), falling back to rename", e);
                self.rename_if_absent(src, dst)
            }
        }
    }
}

pub fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

/// Reduces a remote supplied title to a plain file name.
///
/// Returns `None` when nothing usable is left.
pub fn safe_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    match cleaned {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_path_free() {
        let temp_dir = TempDir::new().unwrap();
        let desired = temp_dir.path().join("HD000123.pdf");
        assert_eq!(unique_path(&desired), desired);
    }

    #[test]
    fn test_unique_path_numbering_sequence() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        std::fs::write(dir.join("x.pdf"), b"0").unwrap();
        for n in 1..4 {
            std::fs::write(dir.join(format!("x ({}).pdf", n)), b"n").unwrap();
        }

        assert_eq!(unique_path(&dir.join("x.pdf")), dir.join("x (4).pdf"));
    }

    #[test]
    fn test_unique_path_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("noext"), b"original").unwrap();

        assert_eq!(
            unique_path(&temp_dir.path().join("noext")),
            temp_dir.path().join("noext (1)")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unique_path_treats_dangling_symlink_as_taken() {
        let temp_dir = TempDir::new().unwrap();
        let link = temp_dir.path().join("a.pdf");
        std::os::unix::fs::symlink(temp_dir.path().join("missing"), &link).unwrap();

        assert_eq!(unique_path(&link), temp_dir.path().join("a (1).pdf"));
    }

    #[test]
    fn test_move_file() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("scan1.pdf");
        let dst = temp_dir.path().join("HD000123.pdf");
        std::fs::write(&src, b"content").unwrap();

        Renamer::new().move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"content");
    }

    #[test]
    fn test_move_file_never_clobbers() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("scan1.pdf");
        let dst = temp_dir.path().join("HD000123.pdf");
        std::fs::write(&src, b"new").unwrap();
        std::fs::write(&dst, b"existing").unwrap();

        let result = Renamer::new().move_file(&src, &dst);

        assert!(matches!(result, Err(StorageError::RenameConflict { .. })));
        assert_eq!(std::fs::read(&dst).unwrap(), b"existing");
        assert_eq!(std::fs::read(&src).unwrap(), b"new");
    }

    #[test]
    fn test_move_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = Renamer::new().move_file(
            &temp_dir.path().join("missing.pdf"),
            &temp_dir.path().join("dst.pdf"),
        );

        match result {
            Err(StorageError::MoveFile { from, .. }) => {
                assert!(from.to_string_lossy().contains("missing.pdf"));
            }
            other => panic!("Expected MoveFile error, got {:?}", other),
        }
    }

    #[test]
    fn test_ensure_directory_nested() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("media/PDF_2_LAYER");

        ensure_directory(&nested).unwrap();
        ensure_directory(&nested).unwrap();

        assert!(nested.is_dir());
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            safe_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            safe_file_name("batch\\scan 1.pdf").as_deref(),
            Some("scan 1.pdf")
        );
        assert_eq!(safe_file_name("  "), None);
        assert_eq!(safe_file_name("a/.."), None);
        assert_eq!(safe_file_name("tab\tname.pdf").as_deref(), Some("tabname.pdf"));
    }
}
