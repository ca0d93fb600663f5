//! # Infobase cache discovery
//!
//! The platform keeps per-infobase working data in folders named after the
//! infobase ID, under a roaming and a local application-data root.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static UUID_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.{8}-.{4}-.{4}-.{4}-.{12}$").unwrap());

/// Folder the platform creates for itself, never an infobase.
const NIL_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Which of the two cache locations a folder was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Local,
    Roaming,
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKind::Local => write!(f, "local"),
            CacheKind::Roaming => write!(f, "roaming"),
        }
    }
}

/// A cache folder and the total size of the files inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheDir {
    pub path: PathBuf,
    pub size: u64,
}

/// Cache folders keyed by infobase ID.
pub type CacheDirs = HashMap<String, CacheDir>;

/// Whether a folder name looks like an infobase ID.
pub fn is_cache_name(name: &str) -> bool {
    UUID_SHAPE.is_match(name) && !name.eq_ignore_ascii_case(NIL_ID)
}

/// Sum the size of every regular file below `path`.
///
/// Symbolic links are neither followed nor counted.
///
/// # Errors
/// Any error while walking the tree or reading metadata is returned.
pub fn dir_size(path: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        total += metadata.len();
    }
    Ok(total)
}

/// Find infobase cache folders directly below each of `roots`.
///
/// Roots that do not exist are skipped. When two roots hold the same ID the
/// later one wins.
pub fn scan(roots: &[PathBuf], kind: CacheKind) -> Result<CacheDirs> {
    let mut found = CacheDirs::new();

    for root in roots {
        if !root.exists() {
            tracing::debug!(%kind, root = %root.display(), "cache root does not exist");
            continue;
        }

        let entries = fs::read_dir(root).with_context(|| format!("Failed to list {}", root.display()))?;
        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_dir() || !is_cache_name(name) {
                continue;
            }

            let id = name.to_string();
            let size = dir_size(&path)?;
            tracing::debug!(%kind, %id, size, "found cache");
            found.insert(id, CacheDir { path, size });
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_names() {
        assert!(is_cache_name("11111111-1111-1111-1111-111111111111"));
        assert!(is_cache_name("ABCDEF01-abcd-ABCD-abcd-0123456789ab"));
        // shape only, not hex
        assert!(is_cache_name("zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz"));

        assert!(!is_cache_name(NIL_ID));
        assert!(!is_cache_name("11111111-1111-1111-1111-11111111111"));
        assert!(!is_cache_name("11111111_1111-1111-1111-111111111111"));
        assert!(!is_cache_name("ExtCompT"));
    }

    #[test]
    fn sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.bin"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("a/mid.bin"), vec![0u8; 20]).unwrap();
        fs::write(dir.path().join("a/b/deep.bin"), vec![0u8; 30]).unwrap();

        assert_eq!(dir_size(dir.path()).unwrap(), 60);
    }

    #[test]
    fn scans_roots() {
        let dir = tempfile::tempdir().unwrap();
        let v8 = dir.path().join("1Cv8");
        let id = "11111111-1111-1111-1111-111111111111";
        fs::create_dir_all(v8.join(id).join("sub")).unwrap();
        fs::write(v8.join(id).join("sub/data.bin"), vec![1u8; 42]).unwrap();
        fs::create_dir_all(v8.join(NIL_ID)).unwrap();
        fs::create_dir_all(v8.join("ExtCompT")).unwrap();
        // a file with the right name is not a cache
        fs::write(v8.join("22222222-2222-2222-2222-222222222222"), b"x").unwrap();

        let roots = vec![dir.path().join("1Cv82"), v8.clone()];
        let found = scan(&roots, CacheKind::Roaming).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(
            found[id],
            CacheDir {
                path: v8.join(id),
                size: 42
            }
        );
    }

    #[test]
    fn later_root_wins() {
        let dir = tempfile::tempdir().unwrap();
        let id = "11111111-1111-1111-1111-111111111111";
        let first = dir.path().join("1Cv8");
        let second = dir.path().join("1Cv82");
        fs::create_dir_all(first.join(id)).unwrap();
        fs::create_dir_all(second.join(id)).unwrap();

        let found = scan(&[first, second.clone()], CacheKind::Local).unwrap();
        assert_eq!(found[id].path, second.join(id));
    }

    #[test]
    fn size_of_missing_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(dir_size(&dir.path().join("gone")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_cache_aborts_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let id = "11111111-1111-1111-1111-111111111111";
        let locked = dir.path().join("1Cv8").join(id).join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("data.bin"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root reads through any mode bits
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            eprintln!("SKIP: permissions are not enforced for this user");
            return;
        }

        let result = scan(&[dir.path().join("1Cv8")], CacheKind::Local);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let err = result.unwrap_err();
        assert!(err.to_string().contains(id));
    }
}
