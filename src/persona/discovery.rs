//! Persona file discovery.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Recognized persona document extensions (compared case-insensitively).
pub const EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Dependency and version-control directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", ".hg", ".svn", "target"];

/// Whether a path carries one of the recognized extensions.
pub fn has_recognized_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Enumerate persona documents under `root`, recursively, in path order.
///
/// A missing or unreadable root yields an empty list.
pub async fn discover_persona_files(root: &Path) -> Vec<PathBuf> {
    match scan(root).await {
        Ok(files) => {
            debug!(root = %root.display(), count = files.len(), "Persona files discovered");
            files
        }
        Err(err) => {
            debug!(error = %err.format_for_log(), "Skipping persona directory");
            Vec::new()
        }
    }
}

/// Like [`discover_persona_files`] but reports an unavailable root.
pub async fn scan(root: &Path) -> Result<Vec<PathBuf>> {
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| Error::DirectoryUnavailable {
            path: root.to_path_buf(),
            source: Some(e),
        })?;

    let mut pending = vec![root.clone()];
    let mut files = Vec::new();
    let mut root_read = false;

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if dir == root && !root_read => {
                return Err(Error::DirectoryUnavailable {
                    path: root,
                    source: Some(e),
                });
            }
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Cannot read persona subdirectory");
                continue;
            }
        };
        root_read = true;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Directory listing interrupted");
                    break;
                }
            };

            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_dir() {
                let skipped = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| SKIPPED_DIRS.contains(&n))
                    .unwrap_or(false);
                if !skipped {
                    pending.push(path);
                }
            } else if has_recognized_extension(&path) {
                // Symlinks count when they resolve to a regular file.
                let is_file = file_type.is_file()
                    || tokio::fs::metadata(&path)
                        .await
                        .map(|m| m.is_file())
                        .unwrap_or(false);
                if is_file {
                    files.push(path);
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_recognized_extensions() {
        assert!(has_recognized_extension(Path::new("a/b.yaml")));
        assert!(has_recognized_extension(Path::new("a/b.YML")));
        assert!(!has_recognized_extension(Path::new("a/b.json")));
        assert!(!has_recognized_extension(Path::new("a/yaml")));
    }

    #[tokio::test]
    async fn test_recursive_discovery_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.yaml"), "").unwrap();
        fs::write(root.join("a.yml"), "").unwrap();
        fs::write(root.join("notes.md"), "").unwrap();
        fs::write(root.join("nested/deeper/c.yaml"), "").unwrap();
        fs::write(root.join("node_modules/pkg/d.yaml"), "").unwrap();
        fs::write(root.join(".git/e.yaml"), "").unwrap();

        let files = discover_persona_files(root).await;
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.yml", "b.yaml", "c.yaml"]);
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("does-not-exist");

        assert!(discover_persona_files(&missing).await.is_empty());
        let err = scan(&missing).await.unwrap_err();
        assert!(matches!(err, Error::DirectoryUnavailable { .. }));
    }
}
