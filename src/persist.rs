//! C13: atomic file replacement.
//!
//! Every on-disk mutation in this crate — ProjectSpec rewrites, sync-cache
//! updates, TUI identity-set updates — goes through `write_atomic` so a
//! concurrent reader never observes a half-written file. Grounded on the
//! `tempfile` crate, which the teacher already depends on (there, for
//! worktree-creation scratch directories).

use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Atomically replace the contents of `path` with `contents`.
///
/// Writes to a temp file in the same directory (so the rename is on the
/// same filesystem and therefore atomic), then renames over the target.
/// Creates parent directories as needed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating directory {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    std::io::Write::write_all(&mut tmp, contents.as_bytes())
        .with_context(|| "writing temp file contents".to_string())?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming temp file onto {}", path.display()))?;
    Ok(())
}

/// Read and deserialize a JSON file, treating "file does not exist" as the
/// default value rather than an error.
pub fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: Default + serde::de::DeserializeOwned,
{
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}

/// Atomically write a JSON-serializable value to `path`.
pub fn write_json_atomic<T>(path: &Path, value: &T) -> Result<()>
where
    T: serde::Serialize,
{
    let contents =
        serde_json::to_string_pretty(value).context("serializing value to JSON")?;
    write_atomic(path, &contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn write_atomic_creates_parent_dirs_and_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.txt");
        write_atomic(&path, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn write_atomic_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn read_json_or_default_treats_missing_file_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let value: BTreeMap<String, i64> = read_json_or_default(&path).unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn write_json_atomic_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let mut value = BTreeMap::new();
        value.insert("key".to_string(), 42i64);
        write_json_atomic(&path, &value).unwrap();
        let read_back: BTreeMap<String, i64> = read_json_or_default(&path).unwrap();
        assert_eq!(read_back, value);
    }
}
