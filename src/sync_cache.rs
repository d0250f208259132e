//! C6: a JSON map `{cache_key: unix_seconds_last_checked}` tracking when a
//! ChangeSpec (or hook, or fix-hook) was last polled for a status check.
//!
//! A missing file is treated as empty, and a write failure is swallowed —
//! this cache is a throttle, never a correctness-critical store, so a
//! corrupt or unwritable cache should degrade to "check every time"
//! rather than fail the caller.

use std::collections::BTreeMap;

/// Default minimum interval between submission-status checks (5 minutes).
pub const DEFAULT_STATUS_CHECK_INTERVAL_SECONDS: i64 = 300;
/// Default zombie-detection poll throttle for the hook scheduler.
pub const DEFAULT_ZOMBIE_CHECK_INTERVAL_SECONDS: i64 = 60;
/// Default age past which a fix-hook RUNNING suffix is considered stale.
pub const DEFAULT_FIX_HOOK_STALE_SECONDS: i64 = 3600;
/// Default age past which a CRS comment-suffix is considered stale.
pub const DEFAULT_COMMENT_SUFFIX_STALE_SECONDS: i64 = 7200;

fn load(path: &std::path::Path) -> BTreeMap<String, f64> {
    crate::persist::read_json_or_default(path).unwrap_or_default()
}

fn save(path: &std::path::Path, cache: &BTreeMap<String, f64>) {
    if let Err(err) = crate::persist::write_json_atomic(path, cache) {
        log::warn!("could not write sync cache {}: {err}", path.display());
    }
}

fn now_unix() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Whether `key` should be (re-)checked: true if never checked, or if at
/// least `min_interval_seconds` have elapsed since the last check.
pub fn should_check(path: &std::path::Path, key: &str, min_interval_seconds: i64) -> bool {
    let cache = load(path);
    match cache.get(key) {
        None => true,
        Some(&last_checked) => now_unix() - last_checked >= min_interval_seconds as f64,
    }
}

/// Record that `key` was just checked, setting its timestamp to now.
pub fn update_last_checked(path: &std::path::Path, key: &str) {
    let mut cache = load(path);
    cache.insert(key.to_string(), now_unix());
    save(path, &cache);
}

/// Remove `key` from the cache (e.g. once a ChangeSpec has been Submitted).
pub fn clear(path: &std::path::Path, key: &str) {
    let mut cache = load(path);
    if cache.remove(key).is_some() {
        save(path, &cache);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_path() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync_cache.json");
        (dir, path)
    }

    #[test]
    fn never_checked_key_should_check() {
        let (_dir, path) = cache_path();
        assert!(should_check(&path, "my-change", 300));
    }

    #[test]
    fn recently_checked_key_should_not_check_again() {
        let (_dir, path) = cache_path();
        update_last_checked(&path, "my-change");
        assert!(!should_check(&path, "my-change", 300));
    }

    #[test]
    fn missing_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nonexistent").join("sync_cache.json");
        assert!(should_check(&missing, "anything", 300));
    }

    #[test]
    fn clear_removes_the_entry() {
        let (_dir, path) = cache_path();
        update_last_checked(&path, "my-change");
        assert!(!should_check(&path, "my-change", 300));
        clear(&path, "my-change");
        assert!(should_check(&path, "my-change", 300));
    }

    #[test]
    fn clearing_unknown_key_is_a_no_op() {
        let (_dir, path) = cache_path();
        clear(&path, "never-existed");
        assert!(!path.exists());
    }
}
