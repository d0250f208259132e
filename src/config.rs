//! User-level configuration: the cadences and thresholds the hook scheduler,
//! sync cache, and loop driver run on.
//!
//! Loaded from `~/.gai/config.toml` (or `$GAI_CONFIG_PATH` for tests) via the
//! `config` crate layered over `Self::default()`, mirroring the teacher's
//! `WorktrunkConfig::load` (`src/config.rs`): defaults first, then the file if
//! present, then `GAI_`-prefixed environment variables.

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All cadences/thresholds named in spec §4.2/§4.6/§4.7/§4.12, plus the two
/// directory overrides tests use to stay out of a real home directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GaiConfig {
    #[serde(default = "default_status_check_interval_seconds", rename = "status-check-interval-seconds")]
    pub status_check_interval_seconds: u64,

    #[serde(default = "default_hook_check_interval_seconds", rename = "hook-check-interval-seconds")]
    pub hook_check_interval_seconds: u64,

    #[serde(default = "default_zombie_threshold_seconds", rename = "zombie-threshold-seconds")]
    pub zombie_threshold_seconds: i64,

    #[serde(
        default = "default_stale_fix_hook_threshold_seconds",
        rename = "stale-fix-hook-threshold-seconds"
    )]
    pub stale_fix_hook_threshold_seconds: i64,

    #[serde(
        default = "default_stale_comment_threshold_seconds",
        rename = "stale-comment-threshold-seconds"
    )]
    pub stale_comment_threshold_seconds: i64,

    #[serde(
        default = "default_zombie_check_throttle_seconds",
        rename = "zombie-check-throttle-seconds"
    )]
    pub zombie_check_throttle_seconds: i64,

    #[serde(
        default = "default_sync_check_min_interval_seconds",
        rename = "sync-check-min-interval-seconds"
    )]
    pub sync_check_min_interval_seconds: i64,

    #[serde(default, rename = "workspace-root")]
    pub workspace_root: Option<String>,

    #[serde(default, rename = "gai-home")]
    pub gai_home: Option<String>,
}

fn default_status_check_interval_seconds() -> u64 {
    300
}
fn default_hook_check_interval_seconds() -> u64 {
    10
}
fn default_zombie_threshold_seconds() -> i64 {
    86_400
}
fn default_stale_fix_hook_threshold_seconds() -> i64 {
    3_600
}
fn default_stale_comment_threshold_seconds() -> i64 {
    7_200
}
fn default_zombie_check_throttle_seconds() -> i64 {
    60
}
fn default_sync_check_min_interval_seconds() -> i64 {
    300
}

impl Default for GaiConfig {
    fn default() -> Self {
        Self {
            status_check_interval_seconds: default_status_check_interval_seconds(),
            hook_check_interval_seconds: default_hook_check_interval_seconds(),
            zombie_threshold_seconds: default_zombie_threshold_seconds(),
            stale_fix_hook_threshold_seconds: default_stale_fix_hook_threshold_seconds(),
            stale_comment_threshold_seconds: default_stale_comment_threshold_seconds(),
            zombie_check_throttle_seconds: default_zombie_check_throttle_seconds(),
            sync_check_min_interval_seconds: default_sync_check_min_interval_seconds(),
            workspace_root: None,
            gai_home: None,
        }
    }
}

/// `$GAI_CONFIG_PATH` if set (test isolation), else `~/.gai/config.toml`.
/// A missing config file is not an error — it's just "use the defaults".
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("GAI_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    crate::paths::gai_home().ok().map(|home| home.join("config.toml"))
}

impl GaiConfig {
    /// Defaults, overridden by the config file (if present), overridden by
    /// `GAI_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_path().as_deref())
    }

    /// Same as [`Self::load`], but with an explicit config file path instead
    /// of consulting `$GAI_CONFIG_PATH`/`~/.gai`. Lets tests point at a
    /// scratch file directly rather than mutating process environment.
    pub fn load_from(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default(
                "status-check-interval-seconds",
                defaults.status_check_interval_seconds,
            )?
            .set_default(
                "hook-check-interval-seconds",
                defaults.hook_check_interval_seconds,
            )?
            .set_default("zombie-threshold-seconds", defaults.zombie_threshold_seconds)?
            .set_default(
                "stale-fix-hook-threshold-seconds",
                defaults.stale_fix_hook_threshold_seconds,
            )?
            .set_default(
                "stale-comment-threshold-seconds",
                defaults.stale_comment_threshold_seconds,
            )?
            .set_default(
                "zombie-check-throttle-seconds",
                defaults.zombie_check_throttle_seconds,
            )?
            .set_default(
                "sync-check-min-interval-seconds",
                defaults.sync_check_min_interval_seconds,
            )?;

        if let Some(path) = path
            && path.exists()
        {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("GAI").separator("_"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_thresholds() {
        let config = GaiConfig::default();
        assert_eq!(config.status_check_interval_seconds, 300);
        assert_eq!(config.hook_check_interval_seconds, 10);
        assert_eq!(config.zombie_threshold_seconds, 86_400);
        assert_eq!(config.stale_fix_hook_threshold_seconds, 3_600);
        assert_eq!(config.stale_comment_threshold_seconds, 7_200);
        assert_eq!(config.zombie_check_throttle_seconds, 60);
        assert_eq!(config.sync_check_min_interval_seconds, 300);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = GaiConfig::load_from(Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(loaded, GaiConfig::default());
    }

    #[test]
    fn config_file_overrides_a_single_setting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "hook-check-interval-seconds = 5\n").unwrap();

        let loaded = GaiConfig::load_from(Some(&path)).unwrap();

        assert_eq!(loaded.hook_check_interval_seconds, 5);
        assert_eq!(loaded.status_check_interval_seconds, 300);
    }
}
