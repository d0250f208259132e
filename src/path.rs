use std::path::{Path, PathBuf};

/// Get the user's home directory.
///
/// Uses the `home` crate, which handles platform-specific detection
/// (`$HOME` on Unix, `USERPROFILE`/`HOMEDRIVE`+`HOMEPATH` on Windows).
pub fn home_dir() -> Option<PathBuf> {
    home::home_dir()
}

/// Format a filesystem path for user-facing output.
///
/// Replaces a home directory prefix with `~` (e.g. `/home/alex/gai` ->
/// `~/gai`). Paths outside home are returned unchanged.
pub fn format_path_for_display(path: &Path) -> String {
    if let Some(home) = home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }

        let mut display_path = PathBuf::from("~");
        display_path.push(stripped);
        return display_path.display().to_string();
    }

    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{format_path_for_display, home_dir};

    #[test]
    fn shortens_path_under_home() {
        let Some(home) = home_dir() else {
            return;
        };

        let path = home.join("projects").join("gai");
        let formatted = format_path_for_display(&path);

        assert!(formatted.starts_with("~"), "got {formatted}");
        assert!(formatted.contains("projects"));
        assert!(formatted.ends_with("gai"));
    }

    #[test]
    fn shows_home_as_tilde() {
        let Some(home) = home_dir() else {
            return;
        };
        assert_eq!(format_path_for_display(&home), "~");
    }

    #[test]
    fn leaves_non_home_paths_unchanged() {
        let path = PathBuf::from("/tmp/gai-non-home-path");
        assert_eq!(format_path_for_display(&path), path.display().to_string());
    }

    #[test]
    fn test_home_dir_returns_valid_path() {
        if let Some(home) = home_dir() {
            assert!(home.is_absolute());
            assert!(home.components().count() > 0);
        }
    }
}
