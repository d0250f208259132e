//! On-disk layout under `~/.gai/` (or `$GAI_HOME` in tests).
//!
//! ```text
//! ~/.gai/projects/<project>/<project>.gp
//! ~/.gai/projects/<project>/artifacts/<workflow>/<ts>/
//!      workflow_state.json, hitl_request.json, hitl_response.json, done.json
//! ~/.gai/projects/<project>/artifacts/ace-run/<ts>/done.json
//! ~/.gai/hooks/<safe_cs_name>_<ts>.txt
//! ~/.gai/workflows/<safe_cs_name>_<workflow>-<ts>.txt
//! ~/.gai/comments/<safe_cs_name>-<reviewer>-<ts>.json
//! ~/.gai/sync_cache.json
//! ~/.gai/tui/{viewed_agents,dismissed_agents,revived_agents}.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Root of the `.gai` tree.
///
/// Honors `GAI_HOME` so tests never touch a real home directory, mirroring
/// the teacher's `WORKTRUNK_CONFIG_PATH` test-isolation convention.
pub fn gai_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("GAI_HOME") {
        return Ok(PathBuf::from(dir));
    }

    let home = crate::path::home_dir().context("could not determine home directory")?;
    Ok(home.join(".gai"))
}

pub fn projects_dir() -> Result<PathBuf> {
    Ok(gai_home()?.join("projects"))
}

pub fn project_dir(project: &str) -> Result<PathBuf> {
    Ok(projects_dir()?.join(project))
}

pub fn project_spec_path(project: &str) -> Result<PathBuf> {
    Ok(project_dir(project)?.join(format!("{project}.gp")))
}

pub fn artifacts_dir(project: &str, workflow: &str, ts: &str) -> Result<PathBuf> {
    Ok(project_dir(project)?
        .join("artifacts")
        .join(workflow)
        .join(ts))
}

pub fn ace_run_dir(project: &str, ts: &str) -> Result<PathBuf> {
    Ok(project_dir(project)?
        .join("artifacts")
        .join("ace-run")
        .join(ts))
}

pub fn hooks_dir() -> Result<PathBuf> {
    Ok(gai_home()?.join("hooks"))
}

pub fn hook_output_path(safe_cs_name: &str, ts: &str) -> Result<PathBuf> {
    Ok(hooks_dir()?.join(format!("{safe_cs_name}_{ts}.txt")))
}

pub fn workflows_dir() -> Result<PathBuf> {
    Ok(gai_home()?.join("workflows"))
}

pub fn workflow_output_path(safe_cs_name: &str, workflow: &str, ts: &str) -> Result<PathBuf> {
    Ok(workflows_dir()?.join(format!("{safe_cs_name}_{workflow}-{ts}.txt")))
}

pub fn comments_dir() -> Result<PathBuf> {
    Ok(gai_home()?.join("comments"))
}

pub fn comment_entry_path(safe_cs_name: &str, reviewer: &str, ts: &str) -> Result<PathBuf> {
    Ok(comments_dir()?.join(format!("{safe_cs_name}-{reviewer}-{ts}.json")))
}

pub fn sync_cache_path() -> Result<PathBuf> {
    Ok(gai_home()?.join("sync_cache.json"))
}

pub fn tui_dir() -> Result<PathBuf> {
    Ok(gai_home()?.join("tui"))
}

pub fn viewed_agents_path() -> Result<PathBuf> {
    Ok(tui_dir()?.join("viewed_agents.json"))
}

pub fn dismissed_agents_path() -> Result<PathBuf> {
    Ok(tui_dir()?.join("dismissed_agents.json"))
}

pub fn revived_agents_path() -> Result<PathBuf> {
    Ok(tui_dir()?.join("revived_agents.json"))
}

const WINDOWS_ILLEGAL: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Sanitize a ChangeSpec (or other free-form) name for use as a filename
/// component.
///
/// Replaces path separators and Windows-illegal characters with `-`,
/// collapses runs of them, and appends a short content hash so that two
/// distinct names which collide after sanitization still produce distinct
/// files. Windows-reserved device stems (`CON`, `COM1`, ...) get a leading
/// `_` — note `COM0`/`LPT0` are *not* reserved and pass through unprefixed.
pub fn sanitize_for_filename(name: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut cleaned = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.chars() {
        let is_illegal = WINDOWS_ILLEGAL.contains(&ch) || ch.is_control();
        if is_illegal {
            if !last_was_dash {
                cleaned.push('-');
                last_was_dash = true;
            }
        } else {
            cleaned.push(ch);
            last_was_dash = false;
        }
    }
    let cleaned = cleaned.trim_matches('-');
    let cleaned = if cleaned.is_empty() { "untitled" } else { cleaned };

    let stem_upper = cleaned
        .split('.')
        .next()
        .unwrap_or(cleaned)
        .to_ascii_uppercase();
    let cleaned = if RESERVED_DEVICE_NAMES.contains(&stem_upper.as_str()) {
        format!("_{cleaned}")
    } else {
        cleaned.to_string()
    };

    if cleaned == name {
        return cleaned;
    }

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let short_hash = digest.iter().take(4).map(|b| format!("{b:02x}")).collect::<String>();
    format!("{cleaned}-{short_hash}")
}
