//! The per-(hook, entry) state machine: sentinel parsing, zombie/stale
//! detection, and the `hook_needs_run` predicate.
//!
//! ```text
//! (absent) --start--> RUNNING --sentinel 0--> PASSED
//!                              \--sentinel != 0--> FAILED
//!                               \--age > threshold--> KILLED
//! ```
//! Terminal states never transition back.

use crate::changespec::model::{HookEntry, HookStatusLine};

pub const HOOK_COMPLETE_MARKER: &str = "===HOOK_COMPLETE=== END_TIMESTAMP: ";
pub const HOOK_COMPLETE_MARKER_LEGACY: &str = "===HOOK_COMPLETE=== EXIT_CODE: ";

pub fn is_proposal_entry_id(entry_id: &str) -> bool {
    entry_id.chars().last().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Whether `hook` needs a fresh run for `current_entry_id`: no status line
/// exists yet for that entry, and (for proposal entries) the hook isn't
/// `$`-prefixed.
pub fn hook_needs_run(hook: &HookEntry, current_entry_id: Option<&str>) -> bool {
    let Some(current_entry_id) = current_entry_id else {
        return false;
    };
    if hook.skip_proposal_runs() && is_proposal_entry_id(current_entry_id) {
        return false;
    }
    hook.status_line_for_commit_entry(current_entry_id).is_none()
}

pub fn hook_has_any_running_status(hook: &HookEntry) -> bool {
    hook.status_lines.iter().any(|sl| sl.status == "RUNNING")
}

pub fn is_hook_zombie(sl: &HookStatusLine, zombie_threshold_seconds: i64) -> bool {
    sl.status == "RUNNING"
        && crate::timestamp::age_seconds(&sl.timestamp)
            .is_some_and(|age| age > zombie_threshold_seconds)
}

/// Whether a `running_agent`-suffixed status line's embedded timestamp is
/// older than the fix-hook stale threshold — a fix-hook agent that started
/// but never completed (crashed, or was killed without cleanup).
pub fn is_suffix_stale(suffix: Option<&str>, stale_threshold_seconds: i64) -> bool {
    let Some(suffix) = suffix else { return false };
    let ts = suffix.rsplit('-').next().unwrap_or(suffix);
    crate::timestamp::age_seconds(ts).is_some_and(|age| age > stale_threshold_seconds)
}

/// Parsed result of a hook output file: `(status, duration)`. `None` means
/// the sentinel hasn't appeared yet — the hook is still running.
pub fn parse_completion(content: &str, start_timestamp: &str) -> Option<(String, String)> {
    let (after, has_end_timestamp) = if let Some(pos) = content.rfind(HOOK_COMPLETE_MARKER) {
        (&content[pos + HOOK_COMPLETE_MARKER.len()..], true)
    } else if let Some(pos) = content.rfind(HOOK_COMPLETE_MARKER_LEGACY) {
        (&content[pos + HOOK_COMPLETE_MARKER_LEGACY.len()..], false)
    } else {
        return None;
    };

    let rest = after.trim();
    let (exit_code, end_timestamp): (i32, Option<String>) = if has_end_timestamp {
        let mut parts = rest.split_whitespace();
        let end_ts = parts.next().map(str::to_string);
        let exit = parts.nth(1).and_then(|s| s.parse().ok());
        match (end_ts, exit) {
            (Some(ts), Some(code)) => (code, Some(ts)),
            _ => (1, None),
        }
    } else {
        let exit = rest.split_whitespace().next().and_then(|s| s.parse().ok()).unwrap_or(1);
        (exit, None)
    };

    let duration = end_timestamp
        .as_deref()
        .and_then(|end| {
            let start = crate::timestamp::parse_timestamp(start_timestamp)?;
            let end = crate::timestamp::parse_timestamp(end)?;
            Some(crate::timestamp::format_duration(end - start))
        })
        .or_else(|| {
            crate::timestamp::age_seconds(start_timestamp).map(crate::timestamp::format_duration)
        })
        .unwrap_or_else(|| "0s".to_string());

    let status = if exit_code == 0 { "PASSED" } else { "FAILED" };
    Some((status.to_string(), duration))
}
