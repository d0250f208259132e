//! C12: the loop driver — two interleaved cadences run from `gai loop`.
//!
//! The hook cycle (default 10s) drives the hook scheduler (C7) plus
//! workflow completion polling (C8) for every known project. The status
//! cycle (default 300s) polls the review tool for syncable ChangeSpecs and
//! transitions their STATUS field. Both cadences share one thread: a hook
//! cycle or status cycle always runs to completion before the next starts.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::changespec::model::ChangeSpec;
use crate::cl_status::{has_pending_comments, is_cl_submitted, is_parent_submitted, SYNCABLE_STATUSES};
use crate::config::GaiConfig;
use crate::hooks::{run_hook_cycle, HookSchedulerConfig};
use crate::leaf_commands::LeafCommands;
use crate::suffix::get_base_status;

/// Signals the loop to stop after the in-flight cycle finishes. Checked
/// between cycles, never mid-cycle, so an in-flight subprocess is never
/// interrupted.
pub trait StopSignal {
    fn should_stop(&self) -> bool;
}

/// Always-false stop signal for callers that only want `Ctrl-C`/process-kill
/// semantics (the loop simply terminates with the process).
pub struct NeverStop;

impl StopSignal for NeverStop {
    fn should_stop(&self) -> bool {
        false
    }
}

fn all_project_files() -> Result<Vec<std::path::PathBuf>> {
    let projects_dir = crate::paths::projects_dir()?;
    let mut files = Vec::new();
    let entries = match std::fs::read_dir(&projects_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let project_name = entry.file_name().to_string_lossy().to_string();
        let spec_path = entry.path().join(format!("{project_name}.gp"));
        if spec_path.exists() {
            files.push(spec_path);
        }
    }
    Ok(files)
}

/// One hook cycle: a C7 sweep plus C8 completion polling, across every
/// project under `~/.gai/projects`. Returns human-readable messages for
/// the caller to log.
pub fn run_hook_cycle_once(config: &GaiConfig, leaf: &dyn LeafCommands) -> Result<Vec<String>> {
    let sync_cache_path = crate::paths::sync_cache_path()?;
    let hook_config = HookSchedulerConfig::from(config);
    let mut messages = Vec::new();

    for project_file in all_project_files()? {
        messages.extend(run_hook_cycle(&project_file, leaf, &sync_cache_path, &hook_config)?);
        messages.extend(crate::workflow::poll_crs_completions(&project_file, leaf)?);
        messages.extend(crate::workflow::poll_hook_workflow_completions(&project_file, leaf)?);
    }
    Ok(messages)
}

/// A syncable leaf ChangeSpec and the project file it lives in.
struct SyncCandidate {
    project_file: std::path::PathBuf,
    changespec: ChangeSpec,
}

fn syncable_leaf_candidates(all: &[ChangeSpec]) -> Vec<SyncCandidate> {
    all.iter()
        .filter(|cs| SYNCABLE_STATUSES.contains(&get_base_status(&cs.status).as_str()))
        .filter(|cs| is_parent_submitted(*cs, all))
        .map(|cs| SyncCandidate {
            project_file: std::path::PathBuf::from(&cs.file_path),
            changespec: (*cs).clone(),
        })
        .collect()
}

/// One status cycle: poll the review tool for every syncable leaf
/// ChangeSpec and transition `Mailed -> Submitted` / `Mailed <-> Changes
/// Requested` as warranted. `bypass_cache` is set on the loop's first
/// status cycle so the operator sees fresh state immediately on start.
pub fn run_status_cycle_once(
    config: &GaiConfig,
    leaf: &dyn LeafCommands,
    bypass_cache: bool,
) -> Result<Vec<String>> {
    let all = crate::project_spec::find_all_changespecs()?;
    let sync_cache_path = crate::paths::sync_cache_path()?;
    let mut messages = Vec::new();

    for candidate in syncable_leaf_candidates(&all) {
        let cs = &candidate.changespec;
        if !bypass_cache
            && !crate::sync_cache::should_check(
                &sync_cache_path,
                &cs.name,
                config.sync_check_min_interval_seconds,
            )
        {
            continue;
        }

        let base_status = get_base_status(&cs.status);
        let new_status = if is_cl_submitted(cs, leaf) {
            Some("Submitted")
        } else if base_status == "Mailed" && has_pending_comments(cs) {
            Some("Changes Requested")
        } else if base_status == "Changes Requested" && !has_pending_comments(cs) {
            Some("Mailed")
        } else {
            None
        };

        if let Some(new_status) = new_status {
            crate::cl_status::transition_changespec_status(&candidate.project_file, &cs.name, new_status)?;
            messages.push(format!("'{}' {base_status} -> {new_status}", cs.name));
        }

        if new_status == Some("Submitted") {
            crate::sync_cache::clear(&sync_cache_path, &cs.name);
        } else {
            crate::sync_cache::update_last_checked(&sync_cache_path, &cs.name);
        }
    }
    Ok(messages)
}

/// Run `gai loop` until `stop.should_stop()` returns true between cycles.
/// Never kills an in-flight subprocess on stop: the next start reconciles
/// whatever it finds.
pub fn run_loop(
    config: &GaiConfig,
    leaf: &dyn LeafCommands,
    stop: &dyn StopSignal,
    hook_interval: Duration,
    status_interval: Duration,
) -> Result<()> {
    let mut next_status_cycle_is_first = true;
    let mut last_status_cycle = Instant::now() - status_interval;

    loop {
        for message in run_hook_cycle_once(config, leaf)? {
            crate::trace::progress(&message);
        }

        if last_status_cycle.elapsed() >= status_interval {
            for message in run_status_cycle_once(config, leaf, next_status_cycle_is_first)? {
                crate::trace::progress(&message);
            }
            next_status_cycle_is_first = false;
            last_status_cycle = Instant::now();
        }

        if stop.should_stop() {
            return Ok(());
        }
        std::thread::sleep(hook_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syncable_leaf_candidates_filters_to_mailed_and_changes_requested() {
        let drafted = ChangeSpec {
            name: "a".into(),
            parent: None,
            status: "Drafted".into(),
            file_path: "x.gp".into(),
            ..ChangeSpec::default()
        };
        let mailed = ChangeSpec {
            name: "b".into(),
            parent: None,
            status: "Mailed".into(),
            file_path: "x.gp".into(),
            ..ChangeSpec::default()
        };
        let all = vec![drafted, mailed];
        let candidates = syncable_leaf_candidates(&all);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].changespec.name, "b");
    }

    #[test]
    fn syncable_leaf_candidates_excludes_child_of_undrafted_parent() {
        let parent = ChangeSpec {
            name: "parent".into(),
            parent: None,
            status: "Drafted".into(),
            file_path: "x.gp".into(),
            ..ChangeSpec::default()
        };
        let child = ChangeSpec {
            name: "child".into(),
            parent: Some("parent".into()),
            status: "Mailed".into(),
            file_path: "x.gp".into(),
            ..ChangeSpec::default()
        };
        let all = vec![parent, child];
        let candidates = syncable_leaf_candidates(&all);
        assert!(candidates.is_empty());
    }
}
