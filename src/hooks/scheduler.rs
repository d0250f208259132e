//! C7: the hook scheduler. One `run_hook_cycle` call is one scheduler tick
//! (the loop driver's hook cycle, default every 10s): for every ChangeSpec
//! with a HOOKS field, run the completion sweep, the zombie sweep, the
//! stale fix-hook sweep, and the start sweep, in that order, matching
//! `work/loop/core.py::LoopWorkflow._check_hooks`.

use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use anyhow::Result;

use crate::changespec::model::{ChangeSpec, HookStatusLine};
use crate::changespec::update::{
    update_changespec_add_hook_status_line, update_changespec_replace_hook_status_line,
};
use crate::config::GaiConfig;
use crate::leaf_commands::LeafCommands;
use crate::project_spec::{find_changespec, parse_project_spec, persist, ProjectSpec};
use crate::suffix::SuffixType;
use crate::workspace::LOOP_RANGE;

use super::state::{hook_needs_run, is_hook_zombie, is_suffix_stale, parse_completion};

/// The subset of [`GaiConfig`] the scheduler's sweeps need.
pub struct HookSchedulerConfig {
    pub zombie_threshold_seconds: i64,
    pub stale_fix_hook_threshold_seconds: i64,
    pub zombie_check_throttle_seconds: i64,
}

impl From<&GaiConfig> for HookSchedulerConfig {
    fn from(config: &GaiConfig) -> Self {
        Self {
            zombie_threshold_seconds: config.zombie_threshold_seconds,
            stale_fix_hook_threshold_seconds: config.stale_fix_hook_threshold_seconds,
            zombie_check_throttle_seconds: config.zombie_check_throttle_seconds,
        }
    }
}

/// One scheduler tick across every ChangeSpec in `project_file` that has a
/// HOOKS field. Returns a human-readable message per state change, in the
/// order they occurred (for the loop driver to log).
pub fn run_hook_cycle(
    project_file: &Path,
    leaf: &dyn LeafCommands,
    sync_cache_path: &Path,
    config: &HookSchedulerConfig,
) -> Result<Vec<String>> {
    let names: Vec<String> = parse_project_spec(project_file)?
        .changespecs
        .into_iter()
        .filter(|cs| cs.hooks.is_some())
        .map(|cs| cs.name)
        .collect();

    let mut messages = Vec::new();
    for name in names {
        messages.extend(process_changespec(project_file, &name, leaf, sync_cache_path, config)?);
    }
    Ok(messages)
}

fn zombie_cache_key(cs_name: &str) -> String {
    format!("zombie:{cs_name}")
}

fn current_entry_id(cs: &ChangeSpec) -> Option<String> {
    cs.commits.as_ref()?.last().map(|e| e.display_number())
}

fn process_changespec(
    project_file: &Path,
    name: &str,
    leaf: &dyn LeafCommands,
    sync_cache_path: &Path,
    config: &HookSchedulerConfig,
) -> Result<Vec<String>> {
    let mut messages = Vec::new();

    let should_check_zombie = crate::sync_cache::should_check(
        sync_cache_path,
        &zombie_cache_key(name),
        config.zombie_check_throttle_seconds,
    );
    if should_check_zombie {
        crate::sync_cache::update_last_checked(sync_cache_path, &zombie_cache_key(name));
    }

    run_sweeps(project_file, name, should_check_zombie, config, &mut messages)?;

    let project = parse_project_spec(project_file)?;
    let (_, cs) = find_changespec(&project, name)?;
    let base_status = crate::suffix::get_base_status(&cs.status);
    let is_terminal = base_status == "Reverted" || base_status == "Submitted";

    if !is_terminal {
        run_start_sweep(project_file, name, leaf, &mut messages)?;
    }

    release_if_idle(project_file, name)?;

    Ok(messages)
}

/// Phases 1a-1c: completion sweep, zombie sweep, stale fix-hook sweep.
/// Reads+writes the project once per actual state change.
fn run_sweeps(
    project_file: &Path,
    name: &str,
    should_check_zombie: bool,
    config: &HookSchedulerConfig,
    messages: &mut Vec<String>,
) -> Result<()> {
    let project = parse_project_spec(project_file)?;
    let (_, cs) = find_changespec(&project, name)?;
    let Some(hooks) = cs.hooks.clone() else {
        return Ok(());
    };

    let mut current = project;
    for hook in &hooks {
        if should_check_zombie
            && let Some(latest) = hook.latest_status_line()
            && is_suffix_stale(latest.suffix.as_deref(), config.stale_fix_hook_threshold_seconds)
        {
            let mut stale = latest.clone();
            stale.suffix = Some("Hook Command Failed".to_string());
            stale.suffix_type = Some(SuffixType::Error);
            current = update_changespec_replace_hook_status_line(
                &current,
                name,
                &hook.command,
                &latest.commit_entry_num,
                stale,
            )?;
            messages.push(format!(
                "Hook '{}' stale fix-hook marked as failed",
                hook.display_command()
            ));
        }

        for sl in &hook.status_lines {
            if sl.status != "RUNNING" {
                continue;
            }

            if should_check_zombie && is_hook_zombie(sl, config.zombie_threshold_seconds) {
                let killed = HookStatusLine {
                    status: "KILLED".to_string(),
                    ..sl.clone()
                };
                current = update_changespec_replace_hook_status_line(
                    &current,
                    name,
                    &hook.command,
                    &sl.commit_entry_num,
                    killed,
                )?;
                messages.push(format!("Hook '{}' marked as KILLED", hook.display_command()));
                continue;
            }

            if let Some(updated) = check_completion(name, sl)? {
                messages.push(format!(
                    "Hook '{}' -> {}{}",
                    hook.display_command(),
                    updated.status,
                    updated.duration.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
                ));
                current = update_changespec_replace_hook_status_line(
                    &current,
                    name,
                    &hook.command,
                    &sl.commit_entry_num,
                    updated,
                )?;
            }
        }
    }

    if !messages.is_empty() {
        persist(&current)?;
    }
    Ok(())
}

fn check_completion(cs_name: &str, sl: &HookStatusLine) -> Result<Option<HookStatusLine>> {
    let safe_name = crate::paths::sanitize_for_filename(cs_name);
    let output_path = crate::paths::hook_output_path(&safe_name, &sl.timestamp)?;
    if !output_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&output_path)?;
    let Some((status, duration)) = parse_completion(&content, &sl.timestamp) else {
        return Ok(None);
    };
    Ok(Some(HookStatusLine {
        status,
        duration: Some(duration),
        ..sl.clone()
    }))
}

/// Phase 2: start sweep. Claims a workspace, runs `bb_hg_update`, applies
/// a proposal's diff if the current entry is a proposal, and launches every
/// stale hook sequentially with a 1s gap between launches.
fn run_start_sweep(
    project_file: &Path,
    name: &str,
    leaf: &dyn LeafCommands,
    messages: &mut Vec<String>,
) -> Result<()> {
    let project = parse_project_spec(project_file)?;
    let (_, cs) = find_changespec(&project, name)?;
    let Some(hooks) = cs.hooks.clone() else { return Ok(()) };
    let Some(entry_id) = current_entry_id(cs) else {
        return Ok(());
    };
    let is_proposal = super::state::is_proposal_entry_id(&entry_id);

    let mut stale: Vec<_> = hooks
        .iter()
        .filter(|h| hook_needs_run(h, Some(entry_id.as_str())))
        .filter(|h| !(is_proposal && h.skip_fix_hook()))
        .cloned()
        .collect();
    if stale.is_empty() {
        return Ok(());
    }

    let tag = format!("loop(hooks)-{entry_id}");
    let workspace_num = match claim_or_reuse_workspace(&project, project_file, &tag, name)? {
        Some(num) => num,
        None => {
            messages.push(format!("Could not claim a workspace for '{name}' entry {entry_id}"));
            return Ok(());
        }
    };

    let project_basename = cs.project_basename();
    let workspace_dir = crate::workspace::workspace_directory(&project_basename, workspace_num)?;

    if let Err(err) = leaf.bb_hg_update(&workspace_dir, name) {
        crate::workspace::release_workspace(project_file, workspace_num, Some(&tag), Some(name))?;
        messages.push(format!("bb_hg_update failed for '{name}': {err}"));
        return Ok(());
    }

    if is_proposal
        && let Some(diff) = cs
            .commits
            .as_ref()
            .and_then(|commits| commits.iter().find(|c| c.display_number() == entry_id))
            .and_then(|c| c.diff.as_deref())
        && let Err(err) = leaf.hg_import_no_commit(&workspace_dir, diff)
    {
        crate::workspace::release_workspace(project_file, workspace_num, Some(&tag), Some(name))?;
        messages.push(format!("applying proposal diff failed for '{name}': {err}"));
        return Ok(());
    }

    stale.sort_by(|a, b| a.command.cmp(&b.command));
    for (i, hook) in stale.iter().enumerate() {
        if i > 0 {
            sleep(Duration::from_secs(1));
        }
        let timestamp = crate::timestamp::generate_timestamp();
        let safe_name = crate::paths::sanitize_for_filename(name);
        let output_path = crate::paths::hook_output_path(&safe_name, &timestamp)?;
        let wrapper_path = write_wrapper_script(hook.run_command())?;

        crate::process::spawn_detached(
            wrapper_path.to_string_lossy().as_ref(),
            &[],
            &workspace_dir,
            &output_path,
        )?;

        let status_line = HookStatusLine {
            commit_entry_num: entry_id.clone(),
            timestamp,
            status: "RUNNING".to_string(),
            duration: None,
            suffix: None,
            suffix_type: None,
            summary: None,
        };
        let current = parse_project_spec(project_file)?;
        let updated =
            update_changespec_add_hook_status_line(&current, name, &hook.command, status_line)?;
        persist(&updated)?;
        messages.push(format!("Hook '{}' started for entry {entry_id}", hook.display_command()));
    }

    Ok(())
}

fn claim_or_reuse_workspace(
    project: &ProjectSpec,
    project_file: &Path,
    tag: &str,
    cs_name: &str,
) -> Result<Option<u16>> {
    if let Some(existing) = project
        .running
        .iter()
        .find(|c| c.workflow == tag && c.cl_name.as_deref() == Some(cs_name))
    {
        return Ok(Some(existing.workspace_num));
    }

    crate::workspace::claim_first_available(
        project_file,
        LOOP_RANGE,
        tag,
        std::process::id(),
        Some(cs_name.to_string()),
        None,
        10,
    )
}

fn write_wrapper_script(command: &str) -> Result<std::path::PathBuf> {
    let script = format!(
        "#!/bin/bash\n\
         echo \"=== HOOK COMMAND ===\"\n\
         echo \"{command}\"\n\
         echo \"====================\"\n\
         echo \"\"\n\
         {command} 2>&1\n\
         exit_code=$?\n\
         echo \"\"\n\
         end_timestamp=$(TZ=\"America/New_York\" date +\"%y%m%d_%H%M%S\")\n\
         echo \"===HOOK_COMPLETE=== END_TIMESTAMP: $end_timestamp EXIT_CODE: $exit_code\"\n\
         exit $exit_code\n"
    );

    let mut file = tempfile::Builder::new().suffix(".sh").tempfile()?;
    use std::io::Write;
    file.write_all(script.as_bytes())?;
    let (_, path) = file.keep()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// Release every `loop(hooks)-*` claim for `name` once no hook is RUNNING.
fn release_if_idle(project_file: &Path, name: &str) -> Result<()> {
    let project = parse_project_spec(project_file)?;
    let (_, cs) = find_changespec(&project, name)?;
    let any_running = cs
        .hooks
        .as_ref()
        .is_some_and(|hooks| hooks.iter().any(super::state::hook_has_any_running_status));
    if any_running {
        return Ok(());
    }

    let to_release: Vec<u16> = project
        .running
        .iter()
        .filter(|c| c.workflow.starts_with("loop(hooks)-") && c.cl_name.as_deref() == Some(name))
        .map(|c| c.workspace_num)
        .collect();

    for num in to_release {
        crate::workspace::release_workspace(project_file, num, None, Some(name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf_commands::fake::FakeLeafCommands;

    fn write_project(dir: &std::path::Path, text: &str) -> std::path::PathBuf {
        let path = dir.join("test.gp");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn starts_a_stale_hook_and_appends_running_status_line() {
        let dir = tempfile::tempdir().unwrap();
        let gai_home = tempfile::tempdir().unwrap();

        temp_env::with_var("GAI_HOME", Some(gai_home.path()), || {
            let text = "\
NAME: my-change
STATUS: Drafted
COMMITS:
  (1) first commit
HOOKS:
  true
";
            let project_file = write_project(dir.path(), text);
            let sync_cache_path = gai_home.path().join("sync_cache.json");
            let config = HookSchedulerConfig {
                zombie_threshold_seconds: 86_400,
                stale_fix_hook_threshold_seconds: 3_600,
                zombie_check_throttle_seconds: 60,
            };
            let leaf = FakeLeafCommands::default();

            let messages = run_hook_cycle(&project_file, &leaf, &sync_cache_path, &config).unwrap();
            assert!(messages.iter().any(|m| m.contains("started")));
            assert_eq!(leaf.updates.lock().unwrap().len(), 1);

            let project = parse_project_spec(&project_file).unwrap();
            let cs = &project.changespecs[0];
            let hooks = cs.hooks.as_ref().unwrap();
            assert_eq!(hooks[0].status_lines.len(), 1);
            assert_eq!(hooks[0].status_lines[0].status, "RUNNING");
        });
    }

    #[test]
    fn terminal_status_does_not_start_new_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let gai_home = tempfile::tempdir().unwrap();

        temp_env::with_var("GAI_HOME", Some(gai_home.path()), || {
            let text = "\
NAME: my-change
STATUS: Submitted
COMMITS:
  (1) first commit
HOOKS:
  true
";
            let project_file = write_project(dir.path(), text);
            let sync_cache_path = gai_home.path().join("sync_cache.json");
            let config = HookSchedulerConfig {
                zombie_threshold_seconds: 86_400,
                stale_fix_hook_threshold_seconds: 3_600,
                zombie_check_throttle_seconds: 60,
            };
            let leaf = FakeLeafCommands::default();

            run_hook_cycle(&project_file, &leaf, &sync_cache_path, &config).unwrap();
            assert!(leaf.updates.lock().unwrap().is_empty());
        });
    }
}
