//! C8: the workflow supervisor.
//!
//! A "workflow" is a background agent run against a whole ChangeSpec rather
//! than a single hook: CRS (addressing reviewer comments), fix-hook (healing
//! a FAILED hook), and summarize-hook (writing a human summary of a FAILED
//! hook's output). All three share one launch/poll/kill lifecycle; only the
//! runner command and the work item they attach to differ.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::changespec::model::{CommentEntry, HookStatusLine};
use crate::changespec::update::{
    update_changespec_accept_proposal, update_changespec_replace_hook_status_line,
    update_changespec_set_comment_suffix,
};
use crate::leaf_commands::LeafCommands;
use crate::project_spec::{find_changespec, parse_project_spec, persist};
use crate::suffix::SuffixType;
use crate::workspace::LOOP_RANGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum WorkflowKind {
    Crs,
    FixHook,
    SummarizeHook,
}

impl WorkflowKind {
    /// The external runner program this workflow invokes. Like hook
    /// commands, the actual agent implementation is a leaf program outside
    /// this crate's scope — only the launch/poll/kill lifecycle is ours.
    fn runner_command(self) -> &'static str {
        match self {
            WorkflowKind::Crs => "crs_workflow",
            WorkflowKind::FixHook => "fix_hook_workflow",
            WorkflowKind::SummarizeHook => "summarize_hook_workflow",
        }
    }

    /// summarize-hook only reads files; it never claims a workspace.
    fn needs_workspace(self) -> bool {
        !matches!(self, WorkflowKind::SummarizeHook)
    }

    fn claim_tag(self, detail: &str) -> String {
        match self {
            WorkflowKind::Crs => format!("loop(crs)-{detail}"),
            WorkflowKind::FixHook => format!("loop(fix-hook)-{detail}"),
            WorkflowKind::SummarizeHook => format!("loop(summarize-hook)-{detail}"),
        }
    }
}

pub const WORKFLOW_COMPLETE_MARKER: &str = "===WORKFLOW_COMPLETE=== PROPOSAL_ID: ";

/// Parsed `===WORKFLOW_COMPLETE=== PROPOSAL_ID: <id|None> EXIT_CODE: <n>`
/// sentinel: `(proposal_id, exit_code)`. `None` means the sentinel hasn't
/// appeared yet.
pub fn parse_workflow_completion(content: &str) -> Option<(Option<String>, i32)> {
    let pos = content.rfind(WORKFLOW_COMPLETE_MARKER)?;
    let rest = content[pos + WORKFLOW_COMPLETE_MARKER.len()..].trim();
    let mut parts = rest.split_whitespace();
    let proposal_id = parts.next()?;
    let exit_code = parts
        .position(|p| p == "EXIT_CODE:")
        .and_then(|_| parts.next())
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let proposal_id = (proposal_id != "None").then(|| proposal_id.to_string());
    Some((proposal_id, exit_code))
}

/// HITL request written by a paused workflow (`hitl_request.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct HitlRequest {
    pub step_name: String,
    pub step_type: String,
    pub output: String,
    pub has_output: bool,
}

/// HITL response the core writes back (`hitl_response.json`) so the
/// workflow can resume on its next read.
#[derive(Debug, Clone, Serialize)]
pub struct HitlResponse {
    pub action: String,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

pub fn read_hitl_request(artifacts_dir: &Path) -> Result<Option<HitlRequest>> {
    let path = artifacts_dir.join("hitl_request.json");
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn write_hitl_response(artifacts_dir: &Path, response: &HitlResponse) -> Result<()> {
    let path = artifacts_dir.join("hitl_response.json");
    crate::persist::write_json_atomic(&path, response)
}

/// Launch a CRS workflow against `reviewer`'s comment entry. Claims a
/// workspace, updates it to `cs_name`, sets a pending `running_agent`
/// suffix, spawns the runner, then rewrites the suffix with the real PID.
pub fn launch_crs_workflow(
    project_file: &Path,
    cs_name: &str,
    reviewer: &str,
    leaf: &dyn LeafCommands,
) -> Result<()> {
    let timestamp = crate::timestamp::generate_timestamp();
    launch(
        project_file,
        cs_name,
        WorkflowKind::Crs,
        reviewer,
        &timestamp,
        leaf,
        &[cs_name, reviewer],
        |project, pending_suffix| {
            update_changespec_set_comment_suffix(
                project,
                cs_name,
                reviewer,
                Some(pending_suffix.to_string()),
                Some(SuffixType::RunningAgent),
            )
        },
    )
}

/// Launch a fix-hook workflow against the latest FAILED status line of
/// `hook_command`.
pub fn launch_fix_hook_workflow(
    project_file: &Path,
    cs_name: &str,
    hook_command: &str,
    leaf: &dyn LeafCommands,
) -> Result<()> {
    let timestamp = crate::timestamp::generate_timestamp();
    let project = parse_project_spec(project_file)?;
    let (_, cs) = find_changespec(&project, cs_name)?;
    let Some(latest) = cs
        .hooks
        .as_ref()
        .and_then(|hooks| hooks.iter().find(|h| h.command == hook_command))
        .and_then(|h| h.latest_status_line())
        .cloned()
    else {
        anyhow::bail!("no status line for hook '{hook_command}' on '{cs_name}'");
    };

    launch(
        project_file,
        cs_name,
        WorkflowKind::FixHook,
        &timestamp,
        &timestamp,
        leaf,
        &[cs_name, hook_command],
        |project, pending_suffix| {
            let updated = HookStatusLine {
                suffix: Some(pending_suffix.to_string()),
                suffix_type: Some(SuffixType::RunningAgent),
                ..latest.clone()
            };
            update_changespec_replace_hook_status_line(
                project,
                cs_name,
                hook_command,
                &latest.commit_entry_num,
                updated,
            )
        },
    )
}

/// Launch a summarize-hook workflow. Unlike CRS/fix-hook this never claims
/// a workspace — it only reads the hook's output file.
pub fn launch_summarize_hook_workflow(
    project_file: &Path,
    cs_name: &str,
    hook_command: &str,
) -> Result<()> {
    let timestamp = crate::timestamp::generate_timestamp();
    let project = parse_project_spec(project_file)?;
    let (_, cs) = find_changespec(&project, cs_name)?;
    let Some(latest) = cs
        .hooks
        .as_ref()
        .and_then(|hooks| hooks.iter().find(|h| h.command == hook_command))
        .and_then(|h| h.latest_status_line())
        .cloned()
    else {
        anyhow::bail!("no status line for hook '{hook_command}' on '{cs_name}'");
    };

    let pending_suffix = format!("summarize-{timestamp}");
    let pending = HookStatusLine {
        suffix: Some(pending_suffix.clone()),
        suffix_type: Some(SuffixType::RunningAgent),
        ..latest.clone()
    };
    let updated_project = update_changespec_replace_hook_status_line(
        &project,
        cs_name,
        hook_command,
        &latest.commit_entry_num,
        pending,
    )?;
    persist(&updated_project)?;

    let safe_name = crate::paths::sanitize_for_filename(cs_name);
    let output_path = crate::paths::workflow_output_path(&safe_name, "summarize-hook", &timestamp)?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let pid = crate::process::spawn_detached(
        WorkflowKind::SummarizeHook.runner_command(),
        &[cs_name, hook_command],
        &cwd,
        &output_path,
    )?;

    let project = parse_project_spec(project_file)?;
    let real_suffix = format!("summarize-{pid}-{timestamp}");
    let with_pid = HookStatusLine {
        suffix: Some(real_suffix),
        suffix_type: Some(SuffixType::RunningAgent),
        ..latest.clone()
    };
    let updated_project = update_changespec_replace_hook_status_line(
        &project,
        cs_name,
        hook_command,
        &latest.commit_entry_num,
        with_pid,
    )?;
    persist(&updated_project)
}

/// Shared launch sequence for workspace-backed workflows (CRS, fix-hook):
/// claim, `bb_hg_update`, pending suffix, spawn, PID-embedded suffix.
/// `set_pending_suffix` applies the pending/final suffix update to whatever
/// work item (comment or hook status line) this workflow targets.
fn launch(
    project_file: &Path,
    cs_name: &str,
    kind: WorkflowKind,
    claim_detail: &str,
    timestamp: &str,
    leaf: &dyn LeafCommands,
    runner_args: &[&str],
    set_pending_suffix: impl Fn(
        &crate::project_spec::ProjectSpec,
        &str,
    ) -> Result<crate::project_spec::ProjectSpec>,
) -> Result<()> {
    let tag = kind.claim_tag(claim_detail);
    let workspace_num = if kind.needs_workspace() {
        crate::workspace::claim_first_available(
            project_file,
            LOOP_RANGE,
            &tag,
            std::process::id(),
            Some(cs_name.to_string()),
            None,
            10,
        )?
    } else {
        None
    };

    let workspace_dir = match workspace_num {
        Some(num) => {
            let project = parse_project_spec(project_file)?;
            let (_, cs) = find_changespec(&project, cs_name)?;
            let dir = crate::workspace::workspace_directory(&cs.project_basename(), num)?;
            if let Err(err) = leaf.bb_hg_update(&dir, cs_name) {
                crate::workspace::release_workspace(project_file, num, Some(&tag), Some(cs_name))?;
                return Err(err.context("bb_hg_update failed, workflow launch aborted"));
            }
            dir
        }
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    let pending_suffix = format!("{kind}-{timestamp}");
    let project = parse_project_spec(project_file)?;
    let updated = set_pending_suffix(&project, &pending_suffix)?;
    persist(&updated)?;

    let safe_name = crate::paths::sanitize_for_filename(cs_name);
    let output_path = crate::paths::workflow_output_path(&safe_name, &kind.to_string(), timestamp)?;
    let pid = match crate::process::spawn_detached(kind.runner_command(), runner_args, &workspace_dir, &output_path) {
        Ok(pid) => pid,
        Err(err) => {
            if let Some(num) = workspace_num {
                crate::workspace::release_workspace(project_file, num, Some(&tag), Some(cs_name))?;
            }
            return Err(err);
        }
    };

    let real_suffix = format!("{kind}-{pid}-{timestamp}");
    let project = parse_project_spec(project_file)?;
    let updated = set_pending_suffix(&project, &real_suffix)?;
    persist(&updated)
}

/// One poll of every running CRS workflow: scans COMMENTS entries with a
/// `running_agent` suffix, reads the matching output log, and on the
/// `===WORKFLOW_COMPLETE===` sentinel either auto-accepts the proposal or
/// marks the comment with a terminal failure suffix.
pub fn poll_crs_completions(project_file: &Path, leaf: &dyn LeafCommands) -> Result<Vec<String>> {
    let project = parse_project_spec(project_file)?;
    let mut messages = Vec::new();

    for cs in &project.changespecs {
        let Some(comments) = &cs.comments else { continue };
        for comment in comments {
            if comment.suffix_type != Some(SuffixType::RunningAgent) {
                continue;
            }
            let Some((ts, _pid)) = running_agent_ts_pid(comment.suffix.as_deref()) else {
                continue;
            };
            let safe_name = crate::paths::sanitize_for_filename(&cs.name);
            let output_path =
                crate::paths::workflow_output_path(&safe_name, &WorkflowKind::Crs.to_string(), &ts)?;
            if !output_path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&output_path)?;
            let Some((proposal_id, exit_code)) = parse_workflow_completion(&content) else {
                continue;
            };

            let current = parse_project_spec(project_file)?;
            match (exit_code, proposal_id) {
                (0, Some(proposal_id)) => {
                    if let Err(err) = accept_proposal(&current, project_file, cs, &proposal_id, leaf) {
                        messages.push(format!("CRS proposal accept failed for '{}': {err}", cs.name));
                        continue;
                    }
                    let cleared = update_changespec_set_comment_suffix(
                        &parse_project_spec(project_file)?,
                        &cs.name,
                        &comment.reviewer,
                        None,
                        None,
                    )?;
                    persist(&cleared)?;
                    messages.push(format!("CRS workflow accepted proposal {proposal_id} on '{}'", cs.name));
                    release_claim(project_file, &WorkflowKind::Crs.claim_tag(&comment.reviewer), &cs.name)?;
                }
                _ => {
                    let failed = update_changespec_set_comment_suffix(
                        &current,
                        &cs.name,
                        &comment.reviewer,
                        Some("Unresolved Critique Comments".to_string()),
                        Some(SuffixType::Error),
                    )?;
                    persist(&failed)?;
                    messages.push(format!("CRS workflow failed on '{}'", cs.name));
                    release_claim(project_file, &WorkflowKind::Crs.claim_tag(&comment.reviewer), &cs.name)?;
                }
            }
        }
    }
    Ok(messages)
}

/// One poll of every running fix-hook/summarize-hook workflow, driven off
/// HOOKS status lines carrying a `running_agent` suffix.
pub fn poll_hook_workflow_completions(project_file: &Path, leaf: &dyn LeafCommands) -> Result<Vec<String>> {
    let project = parse_project_spec(project_file)?;
    let mut messages = Vec::new();

    for cs in &project.changespecs {
        let Some(hooks) = &cs.hooks else { continue };
        for hook in hooks {
            for sl in &hook.status_lines {
                if sl.suffix_type != Some(SuffixType::RunningAgent) {
                    continue;
                }
                let is_summarize = sl.suffix.as_deref().is_some_and(|s| s.contains("summarize"));
                let kind = if is_summarize { WorkflowKind::SummarizeHook } else { WorkflowKind::FixHook };
                let Some((ts, _pid)) = running_agent_ts_pid(sl.suffix.as_deref()) else {
                    continue;
                };
                let safe_name = crate::paths::sanitize_for_filename(&cs.name);
                let output_path = crate::paths::workflow_output_path(&safe_name, &kind.to_string(), &ts)?;
                if !output_path.exists() {
                    continue;
                }
                let content = std::fs::read_to_string(&output_path)?;

                if kind == WorkflowKind::SummarizeHook {
                    let Some(summary) = content
                        .rfind("===SUMMARIZE_COMPLETE===")
                        .map(|pos| content[pos + "===SUMMARIZE_COMPLETE===".len()..].trim().to_string())
                    else {
                        continue;
                    };
                    let current = parse_project_spec(project_file)?;
                    let cleared = HookStatusLine {
                        suffix: Some(summary.clone()),
                        suffix_type: Some(SuffixType::SummarizeComplete),
                        summary: Some(summary),
                        ..sl.clone()
                    };
                    let updated = update_changespec_replace_hook_status_line(
                        &current,
                        &cs.name,
                        &hook.command,
                        &sl.commit_entry_num,
                        cleared,
                    )?;
                    persist(&updated)?;
                    messages.push(format!("summarize-hook completed on '{}'", cs.name));
                    continue;
                }

                let Some((proposal_id, exit_code)) = parse_workflow_completion(&content) else {
                    continue;
                };
                let current = parse_project_spec(project_file)?;
                match (exit_code, proposal_id) {
                    (0, Some(proposal_id)) => {
                        if let Err(err) = accept_proposal(&current, project_file, cs, &proposal_id, leaf) {
                            messages.push(format!("fix-hook proposal accept failed for '{}': {err}", cs.name));
                            continue;
                        }
                        let cleared = HookStatusLine {
                            suffix: None,
                            suffix_type: None,
                            ..sl.clone()
                        };
                        let updated = update_changespec_replace_hook_status_line(
                            &parse_project_spec(project_file)?,
                            &cs.name,
                            &hook.command,
                            &sl.commit_entry_num,
                            cleared,
                        )?;
                        persist(&updated)?;
                        messages.push(format!("fix-hook accepted proposal {proposal_id} on '{}'", cs.name));
                        release_claim(project_file, &WorkflowKind::FixHook.claim_tag(&ts), &cs.name)?;
                    }
                    _ => {
                        let failed = HookStatusLine {
                            suffix: Some("Hook Command Failed".to_string()),
                            suffix_type: Some(SuffixType::Error),
                            ..sl.clone()
                        };
                        let updated = update_changespec_replace_hook_status_line(
                            &current,
                            &cs.name,
                            &hook.command,
                            &sl.commit_entry_num,
                            failed,
                        )?;
                        persist(&updated)?;
                        messages.push(format!("fix-hook workflow failed on '{}'", cs.name));
                        release_claim(project_file, &WorkflowKind::FixHook.claim_tag(&ts), &cs.name)?;
                    }
                }
            }
        }
    }
    Ok(messages)
}

fn accept_proposal(
    current: &crate::project_spec::ProjectSpec,
    project_file: &Path,
    cs: &crate::changespec::model::ChangeSpec,
    proposal_id: &str,
    leaf: &dyn LeafCommands,
) -> Result<()> {
    let (_, cs_now) = find_changespec(current, &cs.name)?;
    let Some(diff) = cs_now
        .commits
        .as_ref()
        .and_then(|commits| commits.iter().find(|c| c.display_number() == proposal_id))
        .and_then(|c| c.diff.clone())
    else {
        anyhow::bail!("proposal '{proposal_id}' has no diff on '{}'", cs.name);
    };

    if let Some(claim) = current.running.iter().find(|c| c.cl_name.as_deref() == Some(cs.name.as_str())) {
        let workspace_dir = crate::workspace::workspace_directory(&cs.project_basename(), claim.workspace_num)?;
        leaf.hg_import_no_commit(&workspace_dir, &diff)?;
        leaf.bb_hg_amend(&workspace_dir)?;
    }

    let updated = update_changespec_accept_proposal(current, &cs.name, proposal_id)?;
    persist(&updated)?;
    let _ = project_file;
    Ok(())
}

fn release_claim(project_file: &Path, tag: &str, cs_name: &str) -> Result<()> {
    let project = parse_project_spec(project_file)?;
    if let Some(claim) = project.running.iter().find(|c| c.workflow == *tag && c.cl_name.as_deref() == Some(cs_name)) {
        crate::workspace::release_workspace(project_file, claim.workspace_num, Some(tag), Some(cs_name))?;
    }
    Ok(())
}

/// `SIGTERM`s the agent's process group, rewrites its suffix to
/// `killed_agent`, and releases its workspace claim (if any).
pub fn kill_comment_agent(project_file: &Path, cs_name: &str, comment: &CommentEntry) -> Result<()> {
    let Some(pid) = crate::suffix::extract_pid_from_agent_suffix(comment.suffix.as_deref()) else {
        anyhow::bail!("comment agent suffix has no embedded PID, cannot kill");
    };
    crate::process::kill_process_group(pid)?;

    let project = parse_project_spec(project_file)?;
    let updated = update_changespec_set_comment_suffix(
        &project,
        cs_name,
        &comment.reviewer,
        Some(String::new()),
        Some(SuffixType::KilledAgent),
    )?;
    persist(&updated)?;
    release_claim(project_file, &WorkflowKind::Crs.claim_tag(&comment.reviewer), cs_name)
}

/// Parse `<ts>` and `<pid>` out of a `<kind>-<pid>-<ts>` or `<kind>-<ts>`
/// running-agent suffix.
fn running_agent_ts_pid(suffix: Option<&str>) -> Option<(String, Option<u32>)> {
    let suffix = suffix?;
    let parts: Vec<&str> = suffix.split('-').collect();
    match parts.as_slice() {
        [.., pid, ts] if pid.chars().all(|c| c.is_ascii_digit()) && !pid.is_empty() => {
            Some((ts.to_string(), pid.parse().ok()))
        }
        [.., ts] => Some((ts.to_string(), None)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf_commands::fake::FakeLeafCommands;

    fn write_project(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("test.gp");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn parses_workflow_complete_sentinel_with_proposal() {
        let content = "agent output\n===WORKFLOW_COMPLETE=== PROPOSAL_ID: 2a EXIT_CODE: 0\n";
        let (proposal_id, exit_code) = parse_workflow_completion(content).unwrap();
        assert_eq!(proposal_id.as_deref(), Some("2a"));
        assert_eq!(exit_code, 0);
    }

    #[test]
    fn parses_workflow_complete_sentinel_with_no_proposal() {
        let content = "===WORKFLOW_COMPLETE=== PROPOSAL_ID: None EXIT_CODE: 1\n";
        let (proposal_id, exit_code) = parse_workflow_completion(content).unwrap();
        assert!(proposal_id.is_none());
        assert_eq!(exit_code, 1);
    }

    #[test]
    fn missing_sentinel_is_none() {
        assert!(parse_workflow_completion("still running\n").is_none());
    }

    #[test]
    fn running_agent_ts_pid_parses_both_shapes() {
        assert_eq!(
            running_agent_ts_pid(Some("crs-123-250101_120000")),
            Some(("250101_120000".to_string(), Some(123)))
        );
        assert_eq!(
            running_agent_ts_pid(Some("crs-250101_120000")),
            Some(("250101_120000".to_string(), None))
        );
        assert_eq!(running_agent_ts_pid(None), None);
    }

    #[test]
    fn launch_crs_workflow_claims_workspace_and_sets_pending_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let gai_home = tempfile::tempdir().unwrap();

        temp_env::with_var("GAI_HOME", Some(gai_home.path()), || {
            let text = "\
NAME: my-change
STATUS: Mailed
COMMENTS:
  [critique] ~/.gai/comments/my-change-critique-250101_120000.json
";
            let project_file = write_project(dir.path(), text);
            let leaf = FakeLeafCommands::default();

            launch_crs_workflow(&project_file, "my-change", "critique", &leaf).unwrap();

            assert_eq!(leaf.updates.lock().unwrap().len(), 1);
            let project = parse_project_spec(&project_file).unwrap();
            assert_eq!(project.running.len(), 1);
            let comment = &project.changespecs[0].comments.as_ref().unwrap()[0];
            assert_eq!(comment.suffix_type, Some(SuffixType::RunningAgent));
            assert!(comment.suffix.as_deref().unwrap().starts_with("crs-"));
        });
    }

    #[test]
    fn kill_comment_agent_requires_embedded_pid() {
        let comment = CommentEntry {
            reviewer: "critique".into(),
            file_path: "x.json".into(),
            suffix: Some("crs-250101_120000".into()),
            suffix_type: Some(SuffixType::RunningAgent),
        };
        let dir = tempfile::tempdir().unwrap();
        let project_file = write_project(dir.path(), "NAME: a\nSTATUS: Mailed\n");
        assert!(kill_comment_agent(&project_file, "a", &comment).is_err());
    }
}
