//! C9: the agent loader — aggregates a flat `Vec<Agent>` from every source
//! a ChangeSpec/ProjectSpec tree can carry a running background process in.
//!
//! Five sources, in order: RUNNING claims, HOOKS `running_agent` suffixes,
//! MENTORS `running_agent` suffixes, COMMENTS `running_agent` suffixes, and
//! `workflow_state.json` files (each contributing one `Workflow` agent plus
//! a synthetic child agent per in-flight step). Dead-PID entries are
//! dropped, and the result is sorted start-time descending with
//! timestamp-less agents pushed to the end.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::changespec::model::ChangeSpec;
use crate::suffix::extract_pid_from_agent_suffix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    Running,
    FixHook,
    Summarize,
    Mentor,
    Crs,
    Workflow,
}

/// The `(agent_type, cl_name, raw_suffix)` triple used for stable
/// cross-refresh selection and for the viewed/dismissed/revived persistent
/// sets.
pub type AgentIdentity = (AgentType, String, Option<String>);

#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub agent_type: AgentType,
    pub cl_name: String,
    pub project_file: String,
    pub status: String,
    pub start_time: Option<NaiveDateTime>,

    pub workspace_num: Option<u16>,
    pub workflow: Option<String>,
    pub hook_command: Option<String>,
    pub commit_entry_id: Option<String>,
    pub mentor_profile: Option<String>,
    pub mentor_name: Option<String>,
    pub reviewer: Option<String>,

    /// Name of the in-flight workflow step this agent represents, for
    /// synthetic `Workflow` child agents loaded from `workflow_state.json`.
    /// `None` for the workflow's own top-level agent and for every other
    /// agent type.
    pub step_name: Option<String>,

    pub pid: Option<u32>,
    pub raw_suffix: Option<String>,
}

impl Agent {
    pub fn identity(&self) -> AgentIdentity {
        (self.agent_type, self.cl_name.clone(), self.raw_suffix.clone())
    }

    pub fn display_label(&self) -> String {
        match &self.step_name {
            Some(step) => format!("[{}] {} / {step}", self.agent_type, self.cl_name),
            None => format!("[{}] {}", self.agent_type, self.cl_name),
        }
    }
}

/// Parse a start time out of an agent suffix. Supported shapes:
/// `<agent>-<PID>-YYmmdd_HHMMSS`, `<agent>-YYmmdd_HHMMSS`, bare
/// `YYmmdd_HHMMSS`.
fn parse_timestamp_from_suffix(suffix: Option<&str>) -> Option<NaiveDateTime> {
    let suffix = suffix?;
    let ts = if suffix.contains('-') {
        suffix.rsplit('-').next()?
    } else {
        suffix
    };
    if ts.len() == 13 && ts.as_bytes().get(6) == Some(&b'_') {
        NaiveDateTime::parse_from_str(ts, "%y%m%d_%H%M%S").ok()
    } else {
        None
    }
}

fn load_from_running_field(project_files: &[std::path::PathBuf]) -> anyhow::Result<Vec<Agent>> {
    let mut agents = Vec::new();
    for project_file in project_files {
        let claims = crate::workspace::get_claimed(project_file)?;
        for claim in claims {
            agents.push(Agent {
                agent_type: AgentType::Running,
                cl_name: claim.cl_name.unwrap_or_else(|| "unknown".to_string()),
                project_file: project_file.display().to_string(),
                status: "RUNNING".to_string(),
                start_time: None,
                workspace_num: Some(claim.workspace_num),
                workflow: Some(claim.workflow),
                hook_command: None,
                commit_entry_id: None,
                mentor_profile: None,
                mentor_name: None,
                reviewer: None,
                step_name: None,
                pid: Some(claim.pid),
                raw_suffix: claim.artifacts_timestamp,
            });
        }
    }
    Ok(agents)
}

fn load_from_hooks(cs: &ChangeSpec) -> Vec<Agent> {
    let Some(hooks) = &cs.hooks else { return Vec::new() };
    let mut agents = Vec::new();
    for hook in hooks {
        for sl in &hook.status_lines {
            if sl.suffix_type != Some(crate::suffix::SuffixType::RunningAgent) {
                continue;
            }
            let agent_type = match sl.suffix.as_deref() {
                Some(s) if s.to_lowercase().contains("summarize") => AgentType::Summarize,
                _ => AgentType::FixHook,
            };
            agents.push(Agent {
                agent_type,
                cl_name: cs.name.clone(),
                project_file: cs.file_path.clone(),
                status: sl.status.clone(),
                start_time: parse_timestamp_from_suffix(sl.suffix.as_deref()),
                workspace_num: None,
                workflow: None,
                hook_command: Some(hook.display_command().to_string()),
                commit_entry_id: Some(sl.commit_entry_num.clone()),
                mentor_profile: None,
                mentor_name: None,
                reviewer: None,
                step_name: None,
                pid: extract_pid_from_agent_suffix(sl.suffix.as_deref()),
                raw_suffix: sl.suffix.clone(),
            });
        }
    }
    agents
}

fn load_from_mentors(cs: &ChangeSpec) -> Vec<Agent> {
    let Some(mentors) = &cs.mentors else { return Vec::new() };
    let mut agents = Vec::new();
    for mentor_entry in mentors {
        for msl in &mentor_entry.status_lines {
            if msl.suffix_type.as_deref() != Some("running_agent") {
                continue;
            }
            agents.push(Agent {
                agent_type: AgentType::Mentor,
                cl_name: cs.name.clone(),
                project_file: cs.file_path.clone(),
                status: msl.status.clone(),
                start_time: parse_timestamp_from_suffix(msl.suffix.as_deref()),
                workspace_num: None,
                workflow: None,
                hook_command: None,
                commit_entry_id: Some(mentor_entry.entry_id.clone()),
                mentor_profile: Some(msl.profile_name.clone()),
                mentor_name: Some(msl.mentor_name.clone()),
                reviewer: None,
                step_name: None,
                pid: extract_pid_from_agent_suffix(msl.suffix.as_deref()),
                raw_suffix: msl.suffix.clone(),
            });
        }
    }
    agents
}

fn load_from_comments(cs: &ChangeSpec) -> Vec<Agent> {
    let Some(comments) = &cs.comments else { return Vec::new() };
    comments
        .iter()
        .filter(|c| c.suffix_type == Some(crate::suffix::SuffixType::RunningAgent))
        .map(|c| Agent {
            agent_type: AgentType::Crs,
            cl_name: cs.name.clone(),
            project_file: cs.file_path.clone(),
            status: "RUNNING".to_string(),
            start_time: parse_timestamp_from_suffix(c.suffix.as_deref()),
            workspace_num: None,
            workflow: None,
            hook_command: None,
            commit_entry_id: None,
            mentor_profile: None,
            mentor_name: None,
            reviewer: Some(c.reviewer.clone()),
            step_name: None,
            pid: extract_pid_from_agent_suffix(c.suffix.as_deref()),
            raw_suffix: c.suffix.clone(),
        })
        .collect()
}

fn all_project_files() -> anyhow::Result<Vec<std::path::PathBuf>> {
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

fn all_project_names() -> anyhow::Result<Vec<String>> {
    let projects_dir = crate::paths::projects_dir()?;
    let mut names = Vec::new();
    let entries = match std::fs::read_dir(&projects_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    Ok(names)
}

/// The on-disk shape of `workflow_state.json`, written by the external
/// workflow runner as it progresses through its steps.
#[derive(Debug, Clone, Deserialize)]
struct WorkflowState {
    #[serde(default)]
    cl_name: Option<String>,
    #[serde(default)]
    steps: Vec<WorkflowStepState>,
}

#[derive(Debug, Clone, Deserialize)]
struct WorkflowStepState {
    name: String,
    status: String,
}

/// Steps in one of these states are still "doing something" and surface as
/// a synthetic child agent; everything else (`passed`, `skipped`, ...) is
/// quiescent and dropped.
fn step_is_live(status: &str) -> bool {
    matches!(status, "in_progress" | "waiting_hitl" | "failed")
}

/// Walk `~/.gai/projects/<project>/artifacts/<workflow>/<ts>/workflow_state.json`
/// for every project, producing one `Workflow` agent per file plus a
/// synthetic child agent per live step.
fn load_from_workflow_state() -> anyhow::Result<Vec<Agent>> {
    let mut agents = Vec::new();
    for project_name in all_project_names()? {
        let artifacts_root = crate::paths::project_dir(&project_name)?.join("artifacts");
        let Ok(workflow_dirs) = std::fs::read_dir(&artifacts_root) else { continue };
        for workflow_entry in workflow_dirs.flatten() {
            if !workflow_entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let workflow_name = workflow_entry.file_name().to_string_lossy().to_string();
            let Ok(ts_dirs) = std::fs::read_dir(workflow_entry.path()) else { continue };
            for ts_entry in ts_dirs.flatten() {
                if !ts_entry.file_type().is_ok_and(|t| t.is_dir()) {
                    continue;
                }
                let ts = ts_entry.file_name().to_string_lossy().to_string();
                let state_path = ts_entry.path().join("workflow_state.json");
                let Ok(content) = std::fs::read_to_string(&state_path) else { continue };
                let Ok(state) = serde_json::from_str::<WorkflowState>(&content) else { continue };

                let cl_name = state.cl_name.clone().unwrap_or_else(|| workflow_name.clone());
                let start_time = parse_timestamp_from_suffix(Some(&ts));

                agents.push(Agent {
                    agent_type: AgentType::Workflow,
                    cl_name: cl_name.clone(),
                    project_file: project_name.clone(),
                    status: "RUNNING".to_string(),
                    start_time,
                    workspace_num: None,
                    workflow: Some(workflow_name.clone()),
                    hook_command: None,
                    commit_entry_id: None,
                    mentor_profile: None,
                    mentor_name: None,
                    reviewer: None,
                    step_name: None,
                    pid: None,
                    raw_suffix: Some(ts.clone()),
                });

                for step in state.steps.iter().filter(|s| step_is_live(&s.status)) {
                    agents.push(Agent {
                        agent_type: AgentType::Workflow,
                        cl_name: cl_name.clone(),
                        project_file: project_name.clone(),
                        status: step.status.clone(),
                        start_time,
                        workspace_num: None,
                        workflow: Some(workflow_name.clone()),
                        hook_command: None,
                        commit_entry_id: None,
                        mentor_profile: None,
                        mentor_name: None,
                        reviewer: None,
                        step_name: Some(step.name.clone()),
                        pid: None,
                        raw_suffix: Some(format!("{workflow_name}-{ts}-{}", step.name)),
                    });
                }
            }
        }
    }
    Ok(agents)
}

/// Whether a PID is a live process: a zero-signal `kill` probe on Unix.
#[cfg(unix)]
fn is_process_running(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn is_process_running(_pid: u32) -> bool {
    true
}

/// Aggregate every currently-running agent across all projects, drop
/// entries whose PID is no longer alive, and sort start-time descending
/// (agents with no start time sort last).
pub fn load_all_agents() -> anyhow::Result<Vec<Agent>> {
    let project_files = all_project_files()?;
    let mut agents = load_from_running_field(&project_files)?;

    let all_changespecs = crate::project_spec::find_all_changespecs()?;
    for cs in &all_changespecs {
        agents.extend(load_from_hooks(cs));
        agents.extend(load_from_mentors(cs));
        agents.extend(load_from_comments(cs));
    }

    agents.extend(load_from_workflow_state()?);

    agents.retain(|a| a.pid.is_none_or(is_process_running));

    let (mut with_time, without_time): (Vec<_>, Vec<_>) =
        agents.into_iter().partition(|a| a.start_time.is_some());
    with_time.sort_by_key(|a| std::cmp::Reverse(a.start_time));

    with_time.extend(without_time);
    Ok(with_time)
}

/// Read one of the viewed/dismissed/revived identity sets, treating a
/// missing file as empty.
fn load_identity_set(path: &Path) -> anyhow::Result<HashSet<AgentIdentity>> {
    crate::persist::read_json_or_default(path)
}

fn save_identity_set(path: &Path, set: &HashSet<AgentIdentity>) -> anyhow::Result<()> {
    crate::persist::write_json_atomic(path, set)
}

/// Add `identity` to the persistent set at `path` (viewed/dismissed/revived).
fn mark_in_set(path: &Path, identity: AgentIdentity) -> anyhow::Result<()> {
    let mut set = load_identity_set(path)?;
    set.insert(identity);
    save_identity_set(path, &set)
}

/// Remove `identity` from the persistent set at `path`.
fn unmark_in_set(path: &Path, identity: &AgentIdentity) -> anyhow::Result<()> {
    let mut set = load_identity_set(path)?;
    if set.remove(identity) {
        save_identity_set(path, &set)?;
    }
    Ok(())
}

pub fn viewed_identities() -> anyhow::Result<HashSet<AgentIdentity>> {
    load_identity_set(&crate::paths::viewed_agents_path()?)
}

pub fn mark_viewed(identity: AgentIdentity) -> anyhow::Result<()> {
    mark_in_set(&crate::paths::viewed_agents_path()?, identity)
}

pub fn dismissed_identities() -> anyhow::Result<HashSet<AgentIdentity>> {
    load_identity_set(&crate::paths::dismissed_agents_path()?)
}

pub fn mark_dismissed(identity: AgentIdentity) -> anyhow::Result<()> {
    mark_in_set(&crate::paths::dismissed_agents_path()?, identity)
}

pub fn revived_identities() -> anyhow::Result<HashSet<AgentIdentity>> {
    load_identity_set(&crate::paths::revived_agents_path()?)
}

/// Reviving an agent un-dismisses it and records the identity so a future
/// dismiss-sweep doesn't immediately re-hide it before the caller acts on
/// the fresh state.
pub fn mark_revived(identity: AgentIdentity) -> anyhow::Result<()> {
    unmark_in_set(&crate::paths::dismissed_agents_path()?, &identity)?;
    mark_in_set(&crate::paths::revived_agents_path()?, identity)
}

/// Filter out agents whose identity is in the dismissed set but not (yet)
/// re-added to the revived set.
pub fn apply_dismissals(agents: Vec<Agent>) -> anyhow::Result<Vec<Agent>> {
    let dismissed = dismissed_identities()?;
    let revived = revived_identities()?;
    Ok(agents
        .into_iter()
        .filter(|a| {
            let id = a.identity();
            !dismissed.contains(&id) || revived.contains(&id)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changespec::parse::parse_changespecs;

    fn parse_one(text: &str) -> ChangeSpec {
        parse_changespecs(text, "test.gp").remove(0)
    }

    #[test]
    fn parses_new_and_legacy_suffix_timestamp_shapes() {
        assert!(parse_timestamp_from_suffix(Some("fix_hook-12345-250101_120000")).is_some());
        assert!(parse_timestamp_from_suffix(Some("fix_hook-250101_120000")).is_some());
        assert!(parse_timestamp_from_suffix(Some("250101_120000")).is_some());
        assert!(parse_timestamp_from_suffix(Some("not-a-timestamp")).is_none());
        assert!(parse_timestamp_from_suffix(None).is_none());
    }

    #[test]
    fn load_from_hooks_distinguishes_fix_hook_from_summarize() {
        let text = "\
NAME: a
STATUS: Drafted
HOOKS:
  check
      | (1) [250101_120000] RUNNING - (@: fix_hook-123-250101_120000)
      | (2) [250101_130000] RUNNING - (@: summarize-250101_130000)
";
        let cs = parse_one(text);
        let agents = load_from_hooks(&cs);
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].agent_type, AgentType::FixHook);
        assert_eq!(agents[1].agent_type, AgentType::Summarize);
    }

    #[test]
    fn load_from_comments_only_includes_running_agent_suffix() {
        let text = "\
NAME: a
STATUS: Mailed
COMMENTS:
  [critique] ~/.gai/comments/a-critique-250101_120000.json - (@: crs-250101_120000)
  [author] ~/.gai/comments/a-author-250101_120000.json - (!: Unresolved Critique Comments)
";
        let cs = parse_one(text);
        let agents = load_from_comments(&cs);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].reviewer.as_deref(), Some("critique"));
    }

    #[test]
    fn identity_is_stable_across_reloads() {
        let a = Agent {
            agent_type: AgentType::Crs,
            cl_name: "my-change".into(),
            project_file: "x.gp".into(),
            status: "RUNNING".into(),
            start_time: None,
            workspace_num: None,
            workflow: None,
            hook_command: None,
            commit_entry_id: None,
            mentor_profile: None,
            mentor_name: None,
            reviewer: Some("critique".into()),
            step_name: None,
            pid: None,
            raw_suffix: Some("crs-250101_120000".into()),
        };
        let b = a.clone();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn step_is_live_matches_only_in_flight_statuses() {
        assert!(step_is_live("in_progress"));
        assert!(step_is_live("waiting_hitl"));
        assert!(step_is_live("failed"));
        assert!(!step_is_live("passed"));
        assert!(!step_is_live("skipped"));
    }

    #[test]
    fn load_from_workflow_state_emits_parent_and_live_children() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var("GAI_HOME", Some(dir.path()), || {
            let ts_dir = crate::paths::project_dir("proj")
                .unwrap()
                .join("artifacts")
                .join("crs")
                .join("250101_120000");
            std::fs::create_dir_all(&ts_dir).unwrap();
            std::fs::write(
                ts_dir.join("workflow_state.json"),
                r#"{"cl_name": "my-change", "steps": [
                    {"name": "plan", "status": "passed"},
                    {"name": "apply", "status": "in_progress"}
                ]}"#,
            )
            .unwrap();

            let agents = load_from_workflow_state().unwrap();
            assert_eq!(agents.len(), 2);
            assert!(agents.iter().any(|a| a.step_name.is_none() && a.cl_name == "my-change"));
            assert!(agents
                .iter()
                .any(|a| a.step_name.as_deref() == Some("apply") && a.status == "in_progress"));
        });
    }

    #[test]
    fn identity_sets_round_trip_through_mark_and_load() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var("GAI_HOME", Some(dir.path()), || {
            let identity: AgentIdentity = (AgentType::Crs, "my-change".into(), Some("crs-1".into()));
            mark_dismissed(identity.clone()).unwrap();
            assert!(dismissed_identities().unwrap().contains(&identity));

            mark_revived(identity.clone()).unwrap();
            assert!(!dismissed_identities().unwrap().contains(&identity));
            assert!(revived_identities().unwrap().contains(&identity));
        });
    }

    #[test]
    fn apply_dismissals_hides_dismissed_unless_revived() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var("GAI_HOME", Some(dir.path()), || {
            let agent = Agent {
                agent_type: AgentType::Crs,
                cl_name: "my-change".into(),
                project_file: "x.gp".into(),
                status: "RUNNING".into(),
                start_time: None,
                workspace_num: None,
                workflow: None,
                hook_command: None,
                commit_entry_id: None,
                mentor_profile: None,
                mentor_name: None,
                reviewer: Some("critique".into()),
                step_name: None,
                pid: None,
                raw_suffix: Some("crs-250101_120000".into()),
            };
            mark_dismissed(agent.identity()).unwrap();
            assert!(apply_dismissals(vec![agent.clone()]).unwrap().is_empty());

            mark_revived(agent.identity()).unwrap();
            assert_eq!(apply_dismissals(vec![agent]).unwrap().len(), 1);
        });
    }
}
