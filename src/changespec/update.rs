//! Immutable `update_changespec_X` family.
//!
//! Each function locates a ChangeSpec by name, produces a shallow-replaced
//! clone of it, and returns a new [`ProjectSpec`] — the caller is
//! responsible for persisting it via [`crate::project_spec::persist`]. No
//! function here touches disk directly; that separation is what makes the
//! hook scheduler and workflow supervisor testable with an in-memory
//! `ProjectSpec`.

use anyhow::Result;

use super::model::{CommentEntry, CommitEntry, HookEntry, HookStatusLine};
use crate::project_spec::{find_changespec, replace_changespec, ProjectSpec};
use crate::suffix::SuffixType;

fn with_changespec(
    project: &ProjectSpec,
    cs_name: &str,
    f: impl FnOnce(&mut crate::changespec::model::ChangeSpec),
) -> Result<ProjectSpec> {
    let (index, cs) = find_changespec(project, cs_name)?;
    let mut updated = cs.clone();
    f(&mut updated);
    replace_changespec(project, index, updated)
}

/// Set `STATUS:` on a ChangeSpec.
pub fn update_changespec_status(project: &ProjectSpec, cs_name: &str, status: &str) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| cs.status = status.to_string())
}

/// Append a new commit entry.
pub fn update_changespec_add_commit(
    project: &ProjectSpec,
    cs_name: &str,
    entry: CommitEntry,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        cs.commits.get_or_insert_with(Vec::new).push(entry);
    })
}

/// Set the suffix on a specific commit entry (by display number, e.g. `"2a"`).
pub fn update_changespec_set_commit_suffix(
    project: &ProjectSpec,
    cs_name: &str,
    entry_display_number: &str,
    suffix: Option<String>,
    suffix_type: Option<SuffixType>,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        if let Some(commits) = cs.commits.as_mut() {
            for entry in commits.iter_mut() {
                if entry.display_number() == entry_display_number {
                    entry.suffix = suffix.clone();
                    entry.suffix_type = suffix_type;
                }
            }
        }
    })
}

/// Retire an accepted proposal: replace the regular entry it targets with
/// the proposal's content, renumbering away the proposal itself.
pub fn update_changespec_accept_proposal(
    project: &ProjectSpec,
    cs_name: &str,
    proposal_display_number: &str,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        let Some(commits) = cs.commits.as_mut() else {
            return;
        };
        let Some(proposal_idx) = commits
            .iter()
            .position(|e| e.display_number() == proposal_display_number)
        else {
            return;
        };
        let proposal = commits.remove(proposal_idx);
        if let Some(regular) = commits.iter_mut().find(|e| e.number == proposal.number) {
            regular.note = proposal.note;
            regular.chat = proposal.chat;
            regular.diff = proposal.diff;
            regular.suffix = None;
            regular.suffix_type = None;
        }
    })
}

/// Append a new `HookStatusLine` to the named hook command, creating the
/// `HookEntry` if it doesn't exist yet.
pub fn update_changespec_add_hook_status_line(
    project: &ProjectSpec,
    cs_name: &str,
    command: &str,
    status_line: HookStatusLine,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        let hooks = cs.hooks.get_or_insert_with(Vec::new);
        let entry = hooks.iter_mut().find(|h| h.command == command);
        match entry {
            Some(entry) => entry.status_lines.push(status_line),
            None => hooks.push(HookEntry {
                command: command.to_string(),
                status_lines: vec![status_line],
            }),
        }
    })
}

/// Replace the last status line of `command` for a given commit entry id
/// (used by the completion/zombie sweeps to rewrite `RUNNING` in place).
pub fn update_changespec_replace_hook_status_line(
    project: &ProjectSpec,
    cs_name: &str,
    command: &str,
    commit_entry_num: &str,
    new_status_line: HookStatusLine,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        if let Some(hooks) = cs.hooks.as_mut()
            && let Some(entry) = hooks.iter_mut().find(|h| h.command == command)
            && let Some(sl) = entry
                .status_lines
                .iter_mut()
                .rev()
                .find(|sl| sl.commit_entry_num == commit_entry_num)
        {
            *sl = new_status_line;
        }
    })
}

/// Append a new comment entry (e.g. a freshly-launched CRS run).
pub fn update_changespec_add_comment(
    project: &ProjectSpec,
    cs_name: &str,
    entry: CommentEntry,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        cs.comments.get_or_insert_with(Vec::new).push(entry);
    })
}

/// Set the suffix on all comment entries matching `reviewer` (e.g. clearing
/// a CRS run's suffix on completion).
pub fn update_changespec_set_comment_suffix(
    project: &ProjectSpec,
    cs_name: &str,
    reviewer: &str,
    suffix: Option<String>,
    suffix_type: Option<SuffixType>,
) -> Result<ProjectSpec> {
    with_changespec(project, cs_name, |cs| {
        if let Some(comments) = cs.comments.as_mut() {
            for entry in comments.iter_mut().filter(|e| e.reviewer == reviewer) {
                entry.suffix = suffix.clone();
                entry.suffix_type = suffix_type;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_spec::parse_project_spec_str;
    use std::path::Path;

    fn sample_project() -> ProjectSpec {
        let text = "\
NAME: my-change
STATUS: Drafted
COMMITS:
  (1) first commit
  (2a) proposed fix
HOOKS:
  go test ./...
";
        parse_project_spec_str(text, Path::new("test.gp"))
    }

    #[test]
    fn update_status_returns_new_project_without_mutating_original() {
        let project = sample_project();
        let updated = update_changespec_status(&project, "my-change", "Mailed").unwrap();
        assert_eq!(project.changespecs[0].status, "Drafted");
        assert_eq!(updated.changespecs[0].status, "Mailed");
    }

    #[test]
    fn unknown_changespec_name_fails_with_available_list() {
        let project = sample_project();
        let err = update_changespec_status(&project, "nope", "Mailed").unwrap_err();
        assert!(err.to_string().contains("my-change"));
    }

    #[test]
    fn accept_proposal_replaces_regular_entry_and_removes_proposal() {
        let project = sample_project();
        let updated = update_changespec_accept_proposal(&project, "my-change", "2a").unwrap();
        let commits = updated.changespecs[0].commits.as_ref().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].note, "proposed fix");
        assert!(commits[0].suffix.is_none());
    }

    #[test]
    fn add_hook_status_line_creates_entry_if_missing() {
        let project = sample_project();
        let status_line = HookStatusLine {
            commit_entry_num: "1".into(),
            timestamp: "250101_120000".into(),
            status: "RUNNING".into(),
            duration: None,
            suffix: None,
            suffix_type: None,
            summary: None,
        };
        let updated = update_changespec_add_hook_status_line(
            &project,
            "my-change",
            "new_hook_command",
            status_line,
        )
        .unwrap();
        let hooks = updated.changespecs[0].hooks.as_ref().unwrap();
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[1].command, "new_hook_command");
    }
}
