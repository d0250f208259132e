//! C11: read-only validation queries over ChangeSpecs. Pure functions —
//! every query here takes already-parsed data and does one linear scan, no
//! I/O. The `*_global` counters are the exception: they fan out to
//! [`crate::project_spec::find_all_changespecs`] since "global" is
//! inherently cross-file.

use crate::changespec::model::ChangeSpec;
use crate::suffix::{get_base_status, SuffixType};

fn status_has_error_marker(status: &str) -> bool {
    status.contains(" - (!: ")
}

/// Any ERROR suffix in STATUS/COMMITS/HOOKS/COMMENTS, including the
/// READY_TO_MAIL marker (which is itself rendered with an `!:` prefix).
/// Used by the `!!!`/`!!` query shorthands.
pub fn has_any_status_suffix(cs: &ChangeSpec) -> bool {
    status_has_error_marker(&cs.status) || has_error_suffix_in_entries(cs)
}

/// Any error suffix that should block the READY TO MAIL marker from being
/// added — unlike [`has_any_status_suffix`], a pre-existing READY_TO_MAIL
/// marker on STATUS itself does not count.
pub fn has_any_error_suffix(cs: &ChangeSpec) -> bool {
    let status_error = status_has_error_marker(&cs.status)
        && !cs.status.contains(crate::suffix::READY_TO_MAIL_SUFFIX.trim());
    status_error || has_error_suffix_in_entries(cs)
}

fn has_error_suffix_in_entries(cs: &ChangeSpec) -> bool {
    if let Some(commits) = &cs.commits
        && commits.iter().any(|e| e.suffix_type == Some(SuffixType::Error))
    {
        return true;
    }
    if let Some(hooks) = &cs.hooks
        && hooks
            .iter()
            .flat_map(|h| h.status_lines.iter())
            .any(|sl| sl.suffix_type == Some(SuffixType::Error))
    {
        return true;
    }
    if let Some(comments) = &cs.comments
        && comments.iter().any(|e| e.suffix_type == Some(SuffixType::Error))
    {
        return true;
    }
    false
}

/// Whether `cs`'s parent allows it to be mailed: no parent, parent not
/// found, or parent's base status is `Submitted`/`Mailed`.
pub fn is_parent_ready_for_mail(cs: &ChangeSpec, all_changespecs: &[ChangeSpec]) -> bool {
    let Some(parent) = &cs.parent else {
        return true;
    };
    match all_changespecs.iter().find(|c| &c.name == parent) {
        None => true,
        Some(parent_cs) => {
            let base = get_base_status(&parent_cs.status);
            base == "Submitted" || base == "Mailed"
        }
    }
}

fn is_proposal_entry_id(entry_id: &str) -> bool {
    entry_id
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphabetic())
}

/// The latest non-proposal commit entry's id, plus every proposal sharing
/// its number — e.g. history `[1, 2, 2a, 2b]` yields `["2", "2a", "2b"]`.
pub fn current_and_proposal_entry_ids(cs: &ChangeSpec) -> Vec<String> {
    let Some(commits) = &cs.commits else {
        return Vec::new();
    };

    let Some(current) = commits.iter().rev().find(|e| !e.is_proposed()) else {
        return Vec::new();
    };

    let mut result = vec![current.number.to_string()];
    result.extend(
        commits
            .iter()
            .filter(|e| e.is_proposed() && e.number == current.number)
            .map(|e| e.display_number()),
    );
    result
}

/// Whether every applicable hook has `PASSED` for every id in `entry_ids`.
/// Hooks with `skip_proposal_runs` are exempt for proposal-shaped ids.
pub fn all_hooks_passed_for_entries(cs: &ChangeSpec, entry_ids: &[String]) -> bool {
    let Some(hooks) = &cs.hooks else { return true };
    if entry_ids.is_empty() {
        return true;
    }

    for hook in hooks {
        for entry_id in entry_ids {
            if hook.skip_proposal_runs() && is_proposal_entry_id(entry_id) {
                continue;
            }
            match hook.status_line_for_commit_entry(entry_id) {
                None => return false,
                Some(sl) if sl.status != "PASSED" => return false,
                Some(_) => {}
            }
        }
    }
    true
}

pub fn has_any_running_agent(cs: &ChangeSpec) -> bool {
    let hooks_running = cs.hooks.as_ref().is_some_and(|hooks| {
        hooks
            .iter()
            .flat_map(|h| h.status_lines.iter())
            .any(|sl| sl.suffix_type == Some(SuffixType::RunningAgent))
    });
    let comments_running = cs.comments.as_ref().is_some_and(|comments| {
        comments
            .iter()
            .any(|c| c.suffix_type == Some(SuffixType::RunningAgent))
    });
    hooks_running || comments_running
}

pub fn has_any_running_process(cs: &ChangeSpec) -> bool {
    cs.hooks.as_ref().is_some_and(|hooks| {
        hooks
            .iter()
            .flat_map(|h| h.status_lines.iter())
            .any(|sl| sl.suffix_type == Some(SuffixType::RunningProcess))
    })
}

/// Total running hook processes across every ChangeSpec in every project.
pub fn count_running_hooks_global() -> anyhow::Result<usize> {
    let all = crate::project_spec::find_all_changespecs()?;
    Ok(all
        .iter()
        .flat_map(|cs| cs.hooks.iter().flatten())
        .flat_map(|h| h.status_lines.iter())
        .filter(|sl| sl.suffix_type == Some(SuffixType::RunningProcess))
        .count())
}

/// Total running agents (fix-hook/summarize-hook in HOOKS, CRS in COMMENTS)
/// across every ChangeSpec in every project.
pub fn count_running_agents_global() -> anyhow::Result<usize> {
    let all = crate::project_spec::find_all_changespecs()?;
    let in_hooks = all
        .iter()
        .flat_map(|cs| cs.hooks.iter().flatten())
        .flat_map(|h| h.status_lines.iter())
        .filter(|sl| sl.suffix_type == Some(SuffixType::RunningAgent))
        .count();
    let in_comments = all
        .iter()
        .flat_map(|cs| cs.comments.iter().flatten())
        .filter(|c| c.suffix_type == Some(SuffixType::RunningAgent))
        .count();
    Ok(in_hooks + in_comments)
}

/// Unified count of all concurrent runners: running hooks + running agents
/// in HOOKS, COMMENTS, and MENTORS.
pub fn count_all_runners_global() -> anyhow::Result<usize> {
    let all = crate::project_spec::find_all_changespecs()?;
    let hooks_count = all
        .iter()
        .flat_map(|cs| cs.hooks.iter().flatten())
        .flat_map(|h| h.status_lines.iter())
        .filter(|sl| {
            matches!(
                sl.suffix_type,
                Some(SuffixType::RunningProcess) | Some(SuffixType::RunningAgent)
            )
        })
        .count();
    let comments_count = all
        .iter()
        .flat_map(|cs| cs.comments.iter().flatten())
        .filter(|c| c.suffix_type == Some(SuffixType::RunningAgent))
        .count();
    let mentors_count = all
        .iter()
        .flat_map(|cs| cs.mentors.iter().flatten())
        .flat_map(|m| m.status_lines.iter())
        .filter(|sl| sl.suffix_type.as_deref() == Some("running_agent"))
        .count();
    Ok(hooks_count + comments_count + mentors_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changespec::parse::parse_changespecs;

    fn parse_one(text: &str) -> ChangeSpec {
        parse_changespecs(text, "test.gp").remove(0)
    }

    #[test]
    fn has_any_error_suffix_ignores_ready_to_mail_marker() {
        let cs = parse_one("NAME: a\nSTATUS: Drafted - (!: READY TO MAIL)\n");
        assert!(has_any_status_suffix(&cs));
        assert!(!has_any_error_suffix(&cs));
    }

    #[test]
    fn has_any_error_suffix_detects_hook_errors() {
        let text = "\
NAME: a
STATUS: Drafted
HOOKS:
  check
      | (1) [250101_120000] FAILED - (!: Hook Command Failed)
";
        let cs = parse_one(text);
        assert!(has_any_error_suffix(&cs));
    }

    #[test]
    fn parent_ready_for_mail_when_no_parent() {
        let cs = parse_one("NAME: a\nSTATUS: Drafted\n");
        assert!(is_parent_ready_for_mail(&cs, &[]));
    }

    #[test]
    fn parent_ready_for_mail_requires_submitted_or_mailed() {
        let child_text = "NAME: child\nPARENT: parent\nSTATUS: Drafted\n";
        let child = parse_one(child_text);
        let parent_drafted = parse_one("NAME: parent\nSTATUS: Drafted\n");
        let parent_mailed = parse_one("NAME: parent\nSTATUS: Mailed\n");

        assert!(!is_parent_ready_for_mail(&child, &[parent_drafted]));
        assert!(is_parent_ready_for_mail(&child, &[parent_mailed]));
    }

    #[test]
    fn current_and_proposal_entry_ids_excludes_earlier_history() {
        let text = "\
NAME: a
STATUS: Drafted
COMMITS:
  (1) first
  (2) second
  (2a) proposal a
  (2b) proposal b
";
        let cs = parse_one(text);
        assert_eq!(
            current_and_proposal_entry_ids(&cs),
            vec!["2", "2a", "2b"]
        );
    }

    #[test]
    fn all_hooks_passed_respects_skip_proposal_runs() {
        let text = "\
NAME: a
STATUS: Drafted
HOOKS:
  $bb_hg_presubmit
      | (2) [250101_120000] PASSED
  go test
      | (2) [250101_120000] PASSED
      | (2a) [250101_120100] PASSED
";
        let cs = parse_one(text);
        // bb_hg_presubmit has no status line for 2a, but $ exempts proposals.
        assert!(all_hooks_passed_for_entries(&cs, &["2".into(), "2a".into()]));
    }

    #[test]
    fn all_hooks_passed_fails_on_missing_status_line() {
        let text = "\
NAME: a
STATUS: Drafted
HOOKS:
  go test
      | (2) [250101_120000] PASSED
";
        let cs = parse_one(text);
        assert!(!all_hooks_passed_for_entries(&cs, &["2".into(), "2a".into()]));
    }

    #[test]
    fn has_any_running_agent_checks_hooks_and_comments() {
        let text = "\
NAME: a
STATUS: Drafted
COMMENTS:
  [critique] ~/.gai/comments/a-critique-250101_120000.json - (@: 250101_120000)
";
        let cs = parse_one(text);
        assert!(has_any_running_agent(&cs));
        assert!(!has_any_running_process(&cs));
    }
}
