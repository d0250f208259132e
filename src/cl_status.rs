//! CL submission-status polling and the STATUS field's state transitions.
//!
//! The loop driver only needs to answer three questions about a mailed
//! ChangeSpec: has the review-tool CL been submitted upstream, does it have
//! pending reviewer comments, and is its parent far enough along that this
//! one is worth polling at all. `transition_changespec_status` is the one
//! place that actually rewrites the STATUS field on disk.

use anyhow::Result;

use crate::changespec::model::ChangeSpec;
use crate::leaf_commands::LeafCommands;
use crate::suffix::get_base_status;

/// Base statuses the loop polls the review tool for. `Drafted` has nothing
/// to poll yet; `Submitted` and `Reverted` are terminal.
pub const SYNCABLE_STATUSES: &[&str] = &["Mailed", "Changes Requested"];

/// Strip any ` - (workspace N)`-style trailing annotation the TUI may have
/// appended, leaving the bare STATUS value [`get_base_status`] understands.
pub fn remove_workspace_suffix(status: &str) -> String {
    get_base_status(status)
}

/// Whether `changespec`'s parent is absent or itself Submitted/Mailed —
/// i.e. whether this ChangeSpec is a leaf worth polling on its own.
pub fn is_parent_submitted(changespec: &ChangeSpec, all_changespecs: &[ChangeSpec]) -> bool {
    crate::validation::is_parent_ready_for_mail(changespec, all_changespecs)
}

/// Ask the review tool whether `changespec`'s CL has been submitted.
pub fn is_cl_submitted(changespec: &ChangeSpec, leaf: &dyn LeafCommands) -> bool {
    leaf.is_cl_submitted(&changespec.name).unwrap_or(false)
}

/// Whether `changespec` has open reviewer comments awaiting a response —
/// any COMMENTS entry without a `RESOLVED`/`DONE`-shaped suffix.
pub fn has_pending_comments(changespec: &ChangeSpec) -> bool {
    let Some(comments) = &changespec.comments else {
        return false;
    };
    comments.iter().any(|c| {
        let suffix = c.suffix.as_deref().unwrap_or("");
        !matches!(
            c.suffix_type,
            Some(crate::suffix::SuffixType::KilledAgent)
                | Some(crate::suffix::SuffixType::KilledProcess)
        ) && !suffix.trim().is_empty()
            && !suffix.contains("RESOLVED")
    })
}

/// Rewrite `changespec`'s STATUS field in place on disk, in the spirit of
/// the original's `validate=False` automatic transitions: the loop driver
/// only ever calls this with statuses it has already determined are legal
/// given the current state, so no additional validation is performed here.
pub fn transition_changespec_status(
    project_file: &std::path::Path,
    changespec_name: &str,
    new_status: &str,
) -> Result<String> {
    let project = crate::project_spec::parse_project_spec(project_file)?;
    let (_, cs) = crate::project_spec::find_changespec(&project, changespec_name)?;
    let old_status = cs.status.clone();

    let next = crate::changespec::update::update_changespec_status(
        &project,
        changespec_name,
        new_status,
    )?;
    crate::project_spec::persist(&next)?;
    Ok(old_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changespec::parse::parse_changespecs;

    fn parse_one(text: &str) -> ChangeSpec {
        parse_changespecs(text, "test.gp").remove(0)
    }

    #[test]
    fn remove_workspace_suffix_strips_ready_to_mail_marker() {
        assert_eq!(
            remove_workspace_suffix("Drafted - (!: READY TO MAIL)"),
            "Drafted"
        );
    }

    #[test]
    fn has_pending_comments_true_for_unresolved_entry() {
        let text = "\
NAME: a
STATUS: Mailed
COMMENTS:
  [critique] ~/.gai/comments/a-critique-250101_120000.json - (!: unresolved)
";
        let cs = parse_one(text);
        assert!(has_pending_comments(&cs));
    }

    #[test]
    fn has_pending_comments_false_with_no_comments() {
        let cs = parse_one("NAME: a\nSTATUS: Mailed\n");
        assert!(!has_pending_comments(&cs));
    }

    #[test]
    fn is_parent_submitted_true_with_no_parent() {
        let cs = parse_one("NAME: a\nSTATUS: Mailed\n");
        assert!(is_parent_submitted(&cs, &[]));
    }
}
