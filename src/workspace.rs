//! C5: the workspace claim registry.
//!
//! A workspace number is a mutex: at most one claim references it within a
//! ProjectSpec's RUNNING list at any instant. `claim_workspace` uses
//! optimistic read-validate-write with a single atomic rewrite; on a race
//! it returns `false` and the caller retries with a new free number.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::project_spec::{parse_project_spec, ProjectSpec, WorkspaceClaim};

/// 1..100: the "axe"/primary range.
pub const AXE_RANGE: Range<u16> = 1..100;
/// 100..200: the "loop" range.
pub const LOOP_RANGE: Range<u16> = 100..200;

/// Parse all current claims out of a ProjectSpec file.
pub fn get_claimed(project_file: &Path) -> Result<Vec<WorkspaceClaim>> {
    Ok(parse_project_spec(project_file)?.running)
}

/// Lowest integer in `range` not present in the current claim list.
///
/// Optimistic-concurrency: the caller must follow up with
/// [`claim_workspace`], which re-validates against the file at claim time.
pub fn first_available(project_file: &Path, range: Range<u16>) -> Result<Option<u16>> {
    let claimed = get_claimed(project_file)?;
    Ok(range.into_iter().find(|n| !claimed.iter().any(|c| c.workspace_num == *n)))
}

/// Re-read the RUNNING list, verify `num` is still free, append the claim,
/// and atomically rewrite the file. Returns `false` on a race.
pub fn claim_workspace(
    project_file: &Path,
    num: u16,
    workflow: &str,
    pid: u32,
    cl_name: Option<String>,
    artifacts_timestamp: Option<String>,
) -> Result<bool> {
    let project = parse_project_spec(project_file)?;
    if project.running.iter().any(|c| c.workspace_num == num) {
        return Ok(false);
    }

    let mut next = project;
    next.running.push(WorkspaceClaim {
        workspace_num: num,
        pid,
        workflow: workflow.to_string(),
        cl_name,
        artifacts_timestamp,
    });
    crate::project_spec::persist(&next)?;
    Ok(true)
}

/// Remove every claim matching `num`, and if provided, `workflow` and
/// `cl_name`.
pub fn release_workspace(
    project_file: &Path,
    num: u16,
    workflow: Option<&str>,
    cl_name: Option<&str>,
) -> Result<bool> {
    let project = parse_project_spec(project_file)?;
    let before = project.running.len();

    let mut next = project;
    next.running.retain(|c| {
        let matches_num = c.workspace_num == num;
        let matches_workflow = workflow.is_none_or(|w| c.workflow == w);
        let matches_cl = cl_name.is_none_or(|cl| c.cl_name.as_deref() == Some(cl));
        !(matches_num && matches_workflow && matches_cl)
    });
    let released = next.running.len() != before;
    if released {
        crate::project_spec::persist(&next)?;
    }
    Ok(released)
}

/// Translate a `(project_name, num)` pair to an on-disk workspace directory:
/// a "main" workspace directory for `num == 1`, and a numbered sibling
/// directory otherwise.
pub fn workspace_directory(project_name: &str, num: u16) -> Result<PathBuf> {
    let base = crate::paths::project_dir(project_name)?.join("workspace");
    if num == 1 {
        Ok(base)
    } else {
        Ok(base.with_file_name(format!("workspace-{num}")))
    }
}

/// Try to claim the first available workspace number in `range`, retrying
/// on a race up to `max_attempts` times.
pub fn claim_first_available(
    project_file: &Path,
    range: Range<u16>,
    workflow: &str,
    pid: u32,
    cl_name: Option<String>,
    artifacts_timestamp: Option<String>,
    max_attempts: u32,
) -> Result<Option<u16>> {
    for _ in 0..max_attempts {
        let Some(candidate) = first_available(project_file, range.clone())? else {
            return Ok(None);
        };
        if claim_workspace(
            project_file,
            candidate,
            workflow,
            pid,
            cl_name.clone(),
            artifacts_timestamp.clone(),
        )? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn empty_project_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.gp");
        std::fs::File::create(&path).unwrap().write_all(b"").unwrap();
        (dir, path)
    }

    #[test]
    fn first_available_picks_lowest_free_number_in_range() {
        let (_dir, path) = empty_project_file();
        assert_eq!(first_available(&path, AXE_RANGE).unwrap(), Some(1));
        claim_workspace(&path, 1, "loop(hooks)-1", 100, None, None).unwrap();
        assert_eq!(first_available(&path, AXE_RANGE).unwrap(), Some(2));
    }

    #[test]
    fn claim_workspace_rejects_already_claimed_number() {
        let (_dir, path) = empty_project_file();
        assert!(claim_workspace(&path, 1, "loop(hooks)-1", 100, None, None).unwrap());
        assert!(!claim_workspace(&path, 1, "loop(hooks)-2", 200, None, None).unwrap());
    }

    #[test]
    fn release_workspace_removes_matching_claims_only() {
        let (_dir, path) = empty_project_file();
        claim_workspace(&path, 1, "loop(hooks)-1", 100, Some("cs-a".into()), None).unwrap();
        claim_workspace(&path, 2, "loop(hooks)-2", 200, Some("cs-b".into()), None).unwrap();

        assert!(release_workspace(&path, 1, None, Some("cs-a")).unwrap());
        let remaining = get_claimed(&path).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].workspace_num, 2);
    }

    #[test]
    fn release_workspace_returns_false_when_nothing_matched() {
        let (_dir, path) = empty_project_file();
        assert!(!release_workspace(&path, 99, None, None).unwrap());
    }

    #[test]
    fn axe_and_loop_ranges_are_disjoint() {
        assert!(AXE_RANGE.end <= LOOP_RANGE.start);
    }

    #[test]
    fn workspace_directory_distinguishes_primary_from_numbered() {
        let primary = workspace_directory("proj", 1).unwrap();
        let other = workspace_directory("proj", 2).unwrap();
        assert_ne!(primary, other);
    }
}
