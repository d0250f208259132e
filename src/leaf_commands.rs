//! The external-subprocess seam.
//!
//! Git/Mercurial wrappers, the bug tracker, and the review tool are
//! explicitly out of scope for this crate (spec: "the core consumes these
//! as leaf programs it invokes, or as abstract operations whose contracts
//! are given in [the interfaces section]"). `LeafCommands` is that
//! contract: the hook scheduler and workflow supervisor depend on the
//! trait, never directly on `std::process::Command`, so they can be
//! exercised in tests against `FakeLeafCommands` without a real Mercurial
//! checkout.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

/// Bound on blocking leaf-program I/O (spec §5: "subprocess I/O via
/// `bb_hg_update` and similar, bounded by 300s timeouts").
const LEAF_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Operations the core orchestration logic needs from the surrounding
/// version-control/review tooling, as opaque leaf calls.
pub trait LeafCommands: Send + Sync {
    /// Update the workspace to the given commit note/revision.
    fn bb_hg_update(&self, workspace_dir: &Path, note: &str) -> Result<()>;

    /// Amend the current commit in the workspace with any staged changes.
    fn bb_hg_amend(&self, workspace_dir: &Path) -> Result<()>;

    /// Apply a unified diff to the workspace without committing.
    fn hg_import_no_commit(&self, workspace_dir: &Path, diff: &str) -> Result<()>;

    /// Unified diff between the workspace's current state and its parent.
    fn branch_diff(&self, workspace_dir: &Path) -> Result<String>;

    /// The review-tool CL/branch number associated with the workspace, if any.
    fn branch_number(&self, workspace_dir: &Path) -> Result<Option<String>>;

    /// Whether the CL/branch has already been submitted upstream.
    fn is_cl_submitted(&self, cl_name: &str) -> Result<bool>;
}

/// Real implementation: shells out via `std::process::Command`.
pub struct SystemLeafCommands;

impl SystemLeafCommands {
    /// Run `program` to completion, killing it if it outruns
    /// [`LEAF_COMMAND_TIMEOUT`] rather than blocking the scheduler forever.
    /// Stdout/stderr are drained on background threads so a chatty command
    /// (e.g. a large `branch_diff`) can't deadlock on a full pipe buffer
    /// while we're blocked in `wait_timeout`.
    fn run(&self, workspace_dir: &Path, program: &str, args: &[&str]) -> Result<std::process::Output> {
        use std::io::Read;
        use std::process::Stdio;
        use wait_timeout::ChildExt;

        let mut child = std::process::Command::new(program)
            .args(args)
            .current_dir(workspace_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning `{program}` in {}", workspace_dir.display()))?;

        let mut stdout_pipe = child.stdout.take().context("missing stdout pipe")?;
        let mut stderr_pipe = child.stderr.take().context("missing stderr pipe")?;
        let stdout_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf);
            buf
        });
        let stderr_reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf);
            buf
        });

        let status = child
            .wait_timeout(LEAF_COMMAND_TIMEOUT)
            .with_context(|| format!("waiting on `{program}` in {}", workspace_dir.display()))?;

        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!(
                "`{program}` in {} exceeded {}s timeout, killed",
                workspace_dir.display(),
                LEAF_COMMAND_TIMEOUT.as_secs()
            );
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();
        Ok(std::process::Output { status, stdout, stderr })
    }
}

impl LeafCommands for SystemLeafCommands {
    fn bb_hg_update(&self, workspace_dir: &Path, note: &str) -> Result<()> {
        let output = self.run(workspace_dir, "bb_hg_update", &[note])?;
        anyhow::ensure!(output.status.success(), "bb_hg_update failed: {:?}", output);
        Ok(())
    }

    fn bb_hg_amend(&self, workspace_dir: &Path) -> Result<()> {
        let output = self.run(workspace_dir, "bb_hg_amend", &[])?;
        anyhow::ensure!(output.status.success(), "bb_hg_amend failed: {:?}", output);
        Ok(())
    }

    fn hg_import_no_commit(&self, workspace_dir: &Path, diff: &str) -> Result<()> {
        use std::io::Write;
        use wait_timeout::ChildExt;

        let mut child = std::process::Command::new("hg")
            .args(["import", "--no-commit", "-"])
            .current_dir(workspace_dir)
            .stdin(std::process::Stdio::piped())
            .spawn()
            .context("spawning hg import")?;
        child
            .stdin
            .take()
            .context("hg import stdin")?
            .write_all(diff.as_bytes())?;

        let status = match child
            .wait_timeout(LEAF_COMMAND_TIMEOUT)
            .context("waiting on hg import")?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                anyhow::bail!(
                    "hg import --no-commit in {} exceeded {}s timeout, killed",
                    workspace_dir.display(),
                    LEAF_COMMAND_TIMEOUT.as_secs()
                );
            }
        };
        anyhow::ensure!(status.success(), "hg import --no-commit failed");
        Ok(())
    }

    fn branch_diff(&self, workspace_dir: &Path) -> Result<String> {
        let output = self.run(workspace_dir, "branch_diff", &[])?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn branch_number(&self, workspace_dir: &Path) -> Result<Option<String>> {
        let output = self.run(workspace_dir, "branch_number", &[])?;
        let trimmed = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!trimmed.is_empty()).then_some(trimmed))
    }

    fn is_cl_submitted(&self, cl_name: &str) -> Result<bool> {
        let output = std::process::Command::new("is_cl_submitted")
            .arg(cl_name)
            .output()
            .context("running is_cl_submitted")?;
        Ok(output.status.success())
    }
}

/// Test double recording calls and returning canned results.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeLeafCommands {
        pub updates: Mutex<Vec<(std::path::PathBuf, String)>>,
        pub amends: Mutex<Vec<std::path::PathBuf>>,
        pub imports: Mutex<Vec<(std::path::PathBuf, String)>>,
        pub diff_to_return: String,
        pub branch_number_to_return: Option<String>,
        pub submitted_cls: Mutex<std::collections::HashSet<String>>,
    }

    impl LeafCommands for FakeLeafCommands {
        fn bb_hg_update(&self, workspace_dir: &Path, note: &str) -> Result<()> {
            self.updates
                .lock()
                .unwrap()
                .push((workspace_dir.to_path_buf(), note.to_string()));
            Ok(())
        }

        fn bb_hg_amend(&self, workspace_dir: &Path) -> Result<()> {
            self.amends.lock().unwrap().push(workspace_dir.to_path_buf());
            Ok(())
        }

        fn hg_import_no_commit(&self, workspace_dir: &Path, diff: &str) -> Result<()> {
            self.imports
                .lock()
                .unwrap()
                .push((workspace_dir.to_path_buf(), diff.to_string()));
            Ok(())
        }

        fn branch_diff(&self, _workspace_dir: &Path) -> Result<String> {
            Ok(self.diff_to_return.clone())
        }

        fn branch_number(&self, _workspace_dir: &Path) -> Result<Option<String>> {
            Ok(self.branch_number_to_return.clone())
        }

        fn is_cl_submitted(&self, cl_name: &str) -> Result<bool> {
            Ok(self.submitted_cls.lock().unwrap().contains(cl_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeLeafCommands;
    use super::*;

    #[test]
    fn fake_records_update_calls() {
        let fake = FakeLeafCommands::default();
        fake.bb_hg_update(Path::new("/tmp/ws"), "Initial").unwrap();
        assert_eq!(fake.updates.lock().unwrap().len(), 1);
    }

    #[test]
    fn fake_reports_configured_submission_state() {
        let fake = FakeLeafCommands::default();
        fake.submitted_cls.lock().unwrap().insert("my-change".to_string());
        assert!(fake.is_cl_submitted("my-change").unwrap());
        assert!(!fake.is_cl_submitted("other-change").unwrap());
    }
}
