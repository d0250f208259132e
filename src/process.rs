//! Detached subprocess spawning, shared by the hook scheduler and the
//! workflow supervisor.
//!
//! Mirrors the teacher's `commands/process.rs::spawn_detached_unix`: a new
//! process group via `process_group(0)` so the spawned child survives the
//! parent (loop driver, or whatever invoked `gai loop`) exiting or losing
//! its controlling terminal.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// Spawn `program` with `args` in `cwd`, redirecting stdout+stderr to
/// `output_path` (truncated if it exists), detached into its own process
/// group. Returns the child's PID; the child is otherwise unmanaged — no
/// handle is kept, no wait is performed.
pub fn spawn_detached(program: &str, args: &[&str], cwd: &Path, output_path: &Path) -> Result<u32> {
    let output_file = File::create(output_path)
        .with_context(|| format!("creating hook/workflow output file {}", output_path.display()))?;
    let stderr_file = output_file
        .try_clone()
        .context("cloning output file handle for stderr")?;

    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::from(output_file))
        .stderr(Stdio::from(stderr_file));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let child = command
        .spawn()
        .with_context(|| format!("spawning detached `{program}` in {}", cwd.display()))?;
    Ok(child.id())
}

/// Send `SIGTERM` to the process group led by `pid` (negated-PID kill).
/// "No such process" is treated as success — the agent is already gone.
#[cfg(unix)]
pub fn kill_process_group(pid: u32) -> Result<()> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    match signal::kill(Pid::from_raw(-(pid as i32)), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(err) => Err(anyhow::anyhow!("SIGTERM to process group {pid} failed: {err}")),
    }
}

#[cfg(not(unix))]
pub fn kill_process_group(_pid: u32) -> Result<()> {
    anyhow::bail!("process-group kill is only supported on unix")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_detached_writes_combined_output() {
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("out.txt");
        let pid = spawn_detached("sh", &["-c", "echo hi"], dir.path(), &output_path).unwrap();
        assert!(pid > 0);
        // Give the child a moment to flush; best-effort, not a hard wait.
        std::thread::sleep(std::time::Duration::from_millis(200));
        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("hi"));
    }

    #[test]
    fn kill_process_group_treats_missing_pid_as_success() {
        // A PID this high is essentially guaranteed not to exist.
        assert!(kill_process_group(999_999).is_ok());
    }
}
