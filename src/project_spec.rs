//! C4: the ProjectSpec container — a project-level `BUG:`/`RUNNING:` header
//! plus an ordered list of [`ChangeSpec`]s, all backed by one text file.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::changespec::model::ChangeSpec;
use crate::changespec::parse::parse_changespecs;
use crate::changespec::serialize::serialize_changespec;

/// One entry in the project-level RUNNING table.
///
/// Workspace numbers partition into two disjoint ranges: 1..99 ("axe"/
/// primary) and 100..199 ("loop"). Workflow names follow the encoded
/// conventions `ace(run)-<ts>`, `workflow(<name>)`, `loop(hooks)-<entry_id>`,
/// `loop(crs)-<reviewer>`, `loop(fix-hook)-<ts>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceClaim {
    pub workspace_num: u16,
    pub pid: u32,
    pub workflow: String,
    pub cl_name: Option<String>,
    pub artifacts_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectSpec {
    pub path: PathBuf,
    pub bug: Option<String>,
    pub running: Vec<WorkspaceClaim>,
    pub changespecs: Vec<ChangeSpec>,
}

static RUNNING_CLAIM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*\((\d+)\)\s+(\S+)\s+pid=(\d+)(?:\s+cl=(\S+))?(?:\s+ts=(\S+))?\s*$",
    )
    .unwrap()
});

fn parse_header(lines: &[&str]) -> (Option<String>, Vec<WorkspaceClaim>) {
    let mut bug = None;
    let mut running = Vec::new();
    let mut in_running = false;

    for line in lines {
        if line.starts_with("## ChangeSpec") || line.starts_with("NAME: ") {
            break;
        }
        if let Some(rest) = line.strip_prefix("BUG: ") {
            bug = Some(rest.trim().to_string());
            in_running = false;
            continue;
        }
        if line.starts_with("RUNNING:") {
            in_running = true;
            continue;
        }
        if in_running {
            if let Some(caps) = RUNNING_CLAIM_LINE.captures(line) {
                running.push(WorkspaceClaim {
                    workspace_num: caps[1].parse().unwrap_or(0),
                    workflow: caps[2].to_string(),
                    pid: caps[3].parse().unwrap_or(0),
                    cl_name: caps.get(4).map(|m| m.as_str().to_string()),
                    artifacts_timestamp: caps.get(5).map(|m| m.as_str().to_string()),
                });
            } else if !line.trim().is_empty() {
                in_running = false;
            }
        }
    }

    (bug, running)
}

/// Parse a ProjectSpec from its on-disk text, along with the path it came
/// from (used later for persistence and for `project_basename`).
pub fn parse_project_spec_str(content: &str, path: &Path) -> ProjectSpec {
    let lines: Vec<&str> = content.lines().collect();
    let (bug, running) = parse_header(&lines);
    let changespecs = parse_changespecs(content, &path.display().to_string());
    ProjectSpec {
        path: path.to_path_buf(),
        bug,
        running,
        changespecs,
    }
}

pub fn parse_project_spec(path: &Path) -> Result<ProjectSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading project spec {}", path.display()))?;
    Ok(parse_project_spec_str(&content, path))
}

pub fn serialize_project_spec(project: &ProjectSpec) -> String {
    let mut out = String::new();
    if let Some(bug) = &project.bug {
        writeln!(out, "BUG: {bug}").unwrap();
    }
    if !project.running.is_empty() {
        writeln!(out, "RUNNING:").unwrap();
        for claim in &project.running {
            let mut line = format!(
                "  ({}) {} pid={}",
                claim.workspace_num, claim.workflow, claim.pid
            );
            if let Some(cl) = &claim.cl_name {
                write!(line, " cl={cl}").unwrap();
            }
            if let Some(ts) = &claim.artifacts_timestamp {
                write!(line, " ts={ts}").unwrap();
            }
            writeln!(out, "{line}").unwrap();
        }
    }
    if project.bug.is_some() || !project.running.is_empty() {
        writeln!(out).unwrap();
    }

    for (i, cs) in project.changespecs.iter().enumerate() {
        if i > 0 {
            writeln!(out).unwrap();
        }
        write!(out, "{}", serialize_changespec(cs)).unwrap();
    }

    out
}

/// Write a ProjectSpec back to `project.path`, atomically.
pub fn persist(project: &ProjectSpec) -> Result<()> {
    crate::persist::write_atomic(&project.path, &serialize_project_spec(project))
}

/// Locate a ChangeSpec by name, scanning in order.
pub fn find_changespec<'a>(project: &'a ProjectSpec, name: &str) -> Result<(usize, &'a ChangeSpec)> {
    project
        .changespecs
        .iter()
        .enumerate()
        .find(|(_, cs)| cs.name == name)
        .ok_or_else(|| {
            let available: Vec<&str> = project.changespecs.iter().map(|cs| cs.name.as_str()).collect();
            anyhow::anyhow!(
                "ChangeSpec '{name}' not found in {}; available: [{}]",
                project.path.display(),
                available.join(", ")
            )
        })
}

/// Return a clone of `project` with the ChangeSpec at `index` replaced.
pub fn replace_changespec(project: &ProjectSpec, index: usize, replacement: ChangeSpec) -> Result<ProjectSpec> {
    if index >= project.changespecs.len() {
        bail!(
            "index {index} out of range for project with {} ChangeSpecs",
            project.changespecs.len()
        );
    }
    let mut next = project.clone();
    next.changespecs[index] = replacement;
    Ok(next)
}

/// Scan `~/.gai/projects/<p>/<p>.gp` for every project directory `<p>`,
/// returning the flat concatenation of all ChangeSpecs.
pub fn find_all_changespecs() -> Result<Vec<ChangeSpec>> {
    let projects_dir = crate::paths::projects_dir()?;
    let mut all = Vec::new();

    let entries = match std::fs::read_dir(&projects_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(all),
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", projects_dir.display()))
        }
    };

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let project_name = entry.file_name().to_string_lossy().to_string();
        let spec_path = entry.path().join(format!("{project_name}.gp"));
        if spec_path.exists() {
            let project = parse_project_spec(&spec_path)?;
            all.extend(project.changespecs);
        }
    }

    Ok(all)
}
