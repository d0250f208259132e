//! Render a [`ChangeSpec`] back to its ProjectSpec text representation.
//!
//! The inverse of [`super::parse::parse_changespecs`] for a single
//! ChangeSpec — used by every mutation helper in [`super::update`], which
//! always rewrites the whole entry rather than patching lines in place.

use std::fmt::Write as _;

use super::model::ChangeSpec;
use crate::suffix::format_suffix;

pub fn serialize_changespec(cs: &ChangeSpec) -> String {
    let mut out = String::new();
    writeln!(out, "## ChangeSpec").unwrap();
    writeln!(out, "NAME: {}", cs.name).unwrap();

    writeln!(out, "DESCRIPTION:").unwrap();
    for line in cs.description.lines() {
        writeln!(out, "  {line}").unwrap();
    }

    if let Some(parent) = &cs.parent {
        writeln!(out, "PARENT: {parent}").unwrap();
    }
    if let Some(cl) = &cs.cl {
        writeln!(out, "CL: {cl}").unwrap();
    }
    if let Some(bug) = &cs.bug {
        writeln!(out, "BUG: {bug}").unwrap();
    }
    writeln!(out, "STATUS: {}", cs.status).unwrap();

    if let Some(targets) = &cs.test_targets {
        writeln!(out, "TEST TARGETS:").unwrap();
        for target in targets {
            writeln!(out, "  {target}").unwrap();
        }
    }

    if let Some(kickstart) = &cs.kickstart {
        writeln!(out, "KICKSTART:").unwrap();
        for line in kickstart.lines() {
            writeln!(out, "  {line}").unwrap();
        }
    }

    if let Some(commits) = &cs.commits {
        writeln!(out, "COMMITS:").unwrap();
        for entry in commits {
            let mut line = format!("  ({})", entry.display_number());
            write!(line, " {}", entry.note).unwrap();
            if let Some(suffix) = &entry.suffix {
                write!(line, " - ({})", format_suffix(suffix, entry.suffix_type)).unwrap();
            }
            writeln!(out, "{line}").unwrap();
            if let Some(chat) = &entry.chat {
                writeln!(out, "  | CHAT: {chat}").unwrap();
            }
            if let Some(diff) = &entry.diff {
                writeln!(out, "  | DIFF: {diff}").unwrap();
            }
        }
    }

    if let Some(hooks) = &cs.hooks {
        writeln!(out, "HOOKS:").unwrap();
        for hook in hooks {
            writeln!(out, "  {}", hook.command).unwrap();
            for sl in &hook.status_lines {
                let mut line = format!(
                    "      | ({}) [{}] {}",
                    sl.commit_entry_num, sl.timestamp, sl.status
                );
                if let Some(duration) = &sl.duration {
                    write!(line, " ({duration})").unwrap();
                }
                if let Some(suffix) = &sl.suffix {
                    let rendered = format_suffix(suffix, sl.suffix_type);
                    match &sl.summary {
                        Some(summary) => write!(line, " - ({rendered} | {summary})").unwrap(),
                        None => write!(line, " - ({rendered})").unwrap(),
                    }
                }
                writeln!(out, "{line}").unwrap();
            }
        }
    }

    if let Some(comments) = &cs.comments {
        writeln!(out, "COMMENTS:").unwrap();
        for entry in comments {
            let mut line = format!("  [{}] {}", entry.reviewer, entry.file_path);
            if let Some(suffix) = &entry.suffix {
                write!(line, " - ({})", format_suffix(suffix, entry.suffix_type)).unwrap();
            }
            writeln!(out, "{line}").unwrap();
        }
    }

    if let Some(mentors) = &cs.mentors {
        writeln!(out, "MENTORS:").unwrap();
        for entry in mentors {
            let mut header = format!(
                "  ({}) {}",
                entry.entry_id,
                entry
                    .profiles
                    .iter()
                    .map(|p| format!("{}[{}/{}]", p.name, p.position, p.total))
                    .collect::<Vec<_>>()
                    .join(" ")
            );
            if entry.is_wip {
                write!(header, " #WIP").unwrap();
            }
            writeln!(out, "{header}").unwrap();
            for sl in &entry.status_lines {
                let mut line = String::from("      | ");
                if let Some(ts) = &sl.timestamp {
                    write!(line, "[{ts}] ").unwrap();
                }
                write!(line, "{}:{} - {}", sl.profile_name, sl.mentor_name, sl.status).unwrap();
                if let Some(duration) = &sl.duration {
                    write!(line, " - ({duration})").unwrap();
                } else if let Some(suffix) = &sl.suffix {
                    let rendered = format_suffix(suffix, sl.suffix_type_enum());
                    write!(line, " - ({rendered})").unwrap();
                }
                writeln!(out, "{line}").unwrap();
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changespec::parse::parse_changespecs;

    #[test]
    fn round_trips_a_changespec_with_every_section() {
        let text = "\
NAME: my-change
DESCRIPTION:
  does a thing
PARENT: base-change
CL: 123456
BUG: b/1
STATUS: Drafted
COMMITS:
  (1) first commit
  (2a) proposed fix - (!: NEW PROPOSAL)
HOOKS:
  go test ./...
      | (1) [250101_120000] PASSED (1m2s)
      | (2) [250101_130000] KILLED
COMMENTS:
  [critique] ~/.gai/comments/my-change-critique-250101_120000.json
MENTORS:
  (1) backend[1/2] frontend[2/2]
      | [250101_120000] backend:alice - RUNNING - (@: mentor_alice-12345-250101_120000)
      | backend:bob - PASSED - (0h2m15s)
";
        let parsed = parse_changespecs(text, "test.gp");
        let cs = &parsed[0];
        let rendered = serialize_changespec(cs);
        let reparsed = parse_changespecs(&rendered, "test.gp");
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0], *cs);
    }

    #[test]
    fn mentor_running_agent_suffix_keeps_its_prefix_across_a_round_trip() {
        let text = "\
NAME: my-change
STATUS: Drafted
MENTORS:
  (1) backend[1/1]
      | backend:alice - RUNNING - (@: mentor_alice-12345-250101_120000)
";
        let parsed = parse_changespecs(text, "test.gp");
        let rendered = serialize_changespec(&parsed[0]);
        assert!(
            rendered.contains("- (@: mentor_alice-12345-250101_120000)"),
            "rendered mentor status line lost its `@:` prefix:\n{rendered}"
        );
    }
}
