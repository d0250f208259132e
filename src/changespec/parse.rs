//! Single-pass, line-oriented ChangeSpec parser.
//!
//! A ProjectSpec file is a flat sequence of lines; each ChangeSpec is framed
//! either by a `## ChangeSpec` header or begins directly at a `NAME:` line,
//! and ends at the next such marker or two consecutive blank lines. Parse
//! failures on individual lines are never fatal — unrecognized content is
//! silently skipped, matching the Python original's "best effort" posture.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::{
    ChangeSpec, CommentEntry, CommitEntry, HookEntry, HookStatusLine, MentorEntry, MentorProfile,
    MentorStatusLine,
};
use crate::suffix::parse_suffix_prefix;

/// Read and parse every ChangeSpec out of a ProjectSpec file.
///
/// A missing or unreadable file is logged and treated as "no ChangeSpecs",
/// never an error the caller must handle — callers that need to distinguish
/// "file absent" from "file empty" should `std::fs::metadata` first.
pub fn parse_project_file(path: &Path) -> Vec<ChangeSpec> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("could not read {}: {err}", path.display());
            return Vec::new();
        }
    };
    parse_changespecs(&content, &path.display().to_string())
}

static CHANGESPEC_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^##\s+ChangeSpec").unwrap());

/// Parse all ChangeSpecs out of raw ProjectSpec text.
pub fn parse_changespecs(content: &str, file_path: &str) -> Vec<ChangeSpec> {
    let lines: Vec<&str> = content.lines().collect();
    let mut changespecs = Vec::new();
    let mut idx = 0usize;

    while idx < lines.len() {
        let line = lines[idx];
        if CHANGESPEC_HEADER.is_match(line.trim()) {
            let (cs, next_idx) = parse_one(&lines, idx + 1, file_path);
            if let Some(cs) = cs {
                changespecs.push(cs);
            }
            idx = next_idx;
        } else if line.starts_with("NAME: ") {
            let (cs, next_idx) = parse_one(&lines, idx, file_path);
            if let Some(cs) = cs {
                changespecs.push(cs);
            }
            idx = next_idx;
        } else {
            idx += 1;
        }
    }

    changespecs
}

#[derive(Default)]
struct ParserState {
    name: Option<String>,
    description_lines: Vec<String>,
    parent: Option<String>,
    cl: Option<String>,
    bug: Option<String>,
    status: Option<String>,
    test_targets: Vec<String>,
    kickstart_lines: Vec<String>,

    commit_entries: Vec<CommitEntry>,
    current_commit_entry: Option<CommitEntry>,
    hook_entries: Vec<HookEntry>,
    current_hook_entry: Option<HookEntry>,
    comment_entries: Vec<CommentEntry>,
    mentor_entries: Vec<MentorEntry>,
    current_mentor_entry: Option<MentorEntry>,

    in_description: bool,
    in_test_targets: bool,
    in_kickstart: bool,
    in_commits: bool,
    in_hooks: bool,
    in_comments: bool,
    in_mentors: bool,
}

impl ParserState {
    fn reset_section_flags(&mut self) {
        self.in_description = false;
        self.in_test_targets = false;
        self.in_kickstart = false;
        self.in_commits = false;
        self.in_hooks = false;
        self.in_comments = false;
        self.in_mentors = false;
    }

    fn save_pending_entries(&mut self) {
        if let Some(entry) = self.current_commit_entry.take() {
            self.commit_entries.push(entry);
        }
        if let Some(entry) = self.current_hook_entry.take() {
            self.hook_entries.push(entry);
        }
        if let Some(entry) = self.current_mentor_entry.take() {
            self.mentor_entries.push(entry);
        }
    }

    fn build(mut self, line_number: usize, file_path: &str) -> Option<ChangeSpec> {
        self.save_pending_entries();

        let name = self.name?;
        let status = self.status?;

        let description = self.description_lines.join("\n").trim().to_string();
        let kickstart = if self.kickstart_lines.is_empty() {
            None
        } else {
            Some(self.kickstart_lines.join("\n").trim().to_string())
        };

        Some(ChangeSpec {
            name,
            description,
            parent: self.parent,
            cl: self.cl,
            status,
            test_targets: (!self.test_targets.is_empty()).then_some(self.test_targets),
            kickstart,
            file_path: file_path.to_string(),
            line_number,
            bug: self.bug,
            commits: (!self.commit_entries.is_empty()).then_some(self.commit_entries),
            hooks: (!self.hook_entries.is_empty()).then_some(self.hook_entries),
            comments: (!self.comment_entries.is_empty()).then_some(self.comment_entries),
            mentors: (!self.mentor_entries.is_empty()).then_some(self.mentor_entries),
        })
    }
}

/// Returns true (and mutates `state`) if `line` was a recognized field
/// header; `Some(false)` to signal "stop, this NAME: starts a new
/// ChangeSpec".
fn parse_field_header(state: &mut ParserState, line: &str) -> Option<bool> {
    if let Some(rest) = line.strip_prefix("NAME: ") {
        if state.name.is_some() {
            return Some(false);
        }
        state.name = Some(rest.trim().to_string());
        state.reset_section_flags();
        return Some(true);
    }
    if let Some(rest) = line.strip_prefix("DESCRIPTION:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_description = true;
        let inline = rest.trim();
        if !inline.is_empty() {
            state.description_lines.push(inline.to_string());
        }
        return Some(true);
    }
    if let Some(rest) = line.strip_prefix("KICKSTART:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_kickstart = true;
        let inline = rest.trim();
        if !inline.is_empty() {
            state.kickstart_lines.push(inline.to_string());
        }
        return Some(true);
    }
    if let Some(rest) = line.strip_prefix("PARENT: ") {
        state.save_pending_entries();
        state.parent = Some(rest.trim().to_string());
        state.reset_section_flags();
        return Some(true);
    }
    if let Some(rest) = line.strip_prefix("CL: ") {
        state.save_pending_entries();
        state.cl = Some(rest.trim().to_string());
        state.reset_section_flags();
        return Some(true);
    }
    if let Some(rest) = line.strip_prefix("BUG: ") {
        state.save_pending_entries();
        state.bug = Some(rest.trim().to_string());
        state.reset_section_flags();
        return Some(true);
    }
    if let Some(rest) = line.strip_prefix("STATUS: ") {
        state.save_pending_entries();
        state.status = Some(rest.trim().to_string());
        state.reset_section_flags();
        return Some(true);
    }
    None
}

fn parse_section_header(state: &mut ParserState, line: &str) -> bool {
    if line.starts_with("COMMITS:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_commits = true;
        return true;
    }
    if line.starts_with("HOOKS:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_hooks = true;
        return true;
    }
    if line.starts_with("COMMENTS:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_comments = true;
        return true;
    }
    if line.starts_with("MENTORS:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_mentors = true;
        return true;
    }
    if let Some(rest) = line.strip_prefix("TEST TARGETS:") {
        state.save_pending_entries();
        state.reset_section_flags();
        state.in_test_targets = true;
        let inline = rest.trim();
        if !inline.is_empty() {
            state.test_targets.push(inline.to_string());
        }
        return true;
    }
    false
}

fn parse_section_content(state: &mut ParserState, line: &str) {
    let stripped = line.trim();

    if state.in_hooks {
        parse_hooks_line(state, line, stripped);
    } else if state.in_comments {
        parse_comments_line(state, line, stripped);
    } else if state.in_mentors {
        parse_mentors_line(state, line, stripped);
    } else if state.in_commits {
        parse_commits_line(state, stripped);
    } else if state.in_description && line.starts_with("  ") {
        state.description_lines.push(line[2..].to_string());
    } else if state.in_kickstart && line.starts_with("  ") {
        state.kickstart_lines.push(line[2..].to_string());
    } else if state.in_test_targets && line.starts_with("  ") {
        if !stripped.is_empty() {
            state.test_targets.push(stripped.to_string());
        }
    } else if stripped.is_empty() {
        if state.in_description {
            state.description_lines.push(String::new());
        } else if state.in_kickstart {
            state.kickstart_lines.push(String::new());
        }
    } else if !line.starts_with('#') {
        state.reset_section_flags();
    }
}

static HOOK_STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\((\d+[a-z]?)\)\s+\[(\d{6})_(\d{6})\]\s*(RUNNING|PASSED|FAILED|KILLED|DEAD)(?:\s+\(([^)]+)\))?(?:\s+-\s+\(([^)]+)\))?$",
    )
    .unwrap()
});

fn parse_hooks_line(state: &mut ParserState, line: &str, stripped: &str) {
    if line.starts_with("  ") && !line.starts_with("    ") {
        if !stripped.starts_with('[') && !stripped.starts_with('(') {
            if let Some(entry) = state.current_hook_entry.take() {
                state.hook_entries.push(entry);
            }
            state.current_hook_entry = Some(HookEntry {
                command: stripped.to_string(),
                status_lines: Vec::new(),
            });
        }
        return;
    }

    if let Some(status_content) = line.strip_prefix("      | ") {
        let status_content = status_content.trim_end();
        let Some(caps) = HOOK_STATUS_LINE.captures(status_content) else {
            return;
        };
        let Some(current) = state.current_hook_entry.as_mut() else {
            return;
        };

        let commit_num = caps[1].to_string();
        let timestamp = format!("{}_{}", &caps[2], &caps[3]);
        let status = caps[4].to_string();
        let duration = caps.get(5).map(|m| m.as_str().to_string());
        let mut suffix_val = caps.get(6).map(|m| m.as_str().to_string());
        let mut summary_val = None;

        if let Some(raw) = &suffix_val
            && let Some((before, after)) = raw.split_once(" | ")
        {
            summary_val = Some(after.to_string());
            suffix_val = Some(before.to_string());
        }

        let parsed = parse_suffix_prefix(suffix_val.as_deref());

        current.status_lines.push(HookStatusLine {
            commit_entry_num: commit_num,
            timestamp,
            status,
            duration,
            suffix: parsed.value,
            suffix_type: parsed.suffix_type,
            summary: summary_val,
        });
    }
}

static COMMENTS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\]]+)\]\s+(\S+)(?:\s+-\s+\(([^)]+)\))?$").unwrap());

fn parse_comments_line(state: &mut ParserState, line: &str, stripped: &str) {
    if !(line.starts_with("  ") && !line.starts_with("    ")) {
        return;
    }
    let Some(caps) = COMMENTS_LINE.captures(stripped) else {
        return;
    };
    let parsed = parse_suffix_prefix(caps.get(3).map(|m| m.as_str()));
    state.comment_entries.push(CommentEntry {
        reviewer: caps[1].to_string(),
        file_path: caps[2].to_string(),
        suffix: parsed.value,
        suffix_type: parsed.suffix_type,
    });
}

static MENTOR_ENTRY_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((\d+[a-z]?)\)\s+(.+)$").unwrap());
static MENTOR_PROFILE_WITH_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\[(\d+)/(\d+)\]").unwrap());
static MENTOR_STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\[(\d{6}_\d{6})\]\s+)?([^:]+):(\S+)\s+-\s+(RUNNING|PASSED|FAILED)(?:\s+-\s+\(([^)]+)\))?$",
    )
    .unwrap()
});

/// Shape used by the original to recognize an "entry reference" suffix
/// value on a mentor status line — a bare COMMITS entry id such as `"2a"`,
/// meaning a proposal was created in response to the mentor run.
fn is_entry_ref_suffix(suffix: &str) -> bool {
    static ENTRY_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[a-z]?$").unwrap());
    ENTRY_REF.is_match(suffix)
}

fn parse_mentors_line(state: &mut ParserState, line: &str, stripped: &str) {
    if line.starts_with("  ") && !line.starts_with("      ") {
        let Some(caps) = MENTOR_ENTRY_HEADER.captures(stripped) else {
            return;
        };
        if let Some(entry) = state.current_mentor_entry.take() {
            state.mentor_entries.push(entry);
        }

        let entry_id = caps[1].to_string();
        let mut profiles_raw = caps[2].to_string();
        let is_wip = profiles_raw.trim_end().ends_with("#WIP");
        if is_wip {
            profiles_raw = profiles_raw.replace(" #WIP", "").trim_end().to_string();
        }

        let mut profiles: Vec<MentorProfile> = MENTOR_PROFILE_WITH_COUNT
            .captures_iter(&profiles_raw)
            .map(|c| MentorProfile {
                name: c[1].to_string(),
                position: c[2].parse().unwrap_or(1),
                total: c[3].parse().unwrap_or(1),
            })
            .collect();
        if profiles.is_empty() {
            profiles = profiles_raw
                .split_whitespace()
                .map(|name| MentorProfile {
                    name: name.to_string(),
                    position: 1,
                    total: 1,
                })
                .collect();
        }

        state.current_mentor_entry = Some(MentorEntry {
            entry_id,
            profiles,
            status_lines: Vec::new(),
            is_wip,
        });
        return;
    }

    if let Some(status_content) = line.strip_prefix("      | ") {
        let status_content = status_content.trim_end();
        let Some(caps) = MENTOR_STATUS_LINE.captures(status_content) else {
            return;
        };
        let Some(current) = state.current_mentor_entry.as_mut() else {
            return;
        };

        let timestamp = caps.get(1).map(|m| m.as_str().to_string());
        let profile_name = caps[2].to_string();
        let mentor_name = caps[3].to_string();
        let status = caps[4].to_string();
        let raw_suffix = caps.get(5).map(|m| m.as_str().to_string());

        let mut suffix = None;
        let mut suffix_type = None;
        let mut duration = None;

        if let Some(raw_suffix) = raw_suffix {
            let parsed = parse_suffix_prefix(Some(&raw_suffix));
            if parsed.suffix_type.is_some() {
                suffix = parsed.value;
                suffix_type = parsed.suffix_type.map(|t| t.to_string());
            } else if is_entry_ref_suffix(&raw_suffix) {
                suffix_type = Some("entry_ref".to_string());
                suffix = Some(raw_suffix);
            } else {
                duration = Some(raw_suffix);
                suffix_type = Some("plain".to_string());
            }
        }

        current.status_lines.push(MentorStatusLine {
            profile_name,
            mentor_name,
            status,
            timestamp,
            duration,
            suffix,
            suffix_type,
        });
    }
}

// Narrower suffix-prefix set than the general codec, matching the original's
// commit-entry regex exactly: `$:`, `~$:`, `?$:`, `%:` never appear on a
// COMMITS entry, only on HOOKS/COMMENTS lines.
static COMMIT_ENTRY_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((\d+)([a-z])?\)\s+(.+)$").unwrap());
static COMMIT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+-\s+\((~!:|!:|~:|@:)?\s*([^)]+)\)$").unwrap());

fn parse_commits_line(state: &mut ParserState, stripped: &str) {
    let Some(caps) = COMMIT_ENTRY_HEADER.captures(stripped) else {
        if let Some(rest) = stripped.strip_prefix("| CHAT:") {
            if let Some(entry) = state.current_commit_entry.as_mut() {
                entry.chat = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = stripped.strip_prefix("| DIFF:") {
            if let Some(entry) = state.current_commit_entry.as_mut() {
                entry.diff = Some(rest.trim().to_string());
            }
        }
        return;
    };

    if let Some(entry) = state.current_commit_entry.take() {
        state.commit_entries.push(entry);
    }

    let number: u32 = caps[1].parse().unwrap_or(0);
    let proposal_letter = caps.get(2).and_then(|m| m.as_str().chars().next());
    let raw_note = caps[3].to_string();

    let (note, mut suffix_msg, suffix_type) = if let Some(sm) = COMMIT_SUFFIX.captures(&raw_note) {
        let whole = sm.get(0).unwrap();
        let note = raw_note[..whole.start()].to_string();
        let prefix = sm.get(1).map(|m| m.as_str());
        let msg = sm[2].trim().to_string();
        use crate::suffix::SuffixType;
        let suffix_type = match prefix {
            Some("~!:") => Some(SuffixType::RejectedProposal),
            Some("!:") => Some(SuffixType::Error),
            Some("@:") => Some(SuffixType::RunningAgent),
            _ => None, // "~:" (legacy) and no-prefix both map to plain
        };
        (note, Some(msg), suffix_type)
    } else {
        (raw_note, None, None)
    };

    let mut suffix_type = suffix_type;
    if suffix_msg.as_deref() == Some("@") {
        suffix_msg = Some(String::new());
        suffix_type = Some(crate::suffix::SuffixType::RunningAgent);
    }

    state.current_commit_entry = Some(CommitEntry {
        number,
        note,
        chat: None,
        diff: None,
        proposal_letter,
        suffix: suffix_msg,
        suffix_type,
    });
}

fn parse_one(lines: &[&str], start_idx: usize, file_path: &str) -> (Option<ChangeSpec>, usize) {
    let mut state = ParserState::default();
    let mut idx = start_idx;
    let mut consecutive_blank_lines = 0;

    while idx < lines.len() {
        let line = lines[idx];

        if idx > start_idx && CHANGESPEC_HEADER.is_match(line.trim()) {
            break;
        }
        if line.trim().is_empty() {
            consecutive_blank_lines += 1;
            if consecutive_blank_lines >= 2 {
                break;
            }
        } else {
            consecutive_blank_lines = 0;
        }

        match parse_field_header(&mut state, line) {
            Some(true) => {
                idx += 1;
                continue;
            }
            Some(false) => {
                // A second NAME: line: stop without consuming it so the
                // caller reprocesses it as the next ChangeSpec's start.
                state.save_pending_entries();
                break;
            }
            None => {}
        }

        if line.starts_with("NAME: ") && state.name.is_some() {
            state.save_pending_entries();
            break;
        }

        if parse_section_header(&mut state, line) {
            idx += 1;
            continue;
        }

        parse_section_content(&mut state, line);
        idx += 1;
    }

    let line_number = start_idx + 1;
    (state.build(line_number, file_path), idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_changespec() {
        let text = "\
NAME: my-change
DESCRIPTION: does a thing
STATUS: Drafted
";
        let specs = parse_changespecs(text, "test.gp");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "my-change");
        assert_eq!(specs[0].description, "does a thing");
        assert_eq!(specs[0].status, "Drafted");
    }

    #[test]
    fn parses_multiline_description_and_kickstart() {
        let text = "\
NAME: my-change
DESCRIPTION:
  line one
  line two
KICKSTART:
  do the thing
STATUS: Drafted
";
        let specs = parse_changespecs(text, "test.gp");
        assert_eq!(specs[0].description, "line one\nline two");
        assert_eq!(specs[0].kickstart.as_deref(), Some("do the thing"));
    }

    #[test]
    fn parses_two_changespecs_separated_by_blank_lines() {
        let text = "\
NAME: first
STATUS: Drafted


NAME: second
STATUS: Mailed
";
        let specs = parse_changespecs(text, "test.gp");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "first");
        assert_eq!(specs[1].name, "second");
    }

    #[test]
    fn parses_two_changespecs_back_to_back_name_lines() {
        let text = "\
NAME: first
STATUS: Drafted
NAME: second
STATUS: Mailed
";
        let specs = parse_changespecs(text, "test.gp");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "first");
        assert_eq!(specs[1].name, "second");
    }

    #[test]
    fn parses_commits_section_with_suffix_and_chat_diff() {
        let text = "\
NAME: my-change
STATUS: Drafted
COMMITS:
  (1) first commit
  | CHAT: ~/.gai/chats/foo.md
  | DIFF: ~/.gai/diffs/foo.diff
  (2a) proposed fix - (!: NEW PROPOSAL)
";
        let specs = parse_changespecs(text, "test.gp");
        let commits = specs[0].commits.as_ref().unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].number, 1);
        assert_eq!(commits[0].chat.as_deref(), Some("~/.gai/chats/foo.md"));
        assert_eq!(commits[0].diff.as_deref(), Some("~/.gai/diffs/foo.diff"));
        assert_eq!(commits[1].proposal_letter, Some('a'));
        assert_eq!(commits[1].suffix.as_deref(), Some("NEW PROPOSAL"));
        assert_eq!(
            commits[1].suffix_type,
            Some(crate::suffix::SuffixType::Error)
        );
    }

    #[test]
    fn parses_hooks_section_with_compound_suffix() {
        let text = "\
NAME: my-change
STATUS: Drafted
HOOKS:
  go test ./...
      | (1) [250101_120000] FAILED (1m2s) - (!: Hook Command Failed | test summary)
";
        let specs = parse_changespecs(text, "test.gp");
        let hooks = specs[0].hooks.as_ref().unwrap();
        assert_eq!(hooks.len(), 1);
        let sl = &hooks[0].status_lines[0];
        assert_eq!(sl.status, "FAILED");
        assert_eq!(sl.suffix.as_deref(), Some("Hook Command Failed"));
        assert_eq!(sl.summary.as_deref(), Some("test summary"));
    }

    #[test]
    fn parses_killed_hook_status_line() {
        let text = "\
NAME: my-change
STATUS: Drafted
HOOKS:
  go test ./...
      | (1) [250101_120000] KILLED
";
        let specs = parse_changespecs(text, "test.gp");
        let hooks = specs[0].hooks.as_ref().unwrap();
        assert_eq!(hooks[0].status_lines.len(), 1);
        assert_eq!(hooks[0].status_lines[0].status, "KILLED");
    }

    #[test]
    fn parses_comments_section() {
        let text = "\
NAME: my-change
STATUS: Drafted
COMMENTS:
  [critique] ~/.gai/comments/my-change-critique-250101_120000.json
  [critique:me] ~/.gai/comments/my-change-critique_me-250101_120100.json - (!: ZOMBIE)
";
        let specs = parse_changespecs(text, "test.gp");
        let comments = specs[0].comments.as_ref().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].reviewer, "critique");
        assert_eq!(comments[1].reviewer, "critique:me");
        assert_eq!(comments[1].suffix.as_deref(), Some("ZOMBIE"));
    }

    #[test]
    fn parses_mentors_section_with_counts_and_wip() {
        let text = "\
NAME: my-change
STATUS: Drafted
MENTORS:
  (1) backend[1/2] frontend[2/2] #WIP
      | [250101_120000] backend:alice - RUNNING - (@: mentor_alice-12345-250101_120000)
      | backend:bob - PASSED - (0h2m15s)
";
        let specs = parse_changespecs(text, "test.gp");
        let mentors = specs[0].mentors.as_ref().unwrap();
        assert_eq!(mentors.len(), 1);
        assert!(mentors[0].is_wip);
        let profile_names: Vec<&str> = mentors[0].profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(profile_names, vec!["backend", "frontend"]);
        assert_eq!(
            (mentors[0].profiles[0].position, mentors[0].profiles[0].total),
            (1, 2)
        );
        assert_eq!(
            (mentors[0].profiles[1].position, mentors[0].profiles[1].total),
            (2, 2)
        );
        assert_eq!(mentors[0].status_lines.len(), 2);
        assert_eq!(
            mentors[0].status_lines[1].duration.as_deref(),
            Some("0h2m15s")
        );
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let text = "\
NAME: my-change
STATUS: Drafted
COMMITS:
  this is not a valid commit entry line
  (1) a valid one
";
        let specs = parse_changespecs(text, "test.gp");
        assert_eq!(specs[0].commits.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn changespec_header_line_is_optional() {
        let text = "\
## ChangeSpec
NAME: my-change
STATUS: Drafted
";
        let specs = parse_changespecs(text, "test.gp");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "my-change");
    }

    #[test]
    fn missing_required_fields_produce_no_changespec() {
        let text = "NAME: incomplete\n";
        let specs = parse_changespecs(text, "test.gp");
        assert!(specs.is_empty());
    }
}
