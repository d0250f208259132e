//! ChangeSpec data model.
//!
//! A `ChangeSpec` is one block of an on-disk ProjectSpec file describing a
//! single in-progress change: its commit history, hook execution history,
//! reviewer comments, and mentor runs.

use crate::suffix::SuffixType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub number: u32,
    pub note: String,
    pub chat: Option<String>,
    pub diff: Option<String>,
    /// `Some('a')` for proposed entries like `(2a)`, `None` for regular entries.
    pub proposal_letter: Option<char>,
    pub suffix: Option<String>,
    pub suffix_type: Option<SuffixType>,
}

impl CommitEntry {
    pub fn is_proposed(&self) -> bool {
        self.proposal_letter.is_some()
    }

    /// Display string for this entry's number, e.g. `"2"` or `"2a"`.
    pub fn display_number(&self) -> String {
        match self.proposal_letter {
            Some(letter) => format!("{}{letter}", self.number),
            None => self.number.to_string(),
        }
    }
}

/// Parse a commit entry id like `"1"` or `"1a"` into `(number, letter)` for
/// sorting. Regular entries sort before their own proposals (`""` < `"a"`).
pub fn parse_commit_entry_id(entry_id: &str) -> (u32, String) {
    let digits_end = entry_id
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(entry_id.len());
    let (digits, rest) = entry_id.split_at(digits_end);
    match digits.parse::<u32>() {
        Ok(number) if rest.chars().all(|c| c.is_ascii_lowercase()) => (number, rest.to_string()),
        _ => (0, entry_id.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookStatusLine {
    pub commit_entry_num: String,
    pub timestamp: String,
    pub status: String,
    pub duration: Option<String>,
    pub suffix: Option<String>,
    pub suffix_type: Option<SuffixType>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HookEntry {
    pub command: String,
    pub status_lines: Vec<HookStatusLine>,
}

impl HookEntry {
    fn prefix(&self) -> &str {
        let end = self
            .command
            .find(|c: char| c != '!' && c != '$')
            .unwrap_or(self.command.len());
        &self.command[..end]
    }

    /// `!` prefix: FAILED status lines auto-append `- (!: Hook Command Failed)`.
    pub fn skip_fix_hook(&self) -> bool {
        self.prefix().contains('!')
    }

    /// `$` prefix: hook is not run for proposed COMMITS entries.
    pub fn skip_proposal_runs(&self) -> bool {
        self.prefix().contains('$')
    }

    pub fn display_command(&self) -> &str {
        self.command.trim_start_matches(['!', '$'])
    }

    pub fn run_command(&self) -> &str {
        self.display_command()
    }

    /// Most recent status line, by commit-entry-id ordering.
    pub fn latest_status_line(&self) -> Option<&HookStatusLine> {
        self.status_lines
            .iter()
            .max_by_key(|sl| parse_commit_entry_id(&sl.commit_entry_num))
    }

    pub fn status_line_for_commit_entry(&self, commit_entry_id: &str) -> Option<&HookStatusLine> {
        self.status_lines
            .iter()
            .find(|sl| sl.commit_entry_num == commit_entry_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorStatusLine {
    pub profile_name: String,
    pub mentor_name: String,
    pub status: String,
    pub timestamp: Option<String>,
    pub duration: Option<String>,
    pub suffix: Option<String>,
    /// `"running_agent"` / `"plain"` / `"error"` / `"entry_ref"`, or a
    /// [`SuffixType`] variant name — mentor status lines can carry the
    /// original's `entry_ref` pseudo-type which isn't one of [`SuffixType`]'s
    /// variants, so this is stored as a plain string rather than the enum.
    pub suffix_type: Option<String>,
}

impl MentorStatusLine {
    /// [`Self::suffix_type`] resolved back to a [`SuffixType`] for rendering
    /// through [`crate::suffix::format_suffix`]. `None` both when no suffix
    /// type was recorded and for the `entry_ref` pseudo-type, which has no
    /// prefix of its own and is always rendered as a bare value.
    pub fn suffix_type_enum(&self) -> Option<SuffixType> {
        match self.suffix_type.as_deref()? {
            "rejected_proposal" => Some(SuffixType::RejectedProposal),
            "killed_agent" => Some(SuffixType::KilledAgent),
            "killed_process" => Some(SuffixType::KilledProcess),
            "pending_dead_process" => Some(SuffixType::PendingDeadProcess),
            "error" => Some(SuffixType::Error),
            "running_agent" => Some(SuffixType::RunningAgent),
            "running_process" => Some(SuffixType::RunningProcess),
            "summarize_complete" => Some(SuffixType::SummarizeComplete),
            "plain" => Some(SuffixType::Plain),
            _ => None,
        }
    }
}

/// One `profile[x/y]` token in a MENTORS entry header: the profile name plus
/// its position in the mentor rotation, e.g. `backend[1/2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorProfile {
    pub name: String,
    pub position: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MentorEntry {
    pub entry_id: String,
    pub profiles: Vec<MentorProfile>,
    pub status_lines: Vec<MentorStatusLine>,
    pub is_wip: bool,
}

impl MentorEntry {
    pub fn status_line(&self, profile_name: &str, mentor_name: &str) -> Option<&MentorStatusLine> {
        self.status_lines
            .iter()
            .find(|sl| sl.profile_name == profile_name && sl.mentor_name == mentor_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEntry {
    pub reviewer: String,
    pub file_path: String,
    pub suffix: Option<String>,
    pub suffix_type: Option<SuffixType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSpec {
    pub name: String,
    pub description: String,
    pub parent: Option<String>,
    pub cl: Option<String>,
    pub status: String,
    pub test_targets: Option<Vec<String>>,
    pub kickstart: Option<String>,
    pub file_path: String,
    pub line_number: usize,
    pub bug: Option<String>,
    pub commits: Option<Vec<CommitEntry>>,
    pub hooks: Option<Vec<HookEntry>>,
    pub comments: Option<Vec<CommentEntry>>,
    pub mentors: Option<Vec<MentorEntry>>,
}

impl ChangeSpec {
    /// Project basename derived from `file_path` (e.g. `"myproject"` from
    /// `".../myproject.gp"`).
    pub fn project_basename(&self) -> String {
        std::path::Path::new(&self.file_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
