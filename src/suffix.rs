//! C1: the suffix codec shared by COMMITS, HOOKS, MENTORS, and COMMENTS
//! entries.
//!
//! Every entry in a ChangeSpec section can carry a trailing `- (PREFIX:MSG)`
//! annotation. This module is the single place that knows the prefix table,
//! so parsing and formatting always agree.

use std::fmt;

/// The classification carried by a suffix's prefix marker.
///
/// `Plain` is the legacy `~:` marker (explicitly "no type, don't
/// auto-detect"); `None` on a suffix means no prefix was present at all and
/// callers should fall back to message-based auto-detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SuffixType {
    RejectedProposal,
    KilledAgent,
    KilledProcess,
    PendingDeadProcess,
    Error,
    RunningAgent,
    RunningProcess,
    SummarizeComplete,
    Plain,
}

impl SuffixType {
    /// The prefix token this type is written with (without trailing space),
    /// e.g. `Error` -> `"!:"`. `Plain` has no canonical emit prefix; callers
    /// that need the legacy marker use `"~:"` directly.
    fn emit_prefix(self) -> Option<&'static str> {
        match self {
            SuffixType::RejectedProposal => Some("~!:"),
            SuffixType::KilledAgent => Some("~@:"),
            SuffixType::KilledProcess => Some("~$:"),
            SuffixType::PendingDeadProcess => Some("?$:"),
            SuffixType::Error => Some("!:"),
            SuffixType::RunningAgent => Some("@:"),
            SuffixType::RunningProcess => Some("$:"),
            SuffixType::SummarizeComplete => Some("%:"),
            SuffixType::Plain => None,
        }
    }
}

/// Result of parsing a raw suffix value: the message with prefix markers
/// stripped, plus the type the prefix indicated (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSuffix {
    pub value: Option<String>,
    pub suffix_type: Option<SuffixType>,
}

/// Prefix table in priority order — longer prefixes must be tried before
/// their shorter overlapping counterparts (e.g. `~!:` before `~:`).
const PREFIX_MAP: &[(&str, Option<SuffixType>)] = &[
    ("~!:", Some(SuffixType::RejectedProposal)),
    ("~@:", Some(SuffixType::KilledAgent)),
    ("~$:", Some(SuffixType::KilledProcess)),
    ("?$:", Some(SuffixType::PendingDeadProcess)),
    ("!:", Some(SuffixType::Error)),
    ("@:", Some(SuffixType::RunningAgent)),
    ("$:", Some(SuffixType::RunningProcess)),
    ("%:", Some(SuffixType::SummarizeComplete)),
    ("~:", None),
];

/// Parse a raw suffix string (the text captured inside `(...)`, minus any
/// compound ` | summary` split already handled by the section parser).
pub fn parse_suffix_prefix(suffix_val: Option<&str>) -> ParsedSuffix {
    let Some(suffix_val) = suffix_val else {
        return ParsedSuffix {
            value: None,
            suffix_type: None,
        };
    };

    for (prefix, suffix_type) in PREFIX_MAP {
        if let Some(rest) = suffix_val.strip_prefix(prefix) {
            return ParsedSuffix {
                value: Some(rest.trim().to_string()),
                suffix_type: *suffix_type,
            };
        }
    }

    if suffix_val == "@" {
        return ParsedSuffix {
            value: Some(String::new()),
            suffix_type: Some(SuffixType::RunningAgent),
        };
    }
    if suffix_val == "%" {
        return ParsedSuffix {
            value: Some(String::new()),
            suffix_type: Some(SuffixType::SummarizeComplete),
        };
    }

    ParsedSuffix {
        value: Some(suffix_val.to_string()),
        suffix_type: None,
    }
}

/// Re-compose a `(value, suffix_type)` pair into the raw string that would
/// appear inside `(...)` in the ChangeSpec file. The inverse of
/// [`parse_suffix_prefix`] for the non-legacy, non-standalone cases.
pub fn format_suffix(value: &str, suffix_type: Option<SuffixType>) -> String {
    match suffix_type.and_then(SuffixType::emit_prefix) {
        Some(prefix) if value.is_empty() => prefix.to_string(),
        Some(prefix) => format!("{prefix} {value}"),
        None => value.to_string(),
    }
}

/// Error suffix messages requiring the `!:` prefix when formatting.
pub const ERROR_SUFFIX_MESSAGES: &[&str] =
    &["ZOMBIE", "Hook Command Failed", "Unresolved Critique Comments"];

pub fn is_error_suffix(suffix: Option<&str>) -> bool {
    suffix.is_some_and(|s| ERROR_SUFFIX_MESSAGES.contains(&s))
}

/// Running-agent suffix shapes (longest/most-specific first):
/// - `<agent>-<PID>-YYmmdd_HHMMSS` (PID extractable)
/// - `<agent>-YYmmdd_HHMMSS` (legacy, no PID)
/// - bare `YYmmdd_HHMMSS` (13 chars, `_` at index 6)
/// - bare `YYmmddHHMMSS` (12 digits, older legacy)
pub fn is_running_agent_suffix(suffix: Option<&str>) -> bool {
    let Some(suffix) = suffix else { return false };

    if suffix.contains('-') {
        let parts: Vec<&str> = suffix.split('-').collect();
        if parts.len() >= 3 {
            let ts = parts[parts.len() - 1];
            let pid = parts[parts.len() - 2];
            if pid.chars().all(|c| c.is_ascii_digit())
                && !pid.is_empty()
                && ts.len() == 13
                && ts.as_bytes()[6] == b'_'
            {
                return true;
            }
        }
        if parts.len() == 2 {
            let (agent, ts) = (parts[0], parts[1]);
            if !agent.is_empty() && ts.len() == 13 && ts.as_bytes()[6] == b'_' {
                return true;
            }
        }
    }

    if suffix.len() == 13 && suffix.as_bytes()[6] == b'_' {
        return true;
    }
    if suffix.len() == 12 && suffix.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    false
}

/// Running-process suffixes are bare PIDs (all digits, non-empty).
pub fn is_running_process_suffix(suffix: Option<&str>) -> bool {
    suffix.is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
}

/// Extract the PID from a `<agent>-<PID>-<timestamp>` running-agent suffix.
pub fn extract_pid_from_agent_suffix(suffix: Option<&str>) -> Option<u32> {
    let suffix = suffix?;
    if !suffix.contains('-') {
        return None;
    }
    let parts: Vec<&str> = suffix.split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let pid_str = parts[parts.len() - 2];
    pid_str.parse().ok()
}

pub const READY_TO_MAIL_SUFFIX: &str = " - (!: READY TO MAIL)";

pub fn has_ready_to_mail_suffix(status: &str) -> bool {
    status.contains("(!: READY TO MAIL)")
}

pub fn get_base_status(status: &str) -> String {
    if has_ready_to_mail_suffix(status) {
        status.replace(READY_TO_MAIL_SUFFIX, "").trim().to_string()
    } else {
        status.to_string()
    }
}

impl fmt::Display for ParsedSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, self.suffix_type) {
            (Some(v), t) => write!(f, "{}", format_suffix(v, t)),
            (None, _) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_prefix_marker() {
        assert_eq!(
            parse_suffix_prefix(Some("!: boom")),
            ParsedSuffix {
                value: Some("boom".to_string()),
                suffix_type: Some(SuffixType::Error),
            }
        );
        assert_eq!(
            parse_suffix_prefix(Some("~!: withdrawn")).suffix_type,
            Some(SuffixType::RejectedProposal)
        );
        assert_eq!(
            parse_suffix_prefix(Some("~@: agent killed")).suffix_type,
            Some(SuffixType::KilledAgent)
        );
        assert_eq!(
            parse_suffix_prefix(Some("~$: process killed")).suffix_type,
            Some(SuffixType::KilledProcess)
        );
        assert_eq!(
            parse_suffix_prefix(Some("?$: 12345")).suffix_type,
            Some(SuffixType::PendingDeadProcess)
        );
        assert_eq!(
            parse_suffix_prefix(Some("@: fix_hook-123-251230_151429")).suffix_type,
            Some(SuffixType::RunningAgent)
        );
        assert_eq!(
            parse_suffix_prefix(Some("$: 54321")).suffix_type,
            Some(SuffixType::RunningProcess)
        );
        assert_eq!(
            parse_suffix_prefix(Some("%: summary text")).suffix_type,
            Some(SuffixType::SummarizeComplete)
        );
        assert_eq!(parse_suffix_prefix(Some("~: legacy")).suffix_type, None);
    }

    #[test]
    fn tries_longer_prefixes_before_shorter_overlapping_ones() {
        // `~!:` must win over a naive `~:` match.
        let parsed = parse_suffix_prefix(Some("~!: rejected"));
        assert_eq!(parsed.suffix_type, Some(SuffixType::RejectedProposal));
        assert_eq!(parsed.value.as_deref(), Some("rejected"));
    }

    #[test]
    fn standalone_markers() {
        assert_eq!(
            parse_suffix_prefix(Some("@")),
            ParsedSuffix {
                value: Some(String::new()),
                suffix_type: Some(SuffixType::RunningAgent),
            }
        );
        assert_eq!(
            parse_suffix_prefix(Some("%")),
            ParsedSuffix {
                value: Some(String::new()),
                suffix_type: Some(SuffixType::SummarizeComplete),
            }
        );
    }

    #[test]
    fn no_prefix_returns_as_is() {
        let parsed = parse_suffix_prefix(Some("ZOMBIE"));
        assert_eq!(parsed.value.as_deref(), Some("ZOMBIE"));
        assert_eq!(parsed.suffix_type, None);
        assert!(is_error_suffix(parsed.value.as_deref()));
    }

    #[test]
    fn format_suffix_is_the_parse_inverse_for_typed_values() {
        for (prefix, suffix_type) in PREFIX_MAP.iter().filter(|(_, t)| t.is_some()) {
            let raw = format!("{prefix} hello");
            let parsed = parse_suffix_prefix(Some(&raw));
            assert_eq!(parsed.suffix_type, *suffix_type);
            let reformatted = format_suffix(&parsed.value.unwrap(), parsed.suffix_type);
            assert_eq!(reformatted, raw);
        }
    }

    #[test]
    fn running_agent_suffix_shapes() {
        assert!(is_running_agent_suffix(Some("fix_hook-12345-251230_151429")));
        assert!(is_running_agent_suffix(Some("fix_hook-251230_151429")));
        assert!(is_running_agent_suffix(Some("251230_151429")));
        assert!(is_running_agent_suffix(Some("251230151429")));
        assert!(!is_running_agent_suffix(Some("not-a-timestamp")));
        assert!(!is_running_agent_suffix(None));
    }

    #[test]
    fn extracts_pid_only_from_new_format() {
        assert_eq!(
            extract_pid_from_agent_suffix(Some("fix_hook-12345-251230_151429")),
            Some(12345)
        );
        assert_eq!(
            extract_pid_from_agent_suffix(Some("fix_hook-251230_151429")),
            None
        );
        assert_eq!(extract_pid_from_agent_suffix(Some("251230_151429")), None);
    }

    #[test]
    fn running_process_suffix_is_a_bare_pid() {
        assert!(is_running_process_suffix(Some("54321")));
        assert!(!is_running_process_suffix(Some("abc")));
        assert!(!is_running_process_suffix(Some("")));
    }

    #[test]
    fn ready_to_mail_suffix_strip() {
        let status = "Drafted - (!: READY TO MAIL)";
        assert!(has_ready_to_mail_suffix(status));
        assert_eq!(get_base_status(status), "Drafted");
        assert_eq!(get_base_status("Drafted"), "Drafted");
    }
}
